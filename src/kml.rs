//! Very simple functions for producing KML files for the maps made by this crate.
//!
//! This is not a general solution. The layers written here can be large, so the API streams
//! straight to the output and the user is responsible for closing all tags.
//!
//! Heat layers are drawn as one point per [HeatPoint] with the icon colored by its weight, using
//! the same four stop gradient for every map.

use crate::{
    geo::{Boundary, Coord},
    grid::HeatPoint,
    NightLightResult,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};
use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};

const DOT_ICON: &str = "http://maps.google.com/mapfiles/kml/shapes/shaded_dot.png";

/// A KML document written to a file. The document is closed when this is dropped.
pub struct KmlFile(BufWriter<File>);

impl KmlFile {
    pub fn new<P: AsRef<Path>>(pth: P) -> NightLightResult<Self> {
        let p = pth.as_ref();

        let f = File::create(p)?;
        let mut new = KmlFile(BufWriter::new(f));
        new.start_document()?;

        log::debug!("writing KML to {}", p.display());
        Ok(new)
    }
}

impl KmlWriter for KmlFile {
    fn output(&mut self) -> &mut dyn Write {
        &mut self.0
    }
}

impl Drop for KmlFile {
    fn drop(&mut self) {
        self.finish_document();
        let _ = self.0.flush();
    }
}

/// The color buckets of the heat layer gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, IntoStaticStr)]
pub enum HeatStyle {
    #[strum(serialize = "heat_blue")]
    Blue,
    #[strum(serialize = "heat_lime")]
    Lime,
    #[strum(serialize = "heat_yellow")]
    Yellow,
    #[strum(serialize = "heat_red")]
    Red,
}

impl HeatStyle {
    /// Pick the bucket for a weight in `[0, 1]`. The stops are at 0.4, 0.6, 0.8 and 1.0.
    pub fn for_weight(weight: f64) -> Self {
        if weight <= 0.4 {
            HeatStyle::Blue
        } else if weight <= 0.6 {
            HeatStyle::Lime
        } else if weight <= 0.8 {
            HeatStyle::Yellow
        } else {
            HeatStyle::Red
        }
    }

    /// The KML color, aabbggrr.
    pub fn color(&self) -> &'static str {
        match self {
            HeatStyle::Blue => "ffff0000",
            HeatStyle::Lime => "ff00ff00",
            HeatStyle::Yellow => "ff00ffff",
            HeatStyle::Red => "ff0000ff",
        }
    }

    fn id(&self) -> &'static str {
        self.into()
    }
}

/// The first and last instants of a year, for a TimeSpan.
pub fn year_span(year: i32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0)?;
    let end = NaiveDate::from_ymd_opt(year, 12, 31)?.and_hms_opt(23, 59, 59)?;

    Some((Utc.from_utc_datetime(&start), Utc.from_utc_datetime(&end)))
}

pub trait KmlWriter {
    fn output(&mut self) -> &mut dyn Write;

    /// Put the header out.
    fn start_document(&mut self) -> NightLightResult<()> {
        const HEADER: &str = concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            "\n",
            r#"<kml xmlns="http://www.opengis.net/kml/2.2">"#,
            "\n",
            "<Document>\n"
        );

        self.output().write_all(HEADER.as_bytes())?;

        Ok(())
    }

    /// Close a document.
    fn finish_document(&mut self) {
        const FOOTER: &str = concat!(r#"</Document>"#, "\n", r#"</kml>"#, "\n");
        let _ = self.output().write_all(FOOTER.as_bytes());
    }

    fn write_name(&mut self, name: &str) -> NightLightResult<()> {
        writeln!(self.output(), "<name>{}</name>", name)?;
        Ok(())
    }

    fn write_description(&mut self, description: &str) -> NightLightResult<()> {
        writeln!(
            self.output(),
            "<description><![CDATA[{}]]></description>",
            description
        )?;
        Ok(())
    }

    /// Start a KML folder.
    fn start_folder(
        &mut self,
        name: Option<&str>,
        description: Option<&str>,
        is_open: bool,
    ) -> NightLightResult<()> {
        self.output().write_all("<Folder>\n".as_bytes())?;

        if let Some(name) = name {
            self.write_name(name)?;
        }

        if let Some(description) = description {
            self.write_description(description)?;
        }

        if is_open {
            self.output().write_all("<open>1</open>\n".as_bytes())?;
        }

        Ok(())
    }

    fn finish_folder(&mut self) -> NightLightResult<()> {
        writeln!(self.output(), "</Folder>")?;
        Ok(())
    }

    fn start_placemark(
        &mut self,
        name: Option<&str>,
        style_url: Option<&str>,
    ) -> NightLightResult<()> {
        writeln!(self.output(), "<Placemark>")?;

        if let Some(name) = name {
            self.write_name(name)?;
        }

        if let Some(style_url) = style_url {
            writeln!(self.output(), "<styleUrl>#{}</styleUrl>", style_url)?;
        }

        Ok(())
    }

    fn finish_placemark(&mut self) -> NightLightResult<()> {
        writeln!(self.output(), "</Placemark>")?;
        Ok(())
    }

    fn start_style(&mut self, style_id: &str) -> NightLightResult<()> {
        writeln!(self.output(), "<Style id=\"{}\">", style_id)?;
        Ok(())
    }

    fn finish_style(&mut self) -> NightLightResult<()> {
        writeln!(self.output(), "</Style>")?;
        Ok(())
    }

    /// Create a PolyStyle element.
    ///
    /// These should ONLY go inside a style element.
    fn create_poly_style(&mut self, color: &str, filled: bool, outlined: bool) -> NightLightResult<()> {
        let filled = if filled { 1 } else { 0 };
        let outlined = if outlined { 1 } else { 0 };

        writeln!(
            self.output(),
            "<PolyStyle>\n<color>{}</color>\n<fill>{}</fill>\n<outline>{}</outline>\n</PolyStyle>",
            color,
            filled,
            outlined
        )?;
        Ok(())
    }

    /// Create a LineStyle element.
    fn create_line_style(&mut self, color: &str, width: f64) -> NightLightResult<()> {
        writeln!(
            self.output(),
            "<LineStyle>\n<color>{}</color>\n<width>{}</width>\n</LineStyle>",
            color,
            width
        )?;
        Ok(())
    }

    /// Create an IconStyle element tinted with `color`.
    fn create_icon_style(&mut self, color: &str, scale: f64) -> NightLightResult<()> {
        let scale = if scale > 0.0 { scale } else { 1.0 };

        writeln!(self.output(), "<IconStyle>")?;
        writeln!(self.output(), "<color>{}</color>", color)?;
        writeln!(self.output(), "<scale>{}</scale>", scale)?;
        writeln!(self.output(), "<Icon><href>{}</href></Icon>", DOT_ICON)?;
        writeln!(self.output(), "</IconStyle>")?;
        Ok(())
    }

    /// Write out a TimeSpan element.
    fn timespan(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> NightLightResult<()> {
        self.output().write_all("<TimeSpan>\n".as_bytes())?;
        writeln!(
            self.output(),
            "<begin>{}</begin>",
            start.format("%Y-%m-%dT%H:%M:%SZ")
        )?;
        writeln!(
            self.output(),
            "<end>{}</end>",
            end.format("%Y-%m-%dT%H:%M:%SZ")
        )?;
        self.output().write_all("</TimeSpan>\n".as_bytes())?;
        Ok(())
    }

    fn start_multi_geometry(&mut self) -> NightLightResult<()> {
        self.output().write_all("<MultiGeometry>\n".as_bytes())?;
        Ok(())
    }

    fn finish_multi_geometry(&mut self) -> NightLightResult<()> {
        self.output().write_all("</MultiGeometry>\n".as_bytes())?;
        Ok(())
    }

    /// Write a ring as a LinearRing, closing it.
    fn linear_ring(&mut self, ring: &[Coord]) -> NightLightResult<()> {
        self.output()
            .write_all("<LinearRing>\n<coordinates>\n".as_bytes())?;
        for vertex in ring.iter().chain(ring.first()) {
            writeln!(self.output(), "{},{},0", vertex.lon, vertex.lat)?;
        }
        self.output()
            .write_all("</coordinates>\n</LinearRing>\n".as_bytes())?;
        Ok(())
    }

    /// Write a complete Polygon element, clamped to the ground.
    fn polygon(&mut self, exterior: &[Coord], holes: &[Vec<Coord>]) -> NightLightResult<()> {
        self.output()
            .write_all("<Polygon>\n<tessellate>1</tessellate>\n".as_bytes())?;

        self.output().write_all("<outerBoundaryIs>\n".as_bytes())?;
        self.linear_ring(exterior)?;
        self.output().write_all("</outerBoundaryIs>\n".as_bytes())?;

        for hole in holes {
            self.output().write_all("<innerBoundaryIs>\n".as_bytes())?;
            self.linear_ring(hole)?;
            self.output().write_all("</innerBoundaryIs>\n".as_bytes())?;
        }

        self.output().write_all("</Polygon>\n".as_bytes())?;
        Ok(())
    }

    /// Write out a KML Point element
    fn create_point(&mut self, lat: f64, lon: f64) -> NightLightResult<()> {
        writeln!(
            self.output(),
            "<Point>\n<coordinates>{},{},0</coordinates>\n</Point>",
            lon,
            lat
        )?;
        Ok(())
    }

    /// Define the shared styles, the heat gradient and the boundary outline.
    ///
    /// This should be called once, right after the document is started.
    fn write_map_styles(&mut self) -> NightLightResult<()> {
        for style in HeatStyle::iter() {
            self.start_style(style.id())?;
            self.create_icon_style(style.color(), 0.6)?;
            self.output()
                .write_all("<LabelStyle><scale>0</scale></LabelStyle>\n".as_bytes())?;
            self.finish_style()?;
        }

        self.start_style("boundary")?;
        self.create_line_style("ff000000", 1.5)?;
        self.create_poly_style("00000000", false, true)?;
        self.finish_style()?;

        Ok(())
    }

    /// Write a folder of points colored by weight.
    ///
    /// Weights should be normalized to `[0, 1]`. If a year is given the folder gets that year as
    /// its TimeSpan.
    fn write_heat_layer(
        &mut self,
        name: &str,
        points: &[HeatPoint],
        year: Option<i32>,
    ) -> NightLightResult<()> {
        self.start_folder(Some(name), None, false)?;

        if let Some((start, end)) = year.and_then(year_span) {
            self.timespan(start, end)?;
        }

        for pnt in points {
            self.start_placemark(None, Some(HeatStyle::for_weight(pnt.weight).id()))?;
            self.create_point(pnt.lat, pnt.lon)?;
            self.finish_placemark()?;
        }

        self.finish_folder()
    }

    /// Outline every polygon of a boundary.
    fn write_boundary(&mut self, name: &str, boundary: &Boundary) -> NightLightResult<()> {
        self.start_placemark(Some(name), Some("boundary"))?;
        self.start_multi_geometry()?;
        for poly in boundary.polygons() {
            self.polygon(&poly.exterior(), &poly.holes())?;
        }
        self.finish_multi_geometry()?;
        self.finish_placemark()
    }
}

/// Split signed changes into brightening and dimming layers with weights in `[0, 1]`.
///
/// Both layers are scaled by the largest absolute change so they can be compared.
pub fn change_layers(points: &[HeatPoint]) -> (Vec<HeatPoint>, Vec<HeatPoint>) {
    let max = points.iter().map(|p| p.weight.abs()).fold(0.0, f64::max);
    if max == 0.0 {
        return (vec![], vec![]);
    }

    let scaled = |p: &HeatPoint| HeatPoint {
        weight: p.weight.abs() / max,
        ..*p
    };

    let brighter = points.iter().filter(|p| p.weight > 0.0).map(scaled).collect();
    let dimmer = points.iter().filter(|p| p.weight < 0.0).map(scaled).collect();

    (brighter, dimmer)
}
