use super::{BoundingBox, Coord};
use crate::{NightLightError, NightLightResult};
use geo::{BoundingRect, Contains, LineString, Point};
use geojson::GeoJson;
use std::path::Path;

/// A polygon with an outer ring and zero or more holes.
///
/// Containment is delegated to the `geo` crate, which treats points on any ring as outside.
#[derive(Debug, Clone)]
pub struct Polygon(geo::Polygon<f64>);

impl Polygon {
    /// Build a polygon from rings of coordinates. The closing vertex may be repeated or left off.
    pub fn new(exterior: Vec<Coord>, holes: Vec<Vec<Coord>>) -> NightLightResult<Self> {
        let holes = holes.into_iter().map(line_string).collect();
        Self::from_geo(geo::Polygon::new(line_string(exterior), holes))
    }

    fn from_geo(poly: geo::Polygon<f64>) -> NightLightResult<Self> {
        if vertex_count(poly.exterior()) < 3 {
            return Err(NightLightError::InvalidBoundary(
                "polygon ring needs at least 3 vertices",
            ));
        }

        let (exterior, holes) = poly.into_inner();
        let holes = holes
            .into_iter()
            .filter(|ring| vertex_count(ring) >= 3)
            .collect();

        Ok(Polygon(geo::Polygon::new(exterior, holes)))
    }

    /// The outer ring of the polygon, without the closing vertex.
    pub fn exterior(&self) -> Vec<Coord> {
        ring_coords(self.0.exterior())
    }

    pub fn holes(&self) -> Vec<Vec<Coord>> {
        self.0.interiors().iter().map(ring_coords).collect()
    }

    /// Is the coordinate strictly interior to the polygon?
    ///
    /// Points on the outer ring or on the ring of a hole are not contained, and neither are points
    /// inside a hole.
    pub fn contains(&self, coord: Coord) -> bool {
        self.0.contains(&Point::new(coord.lon, coord.lat))
    }

    fn bounding_box(&self) -> BoundingBox {
        match self.0.bounding_rect() {
            Some(rect) => BoundingBox {
                ll: Coord {
                    lat: rect.min().y,
                    lon: rect.min().x,
                },
                ur: Coord {
                    lat: rect.max().y,
                    lon: rect.max().x,
                },
            },
            None => BoundingBox::empty(),
        }
    }
}

fn line_string(ring: Vec<Coord>) -> LineString<f64> {
    LineString::new(
        ring.into_iter()
            .map(|c| geo::Coord { x: c.lon, y: c.lat })
            .collect(),
    )
}

// Distinct vertices, not counting a repeated closing vertex.
fn vertex_count(ring: &LineString<f64>) -> usize {
    let n = ring.0.len();
    if n > 1 && ring.is_closed() {
        n - 1
    } else {
        n
    }
}

fn ring_coords(ring: &LineString<f64>) -> Vec<Coord> {
    ring.0
        .iter()
        .take(vertex_count(ring))
        .map(|c| Coord { lat: c.y, lon: c.x })
        .collect()
}

/**
 * An administrative boundary made of one or more polygons.
 */
#[derive(Debug, Clone)]
pub struct Boundary {
    polygons: Vec<Polygon>,
    bbox: BoundingBox,
}

impl Boundary {
    /// Create a boundary from polygons. There must be at least one.
    pub fn new(polygons: Vec<Polygon>) -> NightLightResult<Self> {
        if polygons.is_empty() {
            return Err(NightLightError::InvalidBoundary("no polygons"));
        }

        let mut bbox = BoundingBox::empty();
        for poly in &polygons {
            bbox.union(&poly.bounding_box());
        }

        Ok(Boundary { polygons, bbox })
    }

    /// Load a boundary from a GeoJSON file.
    pub fn from_geojson_file<P: AsRef<Path>>(path: P) -> NightLightResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(NightLightError::MissingFile(path.to_path_buf()));
        }

        let text = std::fs::read_to_string(path)?;
        let boundary = Self::from_geojson(&text)?;

        log::debug!(
            "loaded boundary {} with {} polygon(s), bbox {}",
            path.display(),
            boundary.polygons.len(),
            boundary.bbox
        );

        Ok(boundary)
    }

    /// Parse GeoJSON text.
    ///
    /// Accepts a bare Polygon or MultiPolygon geometry, a Feature, a FeatureCollection, or a
    /// GeometryCollection. Geometries that are not polygonal and features without a geometry are
    /// ignored.
    pub fn from_geojson(text: &str) -> NightLightResult<Self> {
        let geometries = match text.parse::<GeoJson>()? {
            GeoJson::Geometry(geometry) => vec![geometry],
            GeoJson::Feature(feature) => feature.geometry.into_iter().collect(),
            GeoJson::FeatureCollection(collection) => collection
                .features
                .into_iter()
                .filter_map(|feature| feature.geometry)
                .collect(),
        };

        let mut polygons = vec![];
        for geometry in geometries {
            collect_polygons(geo::Geometry::try_from(geometry)?, &mut polygons)?;
        }

        Self::new(polygons)
    }

    /// Is the coordinate strictly inside any of the polygons?
    pub fn contains(&self, coord: Coord) -> bool {
        self.bbox.contains(coord) && self.polygons.iter().any(|poly| poly.contains(coord))
    }

    /// The box that covers every polygon.
    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }
}

fn collect_polygons(
    geometry: geo::Geometry<f64>,
    polygons: &mut Vec<Polygon>,
) -> NightLightResult<()> {
    match geometry {
        geo::Geometry::Polygon(poly) => polygons.push(Polygon::from_geo(poly)?),
        geo::Geometry::MultiPolygon(multi) => {
            for poly in multi {
                polygons.push(Polygon::from_geo(poly)?);
            }
        }
        geo::Geometry::GeometryCollection(collection) => {
            for geometry in collection {
                collect_polygons(geometry, polygons)?;
            }
        }
        _ => log::debug!("ignoring non-polygonal geometry in boundary"),
    }

    Ok(())
}
