use crate::{
    geo::{BoundingBox, Coord, Geo},
    NightLightError, NightLightResult,
};
use serde::Deserialize;

/**
 * A single radiance observation at a point.
 *
 * The value is not checked, radiance is non-negative in practice but nothing downstream depends on
 * that.
 */
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub lat: f64,
    pub lon: f64,
    pub value: f64,
}

/// The GeoJSON point geometry Earth Engine writes into the `.geo` column.
#[derive(Debug, Deserialize)]
struct PointGeometry {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Vec<f64>,
}

impl Sample {
    /// Create a sample, checking the coordinates are on the Earth.
    pub fn new(lat: f64, lon: f64, value: f64) -> NightLightResult<Self> {
        let coord = Coord { lat, lon };
        if !coord.is_valid() {
            return Err(NightLightError::MalformedGeometry(format!(
                "coordinate out of range: lat={} lon={}",
                lat, lon
            )));
        }

        Ok(Sample { lat, lon, value })
    }

    /// Decode a GeoJSON point string such as `{"type":"Point","coordinates":[78.6,22.9]}`.
    ///
    /// GeoJSON positions are longitude first.
    pub fn from_geo(geo: &str, value: f64) -> NightLightResult<Self> {
        let geometry: PointGeometry = serde_json::from_str(geo)
            .map_err(|err| NightLightError::MalformedGeometry(format!("{}: {}", err, geo)))?;

        if geometry.kind != "Point" {
            return Err(NightLightError::MalformedGeometry(format!(
                "expected a Point, found {}",
                geometry.kind
            )));
        }

        match geometry.coordinates[..] {
            [lon, lat, ..] => Self::new(lat, lon, value),
            _ => Err(NightLightError::MalformedGeometry(format!(
                "point needs 2 coordinates: {}",
                geo
            ))),
        }
    }

    pub fn coord(&self) -> Coord {
        Coord {
            lat: self.lat,
            lon: self.lon,
        }
    }
}

impl Geo for Sample {
    fn centroid(&self) -> Coord {
        self.coord()
    }

    fn bounding_box(&self) -> BoundingBox {
        self.coord().bounding_box()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_geo() {
        let s = Sample::from_geo(
            r#"{"type":"Point","coordinates":[78.6569,22.9734]}"#,
            3.5,
        )
        .unwrap();

        assert_eq!(s.lat, 22.9734);
        assert_eq!(s.lon, 78.6569);
        assert_eq!(s.value, 3.5);
    }

    #[test]
    fn test_from_geo_errors() {
        let bad = [
            "",
            "{not json}",
            r#"{"type":"LineString","coordinates":[[1.0,2.0],[3.0,4.0]]}"#,
            r#"{"type":"Point","coordinates":[78.0]}"#,
            r#"{"type":"Point","coordinates":[200.0, 10.0]}"#,
            r#"{"type":"Point","coordinates":[10.0, -95.0]}"#,
        ];

        for geo in bad {
            assert!(
                matches!(
                    Sample::from_geo(geo, 1.0),
                    Err(NightLightError::MalformedGeometry(_))
                ),
                "{}",
                geo
            );
        }
    }
}
