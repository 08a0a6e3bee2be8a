/*!
 * Geographic types and calculations.
 *
 * Everything here works in degree space. The grids used for comparing years are small enough and
 * close enough to the equator that planar distances in degrees are good enough, so there is no
 * geodesic math in this module.
 */
use std::fmt::{self, Display};

pub use boundary::{Boundary, Polygon};
pub use hilbert_rtree::Hilbert2DRTreeView;

mod boundary;
mod hilbert_rtree;

/// A latitude / longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

impl Coord {
    /// Check that this is a real location on the Earth.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Squared planar distance in degrees squared.
    pub fn distance_sq(&self, other: Coord) -> f64 {
        let dlat = self.lat - other.lat;
        let dlon = self.lon - other.lon;
        dlat * dlat + dlon * dlon
    }
}

/// A lat-lon aligned rectangle described by its lower left and upper right corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub ll: Coord,
    pub ur: Coord,
}

impl Default for BoundingBox {
    fn default() -> Self {
        BoundingBox::empty()
    }
}

impl Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(
            f,
            "({:.6}, {:.6}) <---> ({:.6}, {:.6})",
            self.ll.lat, self.ll.lon, self.ur.lat, self.ur.lon
        )
    }
}

impl BoundingBox {
    /// A box that contains nothing, ready to be grown with [BoundingBox::include].
    pub fn empty() -> Self {
        BoundingBox {
            ll: Coord {
                lat: f64::INFINITY,
                lon: f64::INFINITY,
            },
            ur: Coord {
                lat: -f64::INFINITY,
                lon: -f64::INFINITY,
            },
        }
    }

    /// True until something has been included.
    pub fn is_empty(&self) -> bool {
        self.ll.lat > self.ur.lat || self.ll.lon > self.ur.lon
    }

    /// Grow the box so it covers `coord`.
    pub fn include(&mut self, coord: Coord) {
        self.ll.lat = self.ll.lat.min(coord.lat);
        self.ll.lon = self.ll.lon.min(coord.lon);
        self.ur.lat = self.ur.lat.max(coord.lat);
        self.ur.lon = self.ur.lon.max(coord.lon);
    }

    /// Grow the box so it covers `other`.
    pub fn union(&mut self, other: &BoundingBox) {
        self.include(other.ll);
        self.include(other.ur);
    }

    /// A square box of half-width `radius` around `center`.
    pub fn around(center: Coord, radius: f64) -> Self {
        BoundingBox {
            ll: Coord {
                lat: center.lat - radius,
                lon: center.lon - radius,
            },
            ur: Coord {
                lat: center.lat + radius,
                lon: center.lon + radius,
            },
        }
    }

    /// Does the box contain the coordinate? The edges count as inside.
    pub fn contains(&self, coord: Coord) -> bool {
        coord.lat >= self.ll.lat
            && coord.lat <= self.ur.lat
            && coord.lon >= self.ll.lon
            && coord.lon <= self.ur.lon
    }

    /// Do these boxes overlap? Edges within `eps` of each other count as overlapping.
    pub fn overlap(&self, other: &BoundingBox, eps: f64) -> bool {
        let lat_overlap = self.ll.lat <= other.ur.lat + eps && other.ll.lat <= self.ur.lat + eps;
        let lon_overlap = self.ll.lon <= other.ur.lon + eps && other.ll.lon <= self.ur.lon + eps;

        lat_overlap && lon_overlap
    }
}

/// Anything that has a location and extent that can be put into a spatial index.
pub trait Geo {
    fn centroid(&self) -> Coord;

    fn bounding_box(&self) -> BoundingBox;
}

impl Geo for Coord {
    fn centroid(&self) -> Coord {
        *self
    }

    fn bounding_box(&self) -> BoundingBox {
        BoundingBox {
            ll: *self,
            ur: *self,
        }
    }
}
