/*!
 * Binning irregular samples onto a regular lat-lon grid so different years can be compared cell by
 * cell.
 */
use crate::{
    dataset::PointDataset,
    geo::{BoundingBox, Coord, Hilbert2DRTreeView},
    sample::Sample,
    NightLightError, NightLightResult,
};
use serde::Serialize;

/// The number of grid points along each axis used when comparing years.
pub const DEFAULT_RESOLUTION: usize = 100;

/// Samples closer than this squared distance (degrees squared) to a grid point are averaged into it.
pub const DEFAULT_RADIUS_SQ: f64 = 0.1;

/// A weighted location, the input for a heat layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeatPoint {
    pub lat: f64,
    pub lon: f64,
    pub weight: f64,
}

/**
 * A square grid of points spanning a bounding box.
 *
 * The grid points include both edges of the box, so with a resolution of `n` the pitch along each
 * axis is `1 / (n - 1)` of the box. Cell `(i, j)` is centred on
 * `(min_lat + j * dlat, min_lon + i * dlon)`.
 *
 * A cell is `None` until a sample has been averaged into it. Unobserved cells are kept apart from
 * cells with an observed radiance of zero.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    bbox: BoundingBox,
    resolution: usize,
    // Row major, rows are latitudes.
    cells: Vec<Option<f64>>,
}

impl Grid {
    /// Create an empty `resolution x resolution` grid over `bbox`.
    pub fn build(bbox: BoundingBox, resolution: usize) -> NightLightResult<Self> {
        if resolution == 0 {
            return Err(NightLightError::InvalidResolution(resolution));
        }

        Ok(Grid {
            bbox,
            resolution,
            cells: vec![None; resolution * resolution],
        })
    }

    /// Set every cell to the mean clean value of the samples within `radius` of its centre.
    ///
    /// Distances are planar in degrees and strictly less than `radius`. Outliers never contribute,
    /// and cells with no qualifying samples are unobserved.
    pub fn fill(mut self, dataset: &PointDataset, radius: f64) -> Self {
        let clean: Vec<Sample> = dataset
            .samples()
            .iter()
            .zip(dataset.clean_values())
            .filter_map(|(s, clean)| clean.map(|value| Sample { value, ..*s }))
            .collect();

        let view = match Hilbert2DRTreeView::build_for(&clean, None) {
            Some(view) => view,
            None => {
                self.cells.iter_mut().for_each(|cell| *cell = None);
                return self;
            }
        };

        let res = self.resolution;
        for j in 0..res {
            for i in 0..res {
                let hits = view.indexes_within(self.center(i, j), radius);

                self.cells[j * res + i] = if hits.is_empty() {
                    None
                } else {
                    let total: f64 = hits.iter().map(|&k| clean[k].value).sum();
                    Some(total / hits.len() as f64)
                };
            }
        }

        log::debug!(
            "{}: filled {} of {} grid cells",
            dataset.year(),
            self.observed_count(),
            self.cells.len()
        );

        self
    }

    /// Cell by cell `after - before`.
    ///
    /// A cell is unobserved in the difference if it is unobserved in either grid.
    pub fn difference(before: &Grid, after: &Grid) -> NightLightResult<DifferenceGrid> {
        if before.resolution != after.resolution || before.bbox != after.bbox {
            return Err(NightLightError::DimensionMismatch {
                left: before.shape(),
                right: after.shape(),
            });
        }

        let cells = before
            .cells
            .iter()
            .zip(&after.cells)
            .map(|(b, a)| match (b, a) {
                (Some(b), Some(a)) => Some(a - b),
                _ => None,
            })
            .collect();

        Ok(DifferenceGrid {
            grid: Grid {
                bbox: before.bbox,
                resolution: before.resolution,
                cells,
            },
        })
    }

    /// The centre of cell `(i, j)`, `i` counts along longitude and `j` along latitude.
    pub fn center(&self, i: usize, j: usize) -> Coord {
        let (dlat, dlon) = self.pitch();
        Coord {
            lat: self.bbox.ll.lat + j as f64 * dlat,
            lon: self.bbox.ll.lon + i as f64 * dlon,
        }
    }

    /// The spacing between grid points as (latitude, longitude) degrees.
    pub fn pitch(&self) -> (f64, f64) {
        if self.resolution < 2 {
            return (0.0, 0.0);
        }

        let steps = (self.resolution - 1) as f64;
        (
            (self.bbox.ur.lat - self.bbox.ll.lat) / steps,
            (self.bbox.ur.lon - self.bbox.ll.lon) / steps,
        )
    }

    pub fn value(&self, i: usize, j: usize) -> Option<f64> {
        self.cells[j * self.resolution + i]
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.resolution, self.resolution)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }

    /// The number of cells with a value.
    pub fn observed_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    fn points(&self) -> impl Iterator<Item = (Coord, f64)> + '_ {
        let res = self.resolution;
        self.cells.iter().enumerate().filter_map(move |(k, cell)| {
            cell.map(|value| (self.center(k % res, k / res), value))
        })
    }
}

/**
 * The change between two grids.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct DifferenceGrid {
    grid: Grid,
}

impl DifferenceGrid {
    /// One point per observed cell with a non-zero change.
    pub fn to_sparse_points(&self) -> Vec<HeatPoint> {
        self.grid
            .points()
            .filter(|&(_, delta)| delta != 0.0 && !delta.is_nan())
            .map(|(center, delta)| HeatPoint {
                lat: center.lat,
                lon: center.lon,
                weight: delta,
            })
            .collect()
    }

    /// The change at cell `(i, j)`, `None` if either grid was unobserved there.
    pub fn delta(&self, i: usize, j: usize) -> Option<f64> {
        self.grid.value(i, j)
    }

    pub fn shape(&self) -> (usize, usize) {
        self.grid.shape()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.grid.bbox
    }
}

/**
 * Settings for comparing two datasets on a shared grid.
 */
#[derive(Debug, Clone, Copy)]
pub struct GridAggregator {
    pub resolution: usize,
    /// Search radius in degrees.
    pub radius: f64,
}

impl Default for GridAggregator {
    fn default() -> Self {
        GridAggregator {
            resolution: DEFAULT_RESOLUTION,
            radius: DEFAULT_RADIUS_SQ.sqrt(),
        }
    }
}

impl GridAggregator {
    /// Bin both datasets onto a grid over `bbox` and return `after - before`.
    pub fn compare(
        &self,
        bbox: BoundingBox,
        before: &PointDataset,
        after: &PointDataset,
    ) -> NightLightResult<DifferenceGrid> {
        let before_grid = Grid::build(bbox, self.resolution)?.fill(before, self.radius);
        let after_grid = Grid::build(bbox, self.resolution)?.fill(after, self.radius);

        Grid::difference(&before_grid, &after_grid)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geo::{Boundary, Polygon};

    fn bbox() -> BoundingBox {
        BoundingBox {
            ll: Coord { lat: 10.0, lon: 70.0 },
            ur: Coord { lat: 12.0, lon: 72.0 },
        }
    }

    fn dataset(year: i32, samples: Vec<Sample>) -> PointDataset {
        let ring = vec![
            Coord { lat: 0.0, lon: 60.0 },
            Coord { lat: 0.0, lon: 90.0 },
            Coord { lat: 30.0, lon: 90.0 },
            Coord { lat: 30.0, lon: 60.0 },
        ];
        let boundary = Boundary::new(vec![Polygon::new(ring, vec![]).unwrap()]).unwrap();
        PointDataset::load(year, samples, &boundary)
    }

    fn sample(lat: f64, lon: f64, value: f64) -> Sample {
        Sample { lat, lon, value }
    }

    #[test]
    fn test_build() {
        let grid = Grid::build(bbox(), 5).unwrap();

        assert_eq!(grid.shape(), (5, 5));
        assert_eq!(grid.pitch(), (0.5, 0.5));
        assert_eq!(grid.center(0, 0), Coord { lat: 10.0, lon: 70.0 });
        assert_eq!(grid.center(4, 0), Coord { lat: 10.0, lon: 72.0 });
        assert_eq!(grid.center(1, 3), Coord { lat: 11.5, lon: 70.5 });
        assert_eq!(grid.observed_count(), 0);

        let single = Grid::build(bbox(), 1).unwrap();
        assert_eq!(single.center(0, 0), Coord { lat: 10.0, lon: 70.0 });

        assert!(matches!(
            Grid::build(bbox(), 0),
            Err(NightLightError::InvalidResolution(0))
        ));
    }

    #[test]
    fn test_fill_averages_nearby_clean_samples() {
        let ds = dataset(
            2014,
            vec![
                sample(10.0, 70.0, 2.0),
                sample(10.1, 70.1, 4.0),
                // Too far from (10, 70) but near (10.5, 70.5)
                sample(10.5, 70.4, 9.0),
                // An observed zero.
                sample(12.0, 72.0, 0.0),
            ],
        );

        let grid = Grid::build(bbox(), 5).unwrap().fill(&ds, 0.2);

        assert_eq!(grid.value(0, 0), Some(3.0));
        assert_eq!(grid.value(1, 1), Some(9.0));
        assert_eq!(grid.value(4, 4), Some(0.0));
        assert_eq!(grid.value(2, 2), None);
        assert_eq!(grid.observed_count(), 3);
    }

    #[test]
    fn test_fill_skips_outliers() {
        let mut samples: Vec<Sample> = (0..20)
            .map(|k| sample(11.0 + k as f64 * 0.01, 71.0, 1.0 + k as f64 * 0.01))
            .collect();
        samples.push(sample(10.0, 70.0, 1000.0));

        let ds = dataset(2015, samples).remove_outliers();
        assert_eq!(ds.outlier_count(), 1);

        let grid = Grid::build(bbox(), 5).unwrap().fill(&ds, 0.1);
        assert_eq!(grid.value(0, 0), None);
        assert!(grid.value(2, 2).is_some());
    }

    #[test]
    fn test_fill_matches_brute_force() {
        let samples: Vec<Sample> = (0..300)
            .map(|k| {
                let t = k as f64;
                sample(
                    10.0 + (t * 0.37).rem_euclid(2.0),
                    70.0 + (t * 0.61).rem_euclid(2.0),
                    t,
                )
            })
            .collect();
        let ds = dataset(2016, samples.clone());

        let radius = DEFAULT_RADIUS_SQ.sqrt();
        let grid = Grid::build(bbox(), 12).unwrap().fill(&ds, radius);

        for j in 0..12 {
            for i in 0..12 {
                let center = grid.center(i, j);
                let near: Vec<f64> = samples
                    .iter()
                    .filter(|s| s.coord().distance_sq(center) < radius * radius)
                    .map(|s| s.value)
                    .collect();

                match grid.value(i, j) {
                    None => assert!(near.is_empty()),
                    Some(v) => {
                        let expected = near.iter().sum::<f64>() / near.len() as f64;
                        assert!((v - expected).abs() < 1.0e-9);
                    }
                }
            }
        }
    }

    #[test]
    fn test_fill_empty_dataset() {
        let ds = dataset(2017, vec![]);
        let grid = Grid::build(bbox(), 4).unwrap().fill(&ds, 1.0);
        assert_eq!(grid.observed_count(), 0);
    }

    #[test]
    fn test_difference() {
        let before = dataset(2014, vec![sample(10.0, 70.0, 2.0), sample(12.0, 72.0, 5.0)]);
        let after = dataset(
            2023,
            vec![
                sample(10.0, 70.0, 3.5),
                sample(12.0, 72.0, 5.0),
                sample(11.0, 71.0, 1.0),
            ],
        );

        let a = Grid::build(bbox(), 3).unwrap().fill(&before, 0.2);
        let b = Grid::build(bbox(), 3).unwrap().fill(&after, 0.2);

        let diff = Grid::difference(&a, &b).unwrap();
        assert_eq!(diff.shape(), (3, 3));
        assert_eq!(diff.delta(0, 0), Some(1.5));
        assert_eq!(diff.delta(2, 2), Some(0.0));
        // Only observed in the later year.
        assert_eq!(diff.delta(1, 1), None);

        let points = diff.to_sparse_points();
        assert_eq!(
            points,
            vec![HeatPoint {
                lat: 10.0,
                lon: 70.0,
                weight: 1.5
            }]
        );
    }

    #[test]
    fn test_difference_with_itself_is_zero() {
        let ds = dataset(
            2018,
            (0..50)
                .map(|k| sample(10.0 + k as f64 * 0.04, 70.0 + k as f64 * 0.04, k as f64))
                .collect(),
        );
        let grid = Grid::build(bbox(), 10).unwrap().fill(&ds, 0.3);
        assert!(grid.observed_count() > 0);

        let diff = Grid::difference(&grid, &grid).unwrap();
        for j in 0..10 {
            for i in 0..10 {
                assert!(matches!(diff.delta(i, j), None | Some(0.0)));
            }
        }
        assert!(diff.to_sparse_points().is_empty());
    }

    #[test]
    fn test_difference_dimension_mismatch() {
        let a = Grid::build(bbox(), 3).unwrap();
        let b = Grid::build(bbox(), 4).unwrap();

        assert!(matches!(
            Grid::difference(&a, &b),
            Err(NightLightError::DimensionMismatch {
                left: (3, 3),
                right: (4, 4)
            })
        ));
    }

    #[test]
    fn test_difference_domain_mismatch() {
        let a = Grid::build(bbox(), 3).unwrap();
        let mut other = bbox();
        other.ur.lat = 13.0;
        let b = Grid::build(other, 3).unwrap();

        assert!(matches!(
            Grid::difference(&a, &b),
            Err(NightLightError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_aggregator_compare() {
        let before = dataset(2014, vec![sample(11.0, 71.0, 1.0)]);
        let after = dataset(2023, vec![sample(11.0, 71.0, 3.0)]);

        let agg = GridAggregator {
            resolution: 5,
            radius: 0.1,
        };
        let diff = agg.compare(bbox(), &before, &after).unwrap();

        assert_eq!(
            diff.to_sparse_points(),
            vec![HeatPoint {
                lat: 11.0,
                lon: 71.0,
                weight: 2.0
            }]
        );

        let default = GridAggregator::default();
        assert_eq!(default.resolution, 100);
        assert!((default.radius * default.radius - 0.1).abs() < 1.0e-12);
    }
}
