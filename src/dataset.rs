use crate::{
    geo::Boundary,
    grid::HeatPoint,
    sample::Sample,
    stats::{iqr_bounds, Stats},
    trend::{assign_region, Region, RegionSummary},
    NightLightResult,
};
use rustc_hash::FxHashMap;

/**
 * The radiance samples for one year that fall inside a boundary.
 *
 * Every sample carries a clean value which is `None` when the sample has been flagged as an
 * outlier. Flagged samples are kept so both the number of points inside the boundary and the
 * number that survived outlier removal can be reported.
 */
#[derive(Debug, Clone)]
pub struct PointDataset {
    year: i32,
    samples: Vec<Sample>,
    clean: Vec<Option<f64>>,
}

impl PointDataset {
    /// Keep only the samples strictly inside `boundary`.
    pub fn load(year: i32, samples: Vec<Sample>, boundary: &Boundary) -> Self {
        let total = samples.len();

        let samples: Vec<Sample> = samples
            .into_iter()
            .filter(|s| boundary.contains(s.coord()))
            .collect();
        let clean = samples.iter().map(|s| Some(s.value)).collect();

        log::debug!(
            "{}: {} of {} samples inside the boundary",
            year,
            samples.len(),
            total
        );

        PointDataset {
            year,
            samples,
            clean,
        }
    }

    /// Flag samples outside the `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]` fences as outliers.
    ///
    /// The fences are computed once over the radiance of every sample in the dataset, there is no
    /// second pass over the survivors.
    pub fn remove_outliers(self) -> Self {
        let PointDataset {
            year,
            samples,
            clean,
        } = self;

        let (lower, upper) = match iqr_bounds(samples.iter().map(|s| s.value)) {
            Some(bounds) => bounds,
            None => {
                return PointDataset {
                    year,
                    samples,
                    clean,
                }
            }
        };

        let clean: Vec<Option<f64>> = samples
            .iter()
            .zip(clean)
            .map(|(s, prev)| prev.filter(|_| s.value >= lower && s.value <= upper))
            .collect();

        let dataset = PointDataset {
            year,
            samples,
            clean,
        };

        log::debug!(
            "{}: outlier fences [{:.3}, {:.3}], {} of {} samples flagged",
            year,
            lower,
            upper,
            dataset.outlier_count(),
            dataset.len()
        );

        dataset
    }

    /// Statistics over the clean (not flagged) values.
    pub fn robust_stats(&self) -> NightLightResult<Stats> {
        Stats::from_values(self.clean.iter().flatten().copied())
    }

    /// Statistics over every value inside the boundary, ignoring outlier flags.
    pub fn raw_stats(&self) -> NightLightResult<Stats> {
        Stats::from_values(self.samples.iter().map(|s| s.value))
    }

    /// The year these samples were taken.
    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// The clean value of each sample, `None` for outliers.
    pub fn clean_values(&self) -> &[Option<f64>] {
        &self.clean
    }

    /// The number of samples inside the boundary.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The number of samples that are not flagged as outliers.
    pub fn clean_count(&self) -> usize {
        self.clean.iter().filter(|v| v.is_some()).count()
    }

    pub fn outlier_count(&self) -> usize {
        self.len() - self.clean_count()
    }

    /// Every sample with its radiance scaled by the maximum radiance in the dataset.
    ///
    /// This is the input for a single year heat layer, so outliers are included. If the maximum is
    /// not positive all weights are zero.
    pub fn heat_points(&self) -> Vec<HeatPoint> {
        let max = self
            .samples
            .iter()
            .map(|s| s.value)
            .fold(f64::NEG_INFINITY, f64::max);

        self.samples
            .iter()
            .map(|s| HeatPoint {
                lat: s.lat,
                lon: s.lon,
                weight: if max > 0.0 { s.value / max } else { 0.0 },
            })
            .collect()
    }

    /// Mean, median, and count of clean values in each region, ordered by region.
    ///
    /// Regions without any clean values are left out.
    pub fn region_summaries(&self) -> Vec<RegionSummary> {
        let mut by_region: FxHashMap<Region, Vec<f64>> = FxHashMap::default();
        for (s, clean) in self.samples.iter().zip(&self.clean) {
            if let Some(v) = clean {
                by_region
                    .entry(assign_region(s.lat, s.lon))
                    .or_default()
                    .push(*v);
            }
        }

        let mut summaries: Vec<RegionSummary> = by_region
            .into_iter()
            .filter_map(|(region, vals)| {
                let stats = Stats::from_values(vals).ok()?;
                Some(RegionSummary {
                    year: self.year,
                    region,
                    mean: stats.mean,
                    median: stats.median,
                    count: stats.count,
                })
            })
            .collect();
        summaries.sort_by_key(|s| s.region);

        summaries
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        geo::{Coord, Polygon},
        NightLightError,
    };

    fn boundary() -> Boundary {
        let ring = vec![
            Coord { lat: 0.0, lon: 0.0 },
            Coord { lat: 0.0, lon: 100.0 },
            Coord { lat: 40.0, lon: 100.0 },
            Coord { lat: 40.0, lon: 0.0 },
        ];
        Boundary::new(vec![Polygon::new(ring, vec![]).unwrap()]).unwrap()
    }

    fn sample(lat: f64, lon: f64, value: f64) -> Sample {
        Sample { lat, lon, value }
    }

    #[test]
    fn test_load_filters_to_boundary() {
        let samples = vec![
            sample(10.0, 10.0, 1.0),
            sample(50.0, 10.0, 2.0),
            sample(0.0, 10.0, 3.0),
            sample(39.9, 99.9, 4.0),
        ];

        let ds = PointDataset::load(2014, samples, &boundary());
        assert_eq!(ds.year(), 2014);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.samples()[1].value, 4.0);
        assert_eq!(ds.clean_values(), &[Some(1.0), Some(4.0)]);

        // Filtering again changes nothing.
        let again = PointDataset::load(2014, ds.samples().to_vec(), &boundary());
        assert_eq!(again.samples(), ds.samples());
    }

    #[test]
    fn test_small_sample_outlier() {
        let samples = vec![
            sample(1.0, 1.0, 1.0),
            sample(1.0, 1.0, 2.0),
            sample(1.0, 1.0, 3.0),
            sample(1.0, 1.0, 100.0),
        ];

        // Q1 = 1.75, Q3 = 27.25, fences [-36.5, 65.5]
        let ds = PointDataset::load(2020, samples, &boundary()).remove_outliers();

        assert_eq!(ds.len(), 4);
        assert_eq!(ds.clean_count(), 3);
        assert_eq!(ds.outlier_count(), 1);
        assert_eq!(ds.clean_values()[3], None);

        let stats = ds.robust_stats().unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.max, 3.0);

        let raw = ds.raw_stats().unwrap();
        assert_eq!(raw.count, 4);
        assert_eq!(raw.max, 100.0);
    }

    #[test]
    fn test_identical_values_are_kept() {
        let samples = (0..10).map(|i| sample(5.0, 5.0 + i as f64, 2.5)).collect();
        let ds = PointDataset::load(2020, samples, &boundary()).remove_outliers();

        assert_eq!(ds.clean_count(), 10);

        let mut samples: Vec<Sample> = ds.samples().to_vec();
        samples.push(sample(5.0, 50.0, 2.5000001));
        let ds = PointDataset::load(2020, samples, &boundary()).remove_outliers();

        assert_eq!(ds.clean_count(), 10);
        assert_eq!(ds.clean_values()[10], None);
    }

    #[test]
    fn test_outlier_removal_single_pass() {
        let mut samples: Vec<Sample> = (1..=20).map(|i| sample(5.0, 5.0, i as f64)).collect();
        samples.push(sample(5.0, 5.0, 500.0));

        let once = PointDataset::load(2020, samples, &boundary()).remove_outliers();
        let twice = once.clone().remove_outliers();

        assert_eq!(once.clean_count(), 20);
        assert_eq!(once.clean_values(), twice.clean_values());
    }

    #[test]
    fn test_empty_dataset() {
        let ds = PointDataset::load(2015, vec![sample(50.0, 50.0, 1.0)], &boundary());
        assert!(ds.is_empty());

        let ds = ds.remove_outliers();
        assert!(matches!(
            ds.robust_stats(),
            Err(NightLightError::EmptyDataset)
        ));
        assert!(ds.heat_points().is_empty());
        assert!(ds.region_summaries().is_empty());
    }

    #[test]
    fn test_heat_points() {
        let samples = vec![sample(10.0, 10.0, 1.0), sample(20.0, 20.0, 4.0)];
        let ds = PointDataset::load(2016, samples, &boundary());

        let heat = ds.heat_points();
        assert_eq!(heat.len(), 2);
        assert_eq!(heat[0].weight, 0.25);
        assert_eq!(heat[1].weight, 1.0);
        assert_eq!((heat[1].lat, heat[1].lon), (20.0, 20.0));
    }

    #[test]
    fn test_region_summaries() {
        let samples = vec![
            sample(30.0, 80.0, 1.0),
            sample(30.0, 70.0, 3.0),
            sample(10.0, 80.0, 5.0),
            sample(22.0, 80.0, 7.0),
        ];
        let ds = PointDataset::load(2017, samples, &boundary());

        let summaries = ds.region_summaries();
        assert_eq!(summaries.len(), 3);

        assert_eq!(summaries[0].region, Region::North);
        assert_eq!(summaries[0].count, 2);
        assert_eq!(summaries[0].mean, 2.0);
        assert_eq!(summaries[1].region, Region::South);
        assert_eq!(summaries[2].region, Region::Central);
        assert!(summaries.iter().all(|s| s.year == 2017));
    }
}
