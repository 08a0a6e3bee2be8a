/*!
 * Year over year and regional rollups of the yearly statistics.
 */
use crate::{stats::Stats, NightLightError, NightLightResult};
use serde::Serialize;
use strum::{Display, EnumIter, IntoStaticStr};

/// Regions are north of this latitude.
pub const NORTH_LAT: f64 = 28.0;
/// Regions are south of this latitude.
pub const SOUTH_LAT: f64 = 18.0;
/// Regions are west of this longitude.
pub const WEST_LON: f64 = 78.0;
/// Regions are east of this longitude.
pub const EAST_LON: f64 = 85.0;

/// Coarse regions used for the regional breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Display, EnumIter, IntoStaticStr, Serialize)]
pub enum Region {
    North,
    South,
    East,
    West,
    Central,
}

/// Classify a location into a [Region].
///
/// The rules are applied in order: north, south, west, east, and everything else is central. So
/// a point that is both far north and far east is [Region::North].
pub fn assign_region(lat: f64, lon: f64) -> Region {
    if lat > NORTH_LAT {
        Region::North
    } else if lat < SOUTH_LAT {
        Region::South
    } else if lon < WEST_LON {
        Region::West
    } else if lon > EAST_LON {
        Region::East
    } else {
        Region::Central
    }
}

/// A scalar picked out of [Stats] for trend analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, IntoStaticStr)]
pub enum Metric {
    #[strum(serialize = "Mean")]
    Mean,
    #[strum(serialize = "Median")]
    Median,
    #[strum(serialize = "5% Trimmed Mean")]
    TrimmedMean5,
    #[strum(serialize = "10% Trimmed Mean")]
    TrimmedMean10,
    #[strum(serialize = "Max")]
    Max,
    #[strum(serialize = "Total")]
    Total,
}

impl Metric {
    pub fn value(&self, stats: &Stats) -> f64 {
        match self {
            Metric::Mean => stats.mean,
            Metric::Median => stats.median,
            Metric::TrimmedMean5 => stats.trimmed_mean_5pct,
            Metric::TrimmedMean10 => stats.trimmed_mean_10pct,
            Metric::Max => stats.max,
            Metric::Total => stats.sum,
        }
    }
}

/// The change of a metric between two years.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearOverYear {
    pub from_year: i32,
    pub to_year: i32,
    pub pct_change: f64,
}

/// Percent change from `from` to `to`, `(to / from - 1) * 100`.
pub fn percent_change(from_year: i32, from: f64, to_year: i32, to: f64) -> NightLightResult<f64> {
    if from == 0.0 {
        return Err(NightLightError::DivisionByZero { from_year, to_year });
    }

    Ok((to / from - 1.0) * 100.0)
}

/// Percent change of `metric` between each consecutive pair of the series.
///
/// The series should be ordered by year. Years missing from the series are simply spanned, so a
/// series of 2014, 2015, 2017 yields the pairs (2014, 2015) and (2015, 2017).
pub fn year_over_year(series: &[(i32, Stats)], metric: Metric) -> NightLightResult<Vec<YearOverYear>> {
    series
        .windows(2)
        .map(|pair| {
            let (from_year, from) = (pair[0].0, metric.value(&pair[0].1));
            let (to_year, to) = (pair[1].0, metric.value(&pair[1].1));

            Ok(YearOverYear {
                from_year,
                to_year,
                pct_change: percent_change(from_year, from, to_year, to)?,
            })
        })
        .collect()
}

/// Percent change of `metric` from the first to the last entry of the series.
///
/// Returns `Ok(None)` if there are fewer than two entries.
pub fn overall_change(series: &[(i32, Stats)], metric: Metric) -> NightLightResult<Option<YearOverYear>> {
    match (series.first(), series.last()) {
        (Some(first), Some(last)) if series.len() > 1 => {
            let pct_change =
                percent_change(first.0, metric.value(&first.1), last.0, metric.value(&last.1))?;
            Ok(Some(YearOverYear {
                from_year: first.0,
                to_year: last.0,
                pct_change,
            }))
        }
        _ => Ok(None),
    }
}

/// Summary of the clean radiance values in one region for one year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegionSummary {
    pub year: i32,
    pub region: Region,
    pub mean: f64,
    pub median: f64,
    pub count: usize,
}

/// The change in regional mean between two sets of summaries, usually the first and last years.
///
/// Regions missing from either side are skipped, as are regions whose first mean is zero.
pub fn regional_changes(first: &[RegionSummary], last: &[RegionSummary]) -> Vec<(Region, YearOverYear)> {
    let mut changes = vec![];

    for start in first {
        let end = match last.iter().find(|s| s.region == start.region) {
            Some(end) => end,
            None => continue,
        };

        match percent_change(start.year, start.mean, end.year, end.mean) {
            Ok(pct_change) => changes.push((
                start.region,
                YearOverYear {
                    from_year: start.year,
                    to_year: end.year,
                    pct_change,
                },
            )),
            Err(err) => log::warn!("skipping regional change for {}: {}", start.region, err),
        }
    }

    changes
}

#[cfg(test)]
mod test {
    use super::*;
    use strum::IntoEnumIterator;

    fn stats_with_mean(mean: f64) -> Stats {
        Stats::from_values([mean]).unwrap()
    }

    #[test]
    fn test_assign_region() {
        assert_eq!(assign_region(30.0, 80.0), Region::North);
        assert_eq!(assign_region(30.0, 90.0), Region::North);
        assert_eq!(assign_region(10.0, 90.0), Region::South);
        assert_eq!(assign_region(22.0, 72.0), Region::West);
        assert_eq!(assign_region(22.0, 88.0), Region::East);
        assert_eq!(assign_region(22.0, 80.0), Region::Central);

        // The thresholds themselves are not past the line.
        assert_eq!(assign_region(28.0, 80.0), Region::Central);
        assert_eq!(assign_region(18.0, 78.0), Region::Central);
        assert_eq!(assign_region(20.0, 85.0), Region::Central);
    }

    #[test]
    fn test_region_names() {
        let names: Vec<&'static str> = Region::iter().map(Into::into).collect();
        assert_eq!(names, ["North", "South", "East", "West", "Central"]);
        assert_eq!(Metric::TrimmedMean5.to_string(), "5% Trimmed Mean");
    }

    #[test]
    fn test_year_over_year() {
        let series = [
            (2014, stats_with_mean(10.0)),
            (2015, stats_with_mean(12.0)),
            (2016, stats_with_mean(9.0)),
        ];

        let changes = year_over_year(&series, Metric::Mean).unwrap();

        assert_eq!(changes.len(), 2);
        assert_eq!((changes[0].from_year, changes[0].to_year), (2014, 2015));
        assert!((changes[0].pct_change - 20.0).abs() < 1.0e-9);
        assert_eq!((changes[1].from_year, changes[1].to_year), (2015, 2016));
        assert!((changes[1].pct_change + 25.0).abs() < 1.0e-9);

        let overall = overall_change(&series, Metric::Mean).unwrap().unwrap();
        assert_eq!((overall.from_year, overall.to_year), (2014, 2016));
        assert!((overall.pct_change + 10.0).abs() < 1.0e-9);
    }

    #[test]
    fn test_year_over_year_zero_base() {
        let series = [(2014, stats_with_mean(0.0)), (2015, stats_with_mean(1.0))];

        assert!(matches!(
            year_over_year(&series, Metric::Mean),
            Err(NightLightError::DivisionByZero {
                from_year: 2014,
                to_year: 2015
            })
        ));
    }

    #[test]
    fn test_short_series() {
        let series = [(2014, stats_with_mean(5.0))];
        assert!(year_over_year(&series, Metric::Median).unwrap().is_empty());
        assert!(overall_change(&series, Metric::Median).unwrap().is_none());
        assert!(year_over_year(&[], Metric::Median).unwrap().is_empty());
    }

    #[test]
    fn test_regional_changes() {
        let summary = |year, region, mean| RegionSummary {
            year,
            region,
            mean,
            median: mean,
            count: 1,
        };

        let first = [
            summary(2014, Region::North, 2.0),
            summary(2014, Region::South, 0.0),
            summary(2014, Region::East, 4.0),
        ];
        let last = [
            summary(2023, Region::North, 3.0),
            summary(2023, Region::South, 1.0),
            summary(2023, Region::West, 1.0),
        ];

        let changes = regional_changes(&first, &last);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].0, Region::North);
        assert!((changes[0].1.pct_change - 50.0).abs() < 1.0e-9);
    }
}
