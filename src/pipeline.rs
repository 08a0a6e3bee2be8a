/*!
 * The batch analysis: every year in the window is loaded and summarized on its own, then the
 * years that succeeded are compared with each other.
 */
use crate::{
    config::Config,
    dataset::PointDataset,
    geo::Boundary,
    kml::{change_layers, KmlFile, KmlWriter},
    output::{
        write_correlation_csv, write_html_report, write_regional_changes_csv, write_regional_csv,
        write_summary_csv, write_trends_csv, Report, SummaryRow,
    },
    population::{correlate, read_population, Correlation},
    stats::Stats,
    trend::{overall_change, regional_changes, year_over_year, Metric, Region, YearOverYear},
    viirs::{open_table, read_viirs, YearFiles},
    NightLightError, NightLightResult,
};
use chrono::Utc;
use rustc_hash::FxHashMap;
use std::{
    fs::File,
    path::{Path, PathBuf},
};
use strum::IntoEnumIterator;

/// The results for one year.
#[derive(Debug, Clone)]
pub struct YearAnalysis {
    pub dataset: PointDataset,
    /// Over every point inside the boundary.
    pub raw: Stats,
    /// Over the points that are not outliers.
    pub robust: Stats,
}

/// Everything a batch run produced.
#[derive(Debug)]
pub struct BatchSummary {
    pub analyses: FxHashMap<i32, YearAnalysis>,
    /// Years that could not be analyzed and why.
    pub failed: Vec<(i32, String)>,
    pub correlation: Option<Correlation>,
    /// Every file written, the report last.
    pub outputs: Vec<PathBuf>,
}

impl BatchSummary {
    /// The years that were analyzed, in order.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.analyses.keys().copied().collect();
        years.sort_unstable();
        years
    }
}

/// Read the table for a year and keep the samples inside the boundary.
pub fn load_year(year: i32, files: &YearFiles, boundary: &Boundary) -> NightLightResult<PointDataset> {
    let path = files.path_for(year)?;
    let read = read_viirs(open_table(path)?)?;

    if read.dropped > 0 {
        log::info!("{}: dropped {} malformed rows", year, read.dropped);
    }

    Ok(PointDataset::load(year, read.samples, boundary))
}

/// Load, flag outliers, and summarize one year.
pub fn analyze_year(
    year: i32,
    files: &YearFiles,
    boundary: &Boundary,
) -> NightLightResult<YearAnalysis> {
    let dataset = load_year(year, files, boundary)?.remove_outliers();
    let raw = dataset.raw_stats()?;
    let robust = dataset.robust_stats()?;

    log::info!(
        "{}: {} points, {} outliers, mean {:.4} (with outliers {:.4})",
        year,
        dataset.len(),
        dataset.outlier_count(),
        robust.mean,
        raw.mean
    );

    Ok(YearAnalysis {
        dataset,
        raw,
        robust,
    })
}

/// Run the whole analysis and write every output into the configured directory.
///
/// A year that fails is logged and left out, the run only fails if no year at all could be
/// analyzed or an output can't be written.
pub fn run(config: &Config) -> NightLightResult<BatchSummary> {
    let boundary = Boundary::from_geojson_file(&config.boundary_file)?;
    std::fs::create_dir_all(&config.output_dir)?;

    let files = YearFiles::scan(&config.data_dir, &config.file_prefix);

    let mut analyses: FxHashMap<i32, YearAnalysis> = FxHashMap::default();
    let mut failed: Vec<(i32, String)> = vec![];
    for year in config.years() {
        match analyze_year(year, &files, &boundary) {
            Ok(analysis) => {
                analyses.insert(year, analysis);
            }
            Err(err) => {
                log::warn!("skipping {}: {}", year, err);
                failed.push((year, err.to_string()));
            }
        }
    }

    if analyses.is_empty() {
        return Err(NightLightError::EmptyDataset);
    }

    let mut years: Vec<i32> = analyses.keys().copied().collect();
    years.sort_unstable();

    let mut outputs: Vec<PathBuf> = vec![];

    /*---- yearly summary ----*/
    let summary: Vec<SummaryRow> = years
        .iter()
        .map(|year| {
            let analysis = &analyses[year];
            SummaryRow::new(*year, &analysis.raw, &analysis.robust)
        })
        .collect();
    let path = config.output_path("summary.csv");
    write_summary_csv(&path, &summary)?;
    outputs.push(path);

    /*---- trends ----*/
    let series: Vec<(i32, Stats)> = years
        .iter()
        .map(|year| (*year, analyses[year].robust))
        .collect();

    let mut trends: Vec<(Metric, Vec<YearOverYear>)> = vec![];
    let mut overall: Vec<(Metric, YearOverYear)> = vec![];
    for metric in Metric::iter() {
        match year_over_year(&series, metric) {
            Ok(changes) => trends.push((metric, changes)),
            Err(err) => log::warn!("no year over year {}: {}", metric, err),
        }

        match overall_change(&series, metric) {
            Ok(Some(change)) => overall.push((metric, change)),
            Ok(None) => {}
            Err(err) => log::warn!("no overall change in {}: {}", metric, err),
        }
    }
    let path = config.output_path("yearly_trends.csv");
    write_trends_csv(&path, &trends)?;
    outputs.push(path);

    /*---- regions ----*/
    let regional_summaries: Vec<_> = years
        .iter()
        .flat_map(|year| analyses[year].dataset.region_summaries())
        .collect();
    let path = config.output_path("regional_summary.csv");
    write_regional_csv(&path, &regional_summaries)?;
    outputs.push(path);

    let regional: Vec<(Region, YearOverYear)> = match (years.first(), years.last()) {
        (Some(first), Some(last)) if first != last => regional_changes(
            &analyses[first].dataset.region_summaries(),
            &analyses[last].dataset.region_summaries(),
        ),
        _ => vec![],
    };
    let path = config.output_path("regional_changes.csv");
    write_regional_changes_csv(&path, &regional)?;
    outputs.push(path);

    /*---- maps ----*/
    let path = config.output_path("radiance_by_year.kml");
    write_yearly_heatmaps(&path, &years, &analyses, &boundary)?;
    outputs.push(path);

    let (before, after) = config.compare_years;
    match (analyses.get(&before), analyses.get(&after)) {
        (Some(a), Some(b)) => {
            let path = config.output_path(format!("difference_{}_{}.kml", before, after));
            write_difference_map(&path, config, a, b, &boundary)?;
            outputs.push(path);
        }
        _ => log::warn!(
            "skipping the difference map, {} and {} were not both analyzed",
            before,
            after
        ),
    }

    /*---- population ----*/
    let correlation = match config.population_file {
        Some(ref pop_path) => match population_correlation(pop_path, &config.country, &series) {
            Ok(corr) => {
                let path = config.output_path("population_correlation.csv");
                write_correlation_csv(&path, &corr)?;
                outputs.push(path);
                Some(corr)
            }
            Err(err) => {
                log::warn!("skipping the population correlation: {}", err);
                None
            }
        },
        None => None,
    };

    /*---- report ----*/
    let artifacts: Vec<String> = outputs
        .iter()
        .filter_map(|p| p.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();

    let title = format!("Night Light Analysis: {}", config.country);
    let report = Report {
        title: &title,
        generated: Utc::now(),
        summary: &summary,
        failed_years: &failed,
        overall: &overall,
        regional: &regional,
        correlation: correlation.as_ref(),
        artifacts: &artifacts,
    };
    let path = config.output_path("report.html");
    write_html_report(&path, &report)?;
    outputs.push(path);

    Ok(BatchSummary {
        analyses,
        failed,
        correlation,
        outputs,
    })
}

fn write_yearly_heatmaps(
    path: &Path,
    years: &[i32],
    analyses: &FxHashMap<i32, YearAnalysis>,
    boundary: &Boundary,
) -> NightLightResult<()> {
    let mut kml = KmlFile::new(path)?;
    kml.write_map_styles()?;
    kml.write_boundary("Boundary", boundary)?;

    for year in years {
        let points = analyses[year].dataset.heat_points();
        kml.write_heat_layer(&format!("Radiance {}", year), &points, Some(*year))?;
    }

    Ok(())
}

fn write_difference_map(
    path: &Path,
    config: &Config,
    before: &YearAnalysis,
    after: &YearAnalysis,
    boundary: &Boundary,
) -> NightLightResult<()> {
    let diff = config
        .grid
        .compare(boundary.bounding_box(), &before.dataset, &after.dataset)?;
    let points = diff.to_sparse_points();
    let (brighter, dimmer) = change_layers(&points);

    log::info!(
        "{} -> {}: {} cells brighter, {} dimmer",
        before.dataset.year(),
        after.dataset.year(),
        brighter.len(),
        dimmer.len()
    );

    let mut kml = KmlFile::new(path)?;
    kml.write_map_styles()?;
    kml.write_boundary("Boundary", boundary)?;
    kml.write_heat_layer("Brighter", &brighter, None)?;
    kml.write_heat_layer("Dimmer", &dimmer, None)?;

    Ok(())
}

fn population_correlation(
    pop_path: &Path,
    country: &str,
    series: &[(i32, Stats)],
) -> NightLightResult<Correlation> {
    if !pop_path.is_file() {
        return Err(NightLightError::MissingFile(pop_path.to_path_buf()));
    }

    let growth = read_population(File::open(pop_path)?, country)?;
    let radiance: Vec<(i32, f64)> = series.iter().map(|(year, s)| (*year, s.mean)).collect();

    let corr = correlate(&growth, &radiance);
    match corr.coefficient {
        Some(r) => log::info!("population growth vs mean radiance: r = {:.3}", r),
        None => log::info!("not enough overlapping years for a correlation"),
    }

    Ok(corr)
}
