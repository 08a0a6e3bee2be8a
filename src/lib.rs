//! Night time light analysis for a country from yearly VIIRS radiance samples.
//!
//! Samples are clipped to a boundary, outliers are flagged, and each year is summarized. Years are
//! then compared on a regular grid, over time, by region, and against population growth.

pub use config::Config;
pub use crate::geo::{BoundingBox, Boundary, Coord, Geo, Hilbert2DRTreeView, Polygon};
pub use dataset::PointDataset;
pub use error::{NightLightError, NightLightResult};
pub use grid::{DifferenceGrid, Grid, GridAggregator, HeatPoint, DEFAULT_RADIUS_SQ, DEFAULT_RESOLUTION};
pub use kml::{change_layers, year_span, HeatStyle, KmlFile, KmlWriter};
pub use output::{
    write_correlation_csv, write_html_report, write_regional_changes_csv, write_regional_csv,
    write_summary_csv, write_trends_csv, Report, SummaryRow,
};
pub use pipeline::{analyze_year, load_year, run, BatchSummary, YearAnalysis};
pub use population::{correlate, read_population, Correlation, CorrelationRow};
pub use sample::Sample;
pub use stats::{iqr_bounds, pearson, quantile, trimmed_mean, Stats, IQR_FENCE};
pub use trend::{
    assign_region, overall_change, percent_change, regional_changes, year_over_year, Metric,
    Region, RegionSummary, YearOverYear,
};
pub use viirs::{open_table, read_predictions, read_viirs, ViirsRead, YearFiles};

/**************************************************************************************************
 * Private Implementation
 *************************************************************************************************/
mod config;
mod dataset;
mod error;
mod geo;
mod grid;
mod kml;
mod output;
mod pipeline;
mod population;
mod sample;
mod stats;
mod trend;
mod viirs;
