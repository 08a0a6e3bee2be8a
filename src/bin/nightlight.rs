use clap::Parser;
use log::LevelFilter;
use nightlight::{Config, GridAggregator};
use simple_logger::SimpleLogger;
use std::{error::Error, path::PathBuf};

/*-------------------------------------------------------------------------------------------------
 *                               Parse Command Line Arguments
 *-----------------------------------------------------------------------------------------------*/
///
/// Analyze night time lights over a range of years.
///
/// Every year in the range is clipped to the boundary, cleaned of outliers, and summarized. The
/// years are then compared with each other and the results are written as CSV tables, KML maps,
/// and an HTML report.
///
#[derive(Debug, Parser)]
#[clap(name = "nightlight")]
#[clap(author, version, about)]
struct NightLightOptionsInit {
    /// The directory holding the yearly radiance tables.
    ///
    /// If this is not specified, then the program will check for it in the "NIGHTLIGHT_DATA"
    /// environment variable.
    #[clap(short, long)]
    #[clap(env = "NIGHTLIGHT_DATA")]
    data_dir: PathBuf,

    /// A GeoJSON file with the country boundary.
    #[clap(short, long)]
    #[clap(env = "NIGHTLIGHT_BOUNDARY")]
    boundary: PathBuf,

    /// The directory to write the results into.
    ///
    /// If this is not specified, then the program will create an "analysis" directory inside the
    /// data directory.
    #[clap(short, long)]
    #[clap(env = "NIGHTLIGHT_OUTPUT")]
    output_dir: Option<PathBuf>,

    /// A World Bank population growth table to correlate with the mean radiance.
    #[clap(short, long)]
    #[clap(env = "NIGHTLIGHT_POPULATION")]
    population: Option<PathBuf>,

    /// The country name as it appears in the population table and the data file names.
    #[clap(long, default_value = "India")]
    country: String,

    /// The prefix of the yearly table names, defaults to "VIIRS_<country>_".
    #[clap(long)]
    prefix: Option<String>,

    /// The first year to analyze.
    #[clap(long, default_value_t = 2014)]
    first_year: i32,

    /// The last year to analyze.
    #[clap(long, default_value_t = 2023)]
    last_year: i32,

    /// The two years to difference on a grid as before,after. Defaults to the first and last years.
    #[clap(long, parse(try_from_str=parse_year_pair))]
    compare: Option<(i32, i32)>,

    /// The number of grid points along each axis for the difference map.
    #[clap(long, default_value_t = 100)]
    resolution: usize,

    /// Samples closer than the square root of this (in degrees) are averaged into a grid point.
    #[clap(long, default_value_t = 0.1)]
    radius_sq: f64,

    /// Verbose output
    #[clap(short, long)]
    verbose: bool,
}

/// Parse a pair of years like "2014,2023".
fn parse_year_pair(pair_str: &str) -> Result<(i32, i32), String> {
    let years: Vec<_> = pair_str.split(',').map(str::trim).collect();

    if years.len() != 2 {
        return Err(format!("expected two years as before,after: {}", pair_str));
    }

    let before = years[0].parse().map_err(|err| format!("{}", err))?;
    let after = years[1].parse().map_err(|err| format!("{}", err))?;

    Ok((before, after))
}

/// Get the command line arguments and check them.
///
/// If there is missing data, try to fill it in with environment variables.
fn parse_args() -> Result<(Config, bool), Box<dyn Error>> {
    let NightLightOptionsInit {
        data_dir,
        boundary,
        output_dir,
        population,
        country,
        prefix,
        first_year,
        last_year,
        compare,
        resolution,
        radius_sq,
        verbose,
    } = NightLightOptionsInit::parse();

    if first_year > last_year {
        return Err(format!("first year {} is after last year {}", first_year, last_year).into());
    }

    if resolution == 0 || radius_sq <= 0.0 {
        return Err(format!(
            "grid resolution and radius must be positive: resolution={} radius_sq={}",
            resolution, radius_sq
        )
        .into());
    }

    let output_dir = match output_dir {
        Some(v) => v,
        None => data_dir.join("analysis"),
    };

    let file_prefix = prefix.unwrap_or_else(|| format!("VIIRS_{}_", country));

    let config = Config {
        data_dir,
        file_prefix,
        boundary_file: boundary,
        output_dir,
        population_file: population,
        country,
        first_year,
        last_year,
        compare_years: compare.unwrap_or((first_year, last_year)),
        grid: GridAggregator {
            resolution,
            radius: radius_sq.sqrt(),
        },
    };

    if verbose {
        println!("{}", config);
    }

    Ok((config, verbose))
}

/*-------------------------------------------------------------------------------------------------
 *                                             MAIN
 *-----------------------------------------------------------------------------------------------*/
fn main() -> Result<(), Box<dyn Error>> {
    let (config, verbose) = parse_args()?;

    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .with_module_level("nightlight", level)
        .init()?;

    let summary = nightlight::run(&config)?;

    log::info!("");
    log::info!("Analyzed years: {:?}", summary.years());
    for (year, reason) in &summary.failed {
        log::info!("  Skipped {}: {}", year, reason);
    }

    if let Some(r) = summary.correlation.as_ref().and_then(|c| c.coefficient) {
        log::info!("Population growth vs mean radiance: r = {:.3}", r);
    }

    log::info!("Wrote:");
    for path in &summary.outputs {
        log::info!("    {}", path.display());
    }

    Ok(())
}
