use clap::Parser;
use log::LevelFilter;
use nightlight::{
    analyze_year, correlate, read_population, write_correlation_csv, Boundary, YearFiles,
};
use simple_logger::SimpleLogger;
use std::{
    error::Error,
    fmt::{self, Display},
    fs::File,
    path::PathBuf,
};

/*-------------------------------------------------------------------------------------------------
 *                               Parse Command Line Arguments
 *-----------------------------------------------------------------------------------------------*/
///
/// Correlate population growth with the mean night time radiance.
///
#[derive(Debug, Parser)]
#[clap(name = "lightpop")]
#[clap(author, version, about)]
struct LightPopOptionsInit {
    /// A World Bank population growth table.
    ///
    /// If this is not specified, then the program will check for it in the
    /// "NIGHTLIGHT_POPULATION" environment variable.
    #[clap(short, long)]
    #[clap(env = "NIGHTLIGHT_POPULATION")]
    population: PathBuf,

    /// The directory holding the yearly radiance tables.
    #[clap(short, long)]
    #[clap(env = "NIGHTLIGHT_DATA")]
    data_dir: PathBuf,

    /// A GeoJSON file with the country boundary.
    #[clap(short, long)]
    #[clap(env = "NIGHTLIGHT_BOUNDARY")]
    boundary: PathBuf,

    /// The country name as it appears in the population table.
    #[clap(long, default_value = "India")]
    country: String,

    /// The prefix of the yearly table names.
    #[clap(long, default_value = "VIIRS_India_")]
    prefix: String,

    /// The first year to include.
    #[clap(long, default_value_t = 2014)]
    first_year: i32,

    /// The last year to include.
    #[clap(long, default_value_t = 2023)]
    last_year: i32,

    /// Where to write the joined table.
    ///
    /// If this is not specified, then the program will write "population_correlation.csv" in the
    /// data directory.
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[clap(short, long)]
    verbose: bool,
}

#[derive(Debug)]
struct LightPopOptionsChecked {
    population: PathBuf,
    data_dir: PathBuf,
    boundary: PathBuf,
    country: String,
    prefix: String,
    first_year: i32,
    last_year: i32,
    output: PathBuf,
    verbose: bool,
}

impl Display for LightPopOptionsChecked {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        writeln!(f, "\n")?; // yes, two blank lines.
        writeln!(f, "    Population: {}", self.population.display())?;
        writeln!(f, "Data Directory: {}", self.data_dir.display())?;
        writeln!(f, "      Boundary: {}", self.boundary.display())?;
        writeln!(f, "       Country: {}", self.country)?;
        writeln!(f, "         Years: {} - {}", self.first_year, self.last_year)?;
        writeln!(f, "        Output: {}", self.output.display())?;
        writeln!(f, "\n")?; // yes, two blank lines.

        Ok(())
    }
}

/// Get the command line arguments and check them.
///
/// If there is missing data, try to fill it in with environment variables.
fn parse_args() -> Result<LightPopOptionsChecked, Box<dyn Error>> {
    let LightPopOptionsInit {
        population,
        data_dir,
        boundary,
        country,
        prefix,
        first_year,
        last_year,
        output,
        verbose,
    } = LightPopOptionsInit::parse();

    if first_year > last_year {
        return Err(format!("first year {} is after last year {}", first_year, last_year).into());
    }

    let output = match output {
        Some(v) => v,
        None => data_dir.join("population_correlation.csv"),
    };

    let checked = LightPopOptionsChecked {
        population,
        data_dir,
        boundary,
        country,
        prefix,
        first_year,
        last_year,
        output,
        verbose,
    };

    if verbose {
        println!("{}", checked);
    }

    Ok(checked)
}

/*-------------------------------------------------------------------------------------------------
 *                                             MAIN
 *-----------------------------------------------------------------------------------------------*/
fn main() -> Result<(), Box<dyn Error>> {
    let opts = parse_args()?;

    let level = if opts.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .with_module_level("nightlight", level)
        .with_module_level("lightpop", level)
        .init()?;

    let growth = read_population(File::open(&opts.population)?, &opts.country)?;

    let boundary = Boundary::from_geojson_file(&opts.boundary)?;
    let files = YearFiles::scan(&opts.data_dir, &opts.prefix);

    let mut radiance: Vec<(i32, f64)> = vec![];
    for year in opts.first_year..=opts.last_year {
        match analyze_year(year, &files, &boundary) {
            Ok(analysis) => radiance.push((year, analysis.robust.mean)),
            Err(err) => log::warn!("skipping {}: {}", year, err),
        }
    }

    let corr = correlate(&growth, &radiance);
    write_correlation_csv(&opts.output, &corr)?;

    log::info!("");
    log::info!("Summary Statistics:");
    if let Some(growth) = corr.mean_growth_rate() {
        log::info!("    Average Population Growth Rate: {:.3}%", growth);
    }
    if let Some(rad) = corr.mean_radiance() {
        log::info!("    Average Mean Radiance: {:.3}", rad);
    }
    match corr.coefficient {
        Some(r) => log::info!("    Correlation Coefficient: {:.3}", r),
        None => log::info!("    Not enough years to correlate."),
    }

    log::info!("");
    log::info!("{:>6} {:>12} {:>14}", "Year", "Growth (%)", "Mean Radiance");
    for row in &corr.rows {
        log::info!(
            "{:>6} {:>12.3} {:>14.4}",
            row.year,
            row.growth_rate,
            row.mean_radiance
        );
    }

    Ok(())
}
