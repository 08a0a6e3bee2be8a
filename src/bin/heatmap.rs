use clap::Parser;
use log::LevelFilter;
use nightlight::{
    load_year, open_table, read_predictions, Boundary, KmlFile, KmlWriter, PointDataset, YearFiles,
};
use simple_logger::SimpleLogger;
use std::{
    error::Error,
    fmt::{self, Display},
    path::PathBuf,
};

/*-------------------------------------------------------------------------------------------------
 *                               Parse Command Line Arguments
 *-----------------------------------------------------------------------------------------------*/
///
/// Make a heat map of the night time lights for a single year.
///
/// Radiance is scaled by the brightest point inside the boundary and written to a KML file along
/// with the boundary outline. With a predictions table the map is made from the predicted values
/// for that year instead of the observations.
///
#[derive(Debug, Parser)]
#[clap(name = "heatmap")]
#[clap(author, version, about)]
struct HeatmapOptionsInit {
    /// The year to map.
    year: i32,

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

    /// A table of predicted radiance to map instead of the observations.
    #[clap(short, long)]
    predictions: Option<PathBuf>,

    /// The path to a KML file to produce from this run.
    ///
    /// If this is not specified, then the program will create "heatmap_<year>.kml" in the data
    /// directory.
    #[clap(short, long)]
    kml_file: Option<PathBuf>,

    /// The prefix of the yearly table names.
    #[clap(long, default_value = "VIIRS_India_")]
    prefix: String,

    /// Verbose output
    #[clap(short, long)]
    verbose: bool,
}

#[derive(Debug)]
struct HeatmapOptionsChecked {
    year: i32,
    data_dir: PathBuf,
    boundary: PathBuf,
    predictions: Option<PathBuf>,
    kml_file: PathBuf,
    prefix: String,
    verbose: bool,
}

impl Display for HeatmapOptionsChecked {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        writeln!(f, "\n")?; // yes, two blank lines.
        writeln!(f, "          Year: {}", self.year)?;
        match self.predictions {
            Some(ref pth) => writeln!(f, "   Predictions: {}", pth.display())?,
            None => writeln!(f, "Data Directory: {}", self.data_dir.display())?,
        }
        writeln!(f, "      Boundary: {}", self.boundary.display())?;
        writeln!(f, "    Output KML: {}", self.kml_file.display())?;
        writeln!(f, "\n")?; // yes, two blank lines.

        Ok(())
    }
}

/// Get the command line arguments and check them.
///
/// If there is missing data, try to fill it in with environment variables.
fn parse_args() -> HeatmapOptionsChecked {
    let HeatmapOptionsInit {
        year,
        data_dir,
        boundary,
        predictions,
        kml_file,
        prefix,
        verbose,
    } = HeatmapOptionsInit::parse();

    let kml_file = match kml_file {
        Some(v) => v,
        None => data_dir.join(format!("heatmap_{}.kml", year)),
    };

    let checked = HeatmapOptionsChecked {
        year,
        data_dir,
        boundary,
        predictions,
        kml_file,
        prefix,
        verbose,
    };

    if verbose {
        println!("{}", checked);
    }

    checked
}

/*-------------------------------------------------------------------------------------------------
 *                                             MAIN
 *-----------------------------------------------------------------------------------------------*/
fn main() -> Result<(), Box<dyn Error>> {
    let opts = parse_args();

    let level = if opts.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .with_module_level("nightlight", level)
        .with_module_level("heatmap", level)
        .init()?;

    let boundary = Boundary::from_geojson_file(&opts.boundary)?;

    let (dataset, label) = match opts.predictions {
        Some(ref pth) => {
            let read = read_predictions(open_table(pth)?, opts.year)?;
            let dataset = PointDataset::load(opts.year, read.samples, &boundary);
            (dataset, format!("Predicted radiance {}", opts.year))
        }
        None => {
            let files = YearFiles::scan(&opts.data_dir, &opts.prefix);
            let dataset = load_year(opts.year, &files, &boundary)?;
            (dataset, format!("Radiance {}", opts.year))
        }
    };

    if dataset.is_empty() {
        return Err(format!("no points inside the boundary for {}", opts.year).into());
    }

    let points = dataset.heat_points();

    let mut kfile = KmlFile::new(&opts.kml_file)?;
    kfile.write_map_styles()?;
    kfile.write_boundary("Boundary", &boundary)?;
    kfile.write_heat_layer(&label, &points, Some(opts.year))?;

    log::info!(
        "{}: {} points written to {}",
        label,
        points.len(),
        opts.kml_file.display()
    );

    Ok(())
}
