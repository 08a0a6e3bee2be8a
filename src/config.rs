use crate::grid::GridAggregator;
use std::{
    fmt::{self, Display},
    ops::RangeInclusive,
    path::{Path, PathBuf},
};

/**
 * The settings for a batch run, built once at start up and passed to everything that needs a path
 * or a tunable.
 */
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory searched (recursively) for the yearly radiance tables.
    pub data_dir: PathBuf,
    /// Yearly tables are named `<file_prefix><year>.csv` or `.zip`.
    pub file_prefix: String,
    /// GeoJSON file with the country boundary.
    pub boundary_file: PathBuf,
    /// Where every output file is written.
    pub output_dir: PathBuf,
    /// World Bank population growth table, the correlation is skipped without it.
    pub population_file: Option<PathBuf>,
    /// The country name as it appears in the population table.
    pub country: String,
    pub first_year: i32,
    pub last_year: i32,
    /// The two years differenced on the grid.
    pub compare_years: (i32, i32),
    pub grid: GridAggregator,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("data/viirs"),
            file_prefix: "VIIRS_India_".to_owned(),
            boundary_file: PathBuf::from("data/india_boundary.geojson"),
            output_dir: PathBuf::from("output"),
            population_file: None,
            country: "India".to_owned(),
            first_year: 2014,
            last_year: 2023,
            compare_years: (2014, 2023),
            grid: GridAggregator::default(),
        }
    }
}

impl Config {
    /// Every year in the analysis window.
    pub fn years(&self) -> RangeInclusive<i32> {
        self.first_year..=self.last_year
    }

    /// The path for an output file named `name`.
    pub fn output_path<P: AsRef<Path>>(&self, name: P) -> PathBuf {
        self.output_dir.join(name)
    }
}

impl Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        writeln!(f, "\n")?; // yes, two blank lines.
        writeln!(f, "     Data Directory: {}", self.data_dir.display())?;
        writeln!(f, "        File Prefix: {}", self.file_prefix)?;
        writeln!(f, "           Boundary: {}", self.boundary_file.display())?;
        writeln!(f, "   Output Directory: {}", self.output_dir.display())?;
        match self.population_file {
            Some(ref pop) => writeln!(f, "    Population Data: {}", pop.display())?,
            None => writeln!(f, "    Population Data: none")?,
        }
        writeln!(f, "            Country: {}", self.country)?;
        writeln!(f, "              Years: {} - {}", self.first_year, self.last_year)?;
        writeln!(
            f,
            "      Compare Years: {} -> {}",
            self.compare_years.0, self.compare_years.1
        )?;
        writeln!(
            f,
            "               Grid: {} x {}, radius {:.4}",
            self.grid.resolution, self.grid.resolution, self.grid.radius
        )?;
        writeln!(f, "\n")?; // yes, two blank lines.

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.years().count(), 10);
        assert_eq!(config.compare_years, (2014, 2023));
        assert_eq!(config.grid.resolution, 100);
        assert_eq!(
            config.output_path("summary.csv"),
            PathBuf::from("output/summary.csv")
        );

        let shown = config.to_string();
        assert!(shown.contains("Years: 2014 - 2023"));
        assert!(shown.contains("Population Data: none"));
    }
}
