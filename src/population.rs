/*!
 * Population growth and its correlation with mean radiance.
 *
 * Population data comes from the World Bank indicator downloads, e.g. `API_SP.POP.GROW_DS2_*.csv`.
 * Those files start with four lines of metadata before the header row, and have one row per
 * country with one column per year.
 */
use crate::{stats::pearson, NightLightError, NightLightResult};
use serde::Serialize;
use std::io::{BufRead, BufReader, Read};

/// The number of metadata lines before the header in a World Bank indicator table.
pub const PREAMBLE_LINES: usize = 4;

const COUNTRY_COLUMN: &str = "Country Name";

/// Read the yearly values for one country, ordered by year.
///
/// Empty or non-numeric cells are skipped.
pub fn read_population<R: Read>(reader: R, country: &str) -> NightLightResult<Vec<(i32, f64)>> {
    let mut reader = BufReader::new(reader);

    let mut line = String::new();
    for _ in 0..PREAMBLE_LINES {
        line.clear();
        reader.read_line(&mut line)?;
    }

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let country_idx = headers
        .iter()
        .position(|h| h == COUNTRY_COLUMN)
        .ok_or(NightLightError::MissingColumn(COUNTRY_COLUMN))?;

    let year_columns: Vec<(usize, i32)> = headers
        .iter()
        .enumerate()
        .filter_map(|(idx, h)| h.trim().parse().ok().map(|year| (idx, year)))
        .collect();

    for record in rdr.records() {
        let record = record?;
        if record.get(country_idx) != Some(country) {
            continue;
        }

        let mut series: Vec<(i32, f64)> = year_columns
            .iter()
            .filter_map(|&(idx, year)| {
                let val: f64 = record.get(idx)?.trim().parse().ok()?;
                Some((year, val))
            })
            .collect();
        series.sort_unstable_by_key(|&(year, _)| year);

        log::debug!("{} years of population data for {}", series.len(), country);
        return Ok(series);
    }

    Err(NightLightError::MissingCountry(country.to_owned()))
}

/// One year with both a population growth rate and a mean radiance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CorrelationRow {
    pub year: i32,
    pub growth_rate: f64,
    pub mean_radiance: f64,
}

/// Population growth joined with mean radiance.
#[derive(Debug, Clone, PartialEq)]
pub struct Correlation {
    pub rows: Vec<CorrelationRow>,
    /// `None` with fewer than two joined years or no variance in either series.
    pub coefficient: Option<f64>,
}

impl Correlation {
    pub fn mean_growth_rate(&self) -> Option<f64> {
        mean(self.rows.iter().map(|r| r.growth_rate))
    }

    pub fn mean_radiance(&self) -> Option<f64> {
        mean(self.rows.iter().map(|r| r.mean_radiance))
    }
}

fn mean<I: ExactSizeIterator<Item = f64>>(vals: I) -> Option<f64> {
    let n = vals.len();
    if n == 0 {
        None
    } else {
        Some(vals.sum::<f64>() / n as f64)
    }
}

/// Join the two yearly series on year and compute the Pearson coefficient.
pub fn correlate(growth: &[(i32, f64)], radiance: &[(i32, f64)]) -> Correlation {
    let mut rows: Vec<CorrelationRow> = growth
        .iter()
        .filter_map(|&(year, growth_rate)| {
            radiance
                .iter()
                .find(|&&(y, _)| y == year)
                .map(|&(_, mean_radiance)| CorrelationRow {
                    year,
                    growth_rate,
                    mean_radiance,
                })
        })
        .collect();
    rows.sort_unstable_by_key(|r| r.year);

    let xs: Vec<f64> = rows.iter().map(|r| r.growth_rate).collect();
    let ys: Vec<f64> = rows.iter().map(|r| r.mean_radiance).collect();

    Correlation {
        coefficient: pearson(&xs, &ys),
        rows,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const TABLE: &str = concat!(
        "\"Data Source\",\"World Development Indicators\",\n",
        "\n",
        "\"Last Updated Date\",\"2024-06-28\",\n",
        "\n",
        "\"Country Name\",\"Country Code\",\"Indicator Name\",\"Indicator Code\",\"2014\",\"2015\",\"2016\",\"2017\",\n",
        "\"Nepal\",\"NPL\",\"Population growth (annual %)\",\"SP.POP.GROW\",\"0.9\",\"0.8\",\"0.7\",\"0.6\",\n",
        "\"India\",\"IND\",\"Population growth (annual %)\",\"SP.POP.GROW\",\"1.3\",\"1.2\",\"\",\"1.1\",\n",
    );

    #[test]
    fn test_read_population() {
        let series = read_population(TABLE.as_bytes(), "India").unwrap();
        assert_eq!(series, vec![(2014, 1.3), (2015, 1.2), (2017, 1.1)]);

        let nepal = read_population(TABLE.as_bytes(), "Nepal").unwrap();
        assert_eq!(nepal.len(), 4);
    }

    #[test]
    fn test_read_population_missing_country() {
        assert!(matches!(
            read_population(TABLE.as_bytes(), "Atlantis"),
            Err(NightLightError::MissingCountry(name)) if name == "Atlantis"
        ));
    }

    #[test]
    fn test_correlate() {
        let growth = [(2014, 1.3), (2015, 1.2), (2016, 1.1), (2017, 1.0)];
        let radiance = [(2017, 4.0), (2014, 1.0), (2015, 2.0), (2020, 9.0)];

        let corr = correlate(&growth, &radiance);
        assert_eq!(corr.rows.len(), 3);
        assert_eq!(corr.rows[0].year, 2014);
        assert_eq!(corr.rows[2].mean_radiance, 4.0);

        let r = corr.coefficient.unwrap();
        assert!((r + 1.0).abs() < 1.0e-9);

        assert!((corr.mean_growth_rate().unwrap() - 1.1666666666).abs() < 1.0e-6);
        assert!((corr.mean_radiance().unwrap() - 7.0 / 3.0).abs() < 1.0e-9);
    }

    #[test]
    fn test_correlate_too_few_years() {
        let corr = correlate(&[(2014, 1.3)], &[(2014, 2.0)]);
        assert_eq!(corr.rows.len(), 1);
        assert!(corr.coefficient.is_none());

        let corr = correlate(&[], &[]);
        assert!(corr.mean_radiance().is_none());
    }
}
