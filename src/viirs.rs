/*!
 * Reading radiance tables.
 *
 * The yearly tables are Earth Engine exports of randomly sampled points from the annual mean VIIRS
 * day/night band composite. Each row has an `avg_rad` column with the radiance and a `.geo` column
 * holding the point geometry as a GeoJSON string. Other columns (e.g. `system:index`) are ignored.
 */
use crate::{sample::Sample, NightLightError, NightLightResult};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::{
    fs::File,
    io::{BufReader, Cursor, Read},
    path::{Path, PathBuf},
};

/// The samples read from a table and how many rows had to be skipped.
#[derive(Debug, Default)]
pub struct ViirsRead {
    pub samples: Vec<Sample>,
    pub dropped: usize,
}

#[derive(Debug, Deserialize)]
struct ViirsRow {
    #[serde(rename = ".geo")]
    geo: String,
    avg_rad: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PredictionRow {
    year: i32,
    latitude: f64,
    longitude: f64,
    predicted_light_pollution: f64,
}

fn require_columns<R: Read>(
    rdr: &mut csv::Reader<R>,
    columns: &[&'static str],
) -> NightLightResult<()> {
    let headers = rdr.headers()?;
    for &col in columns {
        if !headers.iter().any(|h| h == col) {
            return Err(NightLightError::MissingColumn(col));
        }
    }
    Ok(())
}

/// Read radiance samples from a yearly table.
///
/// Rows with a malformed geometry or a missing radiance are dropped and logged, they are not
/// fatal. A missing column or an I/O error is.
pub fn read_viirs<R: Read>(reader: R) -> NightLightResult<ViirsRead> {
    let mut rdr = csv::Reader::from_reader(reader);
    require_columns(&mut rdr, &[".geo", "avg_rad"])?;

    let mut read = ViirsRead::default();

    for (row_num, row) in rdr.deserialize::<ViirsRow>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                log::warn!("dropping row {}: {}", row_num + 1, err);
                read.dropped += 1;
                continue;
            }
        };

        let value = match row.avg_rad {
            Some(value) => value,
            None => {
                log::warn!("dropping row {}: no radiance value", row_num + 1);
                read.dropped += 1;
                continue;
            }
        };

        match Sample::from_geo(&row.geo, value) {
            Ok(sample) => read.samples.push(sample),
            Err(err) => {
                log::warn!("dropping row {}: {}", row_num + 1, err);
                read.dropped += 1;
            }
        }
    }

    log::debug!(
        "read {} samples, dropped {} rows",
        read.samples.len(),
        read.dropped
    );

    Ok(read)
}

/// Read the predicted radiance for one year from a predictions table.
///
/// The table has `year`, `latitude`, `longitude` and `predicted_light_pollution` columns with one
/// row per point per predicted year.
pub fn read_predictions<R: Read>(reader: R, year: i32) -> NightLightResult<ViirsRead> {
    let mut rdr = csv::Reader::from_reader(reader);
    require_columns(
        &mut rdr,
        &["year", "latitude", "longitude", "predicted_light_pollution"],
    )?;

    let mut read = ViirsRead::default();

    for row in rdr.deserialize::<PredictionRow>() {
        let row = match row {
            Ok(row) => row,
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                log::warn!("dropping prediction row: {}", err);
                read.dropped += 1;
                continue;
            }
        };

        if row.year != year {
            continue;
        }

        match Sample::new(row.latitude, row.longitude, row.predicted_light_pollution) {
            Ok(sample) => read.samples.push(sample),
            Err(err) => {
                log::warn!("dropping prediction row: {}", err);
                read.dropped += 1;
            }
        }
    }

    Ok(read)
}

/// Open a table for reading.
///
/// Plain `.csv` files are read directly, a `.zip` archive must contain exactly one member which is
/// read into memory.
pub fn open_table<P: AsRef<Path>>(path: P) -> NightLightResult<Box<dyn Read>> {
    let p = path.as_ref();
    if !p.is_file() {
        return Err(NightLightError::MissingFile(p.to_path_buf()));
    }

    match p.extension().and_then(|ext| ext.to_str()) {
        Some("zip") => {
            let file = File::open(p)?;
            let mut zip = zip::ZipArchive::new(file)?;
            if zip.len() != 1 {
                return Err(NightLightError::BadArchive(p.to_path_buf()));
            }

            let mut member = zip.by_index(0)?;
            let mut buf: Vec<u8> = Vec::with_capacity(member.size() as usize);
            member.read_to_end(&mut buf)?;

            Ok(Box::new(Cursor::new(buf)))
        }
        Some("csv") => Ok(Box::new(BufReader::new(File::open(p)?))),
        _ => Err(std::io::Error::from(std::io::ErrorKind::Unsupported).into()),
    }
}

/**
 * An index of the yearly tables available in a data directory.
 *
 * Tables are named `<prefix><year>.csv` or `<prefix><year>.zip`, e.g. `VIIRS_India_2014.csv`. If
 * both exist for a year the plain CSV wins.
 */
#[derive(Debug)]
pub struct YearFiles {
    dir: PathBuf,
    prefix: String,
    files: FxHashMap<i32, PathBuf>,
}

impl YearFiles {
    /// Walk `dir` (recursively) and index every yearly table.
    pub fn scan<P: AsRef<Path>>(dir: P, prefix: &str) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let mut files: FxHashMap<i32, PathBuf> = FxHashMap::default();

        for entry in walkdir::WalkDir::new(&dir)
            .into_iter()
            .filter_map(|res| res.ok())
            .filter(|entry| entry.path().is_file())
        {
            let fname = entry.file_name().to_string_lossy();

            let year = match Self::year_from_file_name(&fname, prefix) {
                Some(year) => year,
                None => continue,
            };

            let is_csv = fname.ends_with(".csv");
            let path = entry.path().to_path_buf();
            files
                .entry(year)
                .and_modify(|existing| {
                    if is_csv {
                        *existing = path.clone();
                    }
                })
                .or_insert(path);
        }

        log::debug!("found {} yearly tables in {}", files.len(), dir.display());

        YearFiles {
            dir,
            prefix: prefix.to_owned(),
            files,
        }
    }

    fn year_from_file_name(fname: &str, prefix: &str) -> Option<i32> {
        let rest = fname.strip_prefix(prefix)?;
        let year = rest
            .strip_suffix(".csv")
            .or_else(|| rest.strip_suffix(".zip"))?;
        year.parse().ok()
    }

    /// Get the table for a year.
    pub fn path_for(&self, year: i32) -> NightLightResult<&Path> {
        self.files.get(&year).map(PathBuf::as_path).ok_or_else(|| {
            NightLightError::MissingFile(self.dir.join(format!("{}{}.csv", self.prefix, year)))
        })
    }

    /// All years with a table, in order.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.files.keys().copied().collect();
        years.sort_unstable();
        years
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_read_viirs() {
        let table = concat!(
            "system:index,avg_rad,.geo\n",
            "0,1.5,\"{\"\"type\"\":\"\"Point\"\",\"\"coordinates\"\":[78.5,22.5]}\"\n",
            "1,,\"{\"\"type\"\":\"\"Point\"\",\"\"coordinates\"\":[78.5,22.5]}\"\n",
            "2,2.5,\"{\"\"type\"\":\"\"Point\"\",\"\"coordinates\"\":[500.0,22.5]}\"\n",
            "3,abc,\"{\"\"type\"\":\"\"Point\"\",\"\"coordinates\"\":[78.5,22.5]}\"\n",
            "4,0.25,\"{\"\"type\"\":\"\"Point\"\",\"\"coordinates\"\":[80.0,12.0]}\"\n",
            "5,3.0,garbage\n",
        );

        let read = read_viirs(table.as_bytes()).unwrap();

        assert_eq!(read.samples.len(), 2);
        assert_eq!(read.dropped, 4);
        assert_eq!(
            read.samples[0],
            Sample {
                lat: 22.5,
                lon: 78.5,
                value: 1.5
            }
        );
        assert_eq!(read.samples[1].lat, 12.0);
        assert_eq!(read.samples[1].value, 0.25);
    }

    #[test]
    fn test_read_viirs_missing_column() {
        let table = "system:index,radiance,.geo\n0,1.0,x\n";
        assert!(matches!(
            read_viirs(table.as_bytes()),
            Err(NightLightError::MissingColumn("avg_rad"))
        ));
    }

    #[test]
    fn test_read_predictions() {
        let table = concat!(
            "year,latitude,longitude,predicted_light_pollution\n",
            "2028,22.0,78.0,1.0\n",
            "2029,22.0,78.0,2.0\n",
            "2029,23.0,79.0,4.0\n",
            "2029,95.0,79.0,4.0\n",
        );

        let read = read_predictions(table.as_bytes(), 2029).unwrap();
        assert_eq!(read.samples.len(), 2);
        assert_eq!(read.dropped, 1);
        assert_eq!(read.samples[1].value, 4.0);
    }

    #[test]
    fn test_year_from_file_name() {
        let prefix = "VIIRS_India_";
        assert_eq!(
            YearFiles::year_from_file_name("VIIRS_India_2014.csv", prefix),
            Some(2014)
        );
        assert_eq!(
            YearFiles::year_from_file_name("VIIRS_India_2023.zip", prefix),
            Some(2023)
        );
        assert_eq!(
            YearFiles::year_from_file_name("VIIRS_India_2023.txt", prefix),
            None
        );
        assert_eq!(
            YearFiles::year_from_file_name("VIIRS_Nepal_2023.csv", prefix),
            None
        );
        assert_eq!(
            YearFiles::year_from_file_name("VIIRS_India_latest.csv", prefix),
            None
        );
    }

    #[test]
    fn test_missing_year() {
        let files = YearFiles::scan("/this/path/does/not/exist", "VIIRS_India_");
        assert!(files.years().is_empty());
        assert!(matches!(
            files.path_for(2014),
            Err(NightLightError::MissingFile(_))
        ));
        assert!(matches!(
            open_table("/this/path/does/not/exist.csv"),
            Err(NightLightError::MissingFile(_))
        ));
    }
}
