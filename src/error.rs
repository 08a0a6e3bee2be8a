use std::{
    error::Error,
    fmt::{Display, Formatter},
    path::PathBuf,
};

/// Result type used throughout the crate.
pub type NightLightResult<T> = Result<T, NightLightError>;

/// Everything that can go wrong while loading, aggregating, or writing night light data.
#[derive(Debug)]
pub enum NightLightError {
    /// An expected input file for a year (or a boundary / population file) does not exist.
    MissingFile(PathBuf),
    /// The `.geo` column of a row could not be decoded into a valid point.
    MalformedGeometry(String),
    /// No samples survived filtering, so there is nothing to compute statistics over.
    EmptyDataset,
    /// Two grids with different shapes or domains were combined.
    DimensionMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },
    /// A year over year change was requested against a zero base value.
    DivisionByZero { from_year: i32, to_year: i32 },
    /// The boundary file did not contain a usable polygon.
    InvalidBoundary(&'static str),
    /// Grids need at least one division per axis.
    InvalidResolution(usize),
    /// A required column was not present in a table.
    MissingColumn(&'static str),
    /// The requested country is not in the population table.
    MissingCountry(String),
    /// An archive did not contain exactly one member.
    BadArchive(PathBuf),
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    GeoJson(geojson::Error),
    Zip(zip::result::ZipError),
}

impl Display for NightLightError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        use NightLightError::*;

        match self {
            MissingFile(path) => write!(f, "missing file: {}", path.display()),
            MalformedGeometry(msg) => write!(f, "malformed geometry: {}", msg),
            EmptyDataset => write!(f, "no samples survived filtering"),
            DimensionMismatch { left, right } => write!(
                f,
                "grid dimensions do not match: {}x{} vs {}x{}",
                left.0, left.1, right.0, right.1
            ),
            DivisionByZero { from_year, to_year } => write!(
                f,
                "zero base value for change from {} to {}",
                from_year, to_year
            ),
            InvalidBoundary(msg) => write!(f, "invalid boundary: {}", msg),
            InvalidResolution(res) => write!(f, "invalid grid resolution: {}", res),
            MissingColumn(col) => write!(f, "missing column: {}", col),
            MissingCountry(name) => write!(f, "country not found: {}", name),
            BadArchive(path) => write!(
                f,
                "archive must contain exactly one file: {}",
                path.display()
            ),
            Io(err) => write!(f, "{}", err),
            Csv(err) => write!(f, "{}", err),
            Json(err) => write!(f, "{}", err),
            GeoJson(err) => write!(f, "{}", err),
            Zip(err) => write!(f, "{}", err),
        }
    }
}

impl Error for NightLightError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NightLightError::Io(err) => Some(err),
            NightLightError::Csv(err) => Some(err),
            NightLightError::Json(err) => Some(err),
            NightLightError::GeoJson(err) => Some(err),
            NightLightError::Zip(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for NightLightError {
    fn from(err: std::io::Error) -> Self {
        NightLightError::Io(err)
    }
}

impl From<csv::Error> for NightLightError {
    fn from(err: csv::Error) -> Self {
        NightLightError::Csv(err)
    }
}

impl From<serde_json::Error> for NightLightError {
    fn from(err: serde_json::Error) -> Self {
        NightLightError::Json(err)
    }
}

impl From<geojson::Error> for NightLightError {
    fn from(err: geojson::Error) -> Self {
        NightLightError::GeoJson(err)
    }
}

impl From<zip::result::ZipError> for NightLightError {
    fn from(err: zip::result::ZipError) -> Self {
        NightLightError::Zip(err)
    }
}
