//! Source reading and resampling errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridProcessorError {
    /// The source path does not exist.
    #[error("grid source not found: {0}")]
    NotFound(String),

    #[error("cannot open source: {0}")]
    OpenFailed(String),

    #[error("cannot read source window: {0}")]
    ReadFailed(String),

    /// A requested window has no cells in the source.
    #[error("window {requested} lies outside source coverage {grid}")]
    OutOfBounds { requested: String, grid: String },

    /// Missing or inconsistent georeferencing, axes or array layout.
    #[error("invalid source metadata: {0}")]
    InvalidMetadata(String),

    #[error("zarr store error: {0}")]
    ZarrError(String),

    #[error("GeoTIFF decode error: {0}")]
    TiffError(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid resampling configuration: {0}")]
    ConfigError(String),
}

impl GridProcessorError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn open_failed(msg: impl Into<String>) -> Self {
        Self::OpenFailed(msg.into())
    }

    pub fn read_failed(msg: impl Into<String>) -> Self {
        Self::ReadFailed(msg.into())
    }

    /// `requested` and `grid` are extent descriptions.
    pub fn out_of_bounds(requested: impl Into<String>, grid: impl Into<String>) -> Self {
        Self::OutOfBounds {
            requested: requested.into(),
            grid: grid.into(),
        }
    }

    pub fn invalid_metadata(msg: impl Into<String>) -> Self {
        Self::InvalidMetadata(msg.into())
    }

    pub fn zarr_error(msg: impl Into<String>) -> Self {
        Self::ZarrError(msg.into())
    }
}

impl From<std::io::Error> for GridProcessorError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<tiff::TiffError> for GridProcessorError {
    fn from(err: tiff::TiffError) -> Self {
        Self::TiffError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GridProcessorError>;
