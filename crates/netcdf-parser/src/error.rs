//! Error types for NetCDF operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for NetCDF parser operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF reading and writing.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The file does not exist
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Missing required variable, dimension or attribute
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// The requested window does not overlap the file's coordinates
    #[error("Requested window {window} lies outside file coverage {coverage}")]
    OutsideCoverage { window: String, coverage: String },

    /// Failure while defining or writing an output file
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// Error reported by the netcdf library itself
    #[error("NetCDF library error: {0}")]
    Library(#[from] netcdf::Error),
}

impl NetCdfError {
    pub fn invalid_format(msg: impl Into<String>) -> Self {
        Self::InvalidFormat(msg.into())
    }

    pub fn missing(msg: impl Into<String>) -> Self {
        Self::MissingData(msg.into())
    }

    pub fn write_failed(msg: impl Into<String>) -> Self {
        Self::WriteFailed(msg.into())
    }
}
