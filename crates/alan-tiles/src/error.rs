//! Error types for the tile pipeline.

use std::fmt;
use std::path::{Path, PathBuf};

use alan_common::Month;
use grid_processor::GridProcessorError;
use netcdf_parser::NetCdfError;
use thiserror::Error;

/// Errors raised while producing a tile.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlanError {
    #[error("Input not found: {}", .path.display())]
    MissingInput { path: PathBuf },

    #[error("Unreadable input {}: {detail}", .path.display())]
    Format { path: PathBuf, detail: String },

    #[error("Region {region} does not overlap {source_name}: {detail}")]
    GridMismatch {
        region: String,
        source_name: String,
        detail: String,
    },

    #[error("Shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        context: String,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Failed to write {}: {detail}", .path.display())]
    Write { path: PathBuf, detail: String },

    #[error("Invalid tile metadata: {0}")]
    Metadata(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl AlanError {
    pub fn format(path: impl AsRef<Path>, detail: impl Into<String>) -> Self {
        Self::Format {
            path: path.as_ref().to_path_buf(),
            detail: detail.into(),
        }
    }

    pub fn write(path: impl AsRef<Path>, detail: impl ToString) -> Self {
        Self::Write {
            path: path.as_ref().to_path_buf(),
            detail: detail.to_string(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::Metadata(msg.into())
    }

    /// Map a source reader error for `path` while aligning `region`.
    pub fn from_grid(err: GridProcessorError, path: &Path, region: &str) -> Self {
        match err {
            GridProcessorError::NotFound(_) => Self::MissingInput {
                path: path.to_path_buf(),
            },
            GridProcessorError::OutOfBounds { requested, grid } => Self::GridMismatch {
                region: region.to_string(),
                source_name: path.display().to_string(),
                detail: format!("window {} outside coverage {}", requested, grid),
            },
            GridProcessorError::ConfigError(msg) => Self::Config(msg),
            other => Self::format(path, other.to_string()),
        }
    }

    /// Map a Kd reader error for `path` while aligning `region`.
    pub fn from_netcdf(err: NetCdfError, path: &Path, region: &str) -> Self {
        match err {
            NetCdfError::NotFound(p) => Self::MissingInput { path: p },
            NetCdfError::OutsideCoverage { window, coverage } => Self::GridMismatch {
                region: region.to_string(),
                source_name: path.display().to_string(),
                detail: format!("window {} outside coverage {}", window, coverage),
            },
            NetCdfError::WriteFailed(msg) => Self::write(path, msg),
            other => Self::format(path, other.to_string()),
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, AlanError>;

/// The pipeline stage a tile failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Align,
    Attenuate,
    Mask,
    Assemble,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Align => "align",
            Self::Attenuate => "attenuate",
            Self::Mask => "mask",
            Self::Assemble => "assemble",
            Self::Write => "write",
        };
        f.write_str(name)
    }
}

/// A failed (region, month) tile.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Tile {region}/{month} failed at {stage}: {error}")]
pub struct TileFailure {
    pub region: String,
    pub month: Month,
    pub stage: Stage,
    #[source]
    pub error: AlanError,
}

impl TileFailure {
    pub fn new(region: impl Into<String>, month: Month, stage: Stage, error: AlanError) -> Self {
        Self {
            region: region.into(),
            month,
            stage,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_not_found_is_missing_input() {
        let path = Path::new("/data/falchi.tif");
        let err = AlanError::from_grid(
            GridProcessorError::not_found("/data/falchi.tif"),
            path,
            "Oceania",
        );
        assert_eq!(
            err,
            AlanError::MissingInput {
                path: path.to_path_buf()
            }
        );
    }

    #[test]
    fn test_out_of_bounds_is_grid_mismatch() {
        let err = AlanError::from_grid(
            GridProcessorError::out_of_bounds("a", "b"),
            Path::new("landmask.zarr"),
            "NAm",
        );
        assert!(matches!(err, AlanError::GridMismatch { ref region, .. } if region == "NAm"));
    }

    #[test]
    fn test_netcdf_errors_map_to_taxonomy() {
        let path = Path::new("kd_03.nc");
        assert!(matches!(
            AlanError::from_netcdf(NetCdfError::NotFound(path.to_path_buf()), path, "Oceania"),
            AlanError::MissingInput { .. }
        ));
        assert!(matches!(
            AlanError::from_netcdf(NetCdfError::missing("variable 'kd_blue'"), path, "Oceania"),
            AlanError::Format { .. }
        ));
    }

    #[test]
    fn test_failure_display_names_stage() {
        let failure = TileFailure::new(
            "Oceania",
            Month::new(3).unwrap(),
            Stage::Align,
            AlanError::MissingInput {
                path: PathBuf::from("kd_03.nc"),
            },
        );
        let text = failure.to_string();
        assert!(text.contains("Oceania/03"));
        assert!(text.contains("align"));
    }
}
