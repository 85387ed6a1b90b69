//! NetCDF I/O for the ALAN critical-depth atlas.
//!
//! Two directions are covered:
//!
//! - [`kd`]: windowed reads of monthly Kd climatology files. Fill values and
//!   non-finite samples come back as NaN, packed values are unscaled.
//! - [`writer`]: the `(time, lat, lon)` tile layout written for every
//!   region/month, and a reader for the same layout.
//!
//! # System requirements
//!
//! Links against the native netcdf-c and HDF5 libraries
//! (`libnetcdf-dev`, `libhdf5-dev`).

pub mod error;
pub mod kd;
mod native;
pub mod writer;

pub use error::{NetCdfError, NetCdfResult};
pub use kd::{axis_window, read_kd_window, KdBand, KdSlice};
pub use native::silence_hdf5_errors;
pub use writer::{read_tile, write_tile, AttrValue, DataValues, DataVariable, TileDataset};
