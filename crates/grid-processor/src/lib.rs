//! Grid alignment primitives for the ALAN atlas.
//!
//! Every input to a critical-depth tile lives on its own native grid: Kd
//! climatologies on the ocean colour grid, surface radiance on the GeoTIFF
//! pixel grid, the landmask on its own Zarr grid. This crate brings windows
//! of each onto one [`RegionalGrid`].
//!
//! # Architecture
//!
//! ```text
//! WindowSource::read_window(bbox + buffer)
//!      │
//!      ├─► GeoTiffRaster   (decodes only intersecting strips/tiles)
//!      ├─► ZarrLandmask    (retrieves only intersecting chunks)
//!      │
//!      ▼
//! SourceGrid<T> on native axes
//!      │
//!      ├─► fill_gaps (continuous fields, optional)
//!      │
//!      ├─► resample_continuous  → Vec<f32>, NaN = no-data
//!      └─► resample_categorical → Vec<Option<i32>>, None = no coverage
//! ```
//!
//! # Example
//!
//! ```ignore
//! use grid_processor::{GeoTiffRaster, RegionalGrid, WindowSource, resample_continuous};
//!
//! let raster = GeoTiffRaster::open("falchi.tif", None)?;
//! let grid = RegionalGrid::for_region(&region)?;
//! let window = raster.read_window(&region.bbox.expand(1.0))?;
//! let radiance = resample_continuous(&window, &grid, InterpolationMethod::Bilinear);
//! ```

pub mod config;
pub mod error;
pub mod fill;
pub mod processor;
pub mod resample;
pub mod types;

// Re-export commonly used types at crate root
pub use config::{ResampleConfig, DEFAULT_BUFFER_DEG, DEFAULT_GAP_FILL_WINDOW};
pub use error::{GridProcessorError, Result};
pub use fill::fill_gaps;
pub use processor::{GeoTiffRaster, WindowSource, ZarrLandmask};
pub use resample::{resample_categorical, resample_continuous};
pub use types::{Axis, CategoricalMethod, InterpolationMethod, RegionalGrid, SourceGrid};
