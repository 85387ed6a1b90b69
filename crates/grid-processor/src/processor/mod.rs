//! Windowed readers for the static source rasters.

mod geotiff;
mod zarr;

pub use geotiff::GeoTiffRaster;
pub use zarr::ZarrLandmask;

use alan_common::BoundingBox;

use crate::error::Result;
use crate::types::SourceGrid;

/// A raster that can be read one geographic window at a time.
///
/// Sources are opened once and shared read-only; implementations must not
/// hold per-read state.
pub trait WindowSource<T>: Send + Sync {
    /// Read the cells whose extent overlaps `bbox`, on the source's own axes.
    ///
    /// Returns `OutOfBounds` when `bbox` misses the raster entirely.
    fn read_window(&self, bbox: &BoundingBox) -> Result<SourceGrid<T>>;

    /// Geographic extent covered by the whole raster.
    fn coverage(&self) -> BoundingBox;

    /// Location of the source, for logs and errors.
    fn location(&self) -> String;
}
