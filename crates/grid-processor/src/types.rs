//! Core types for grid alignment.

use alan_common::{BoundingBox, Region};
use serde::{Deserialize, Serialize};

use crate::error::{GridProcessorError, Result};

/// A strictly monotonic coordinate axis of cell centres.
///
/// Axes may run in either direction: Kd and landmask latitudes are often
/// stored north to south, GeoTIFF rows always are.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    values: Vec<f64>,
    ascending: bool,
}

impl Axis {
    /// Build an axis, rejecting empty, non-finite or non-monotonic values.
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(GridProcessorError::invalid_metadata("coordinate axis is empty"));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(GridProcessorError::invalid_metadata(
                "coordinate axis has non-finite values",
            ));
        }
        let ascending = values.len() < 2 || values[1] > values[0];
        let monotonic = values.windows(2).all(|w| {
            if ascending {
                w[1] > w[0]
            } else {
                w[1] < w[0]
            }
        });
        if !monotonic {
            return Err(GridProcessorError::invalid_metadata(
                "coordinate axis is not strictly monotonic",
            ));
        }
        Ok(Self { values, ascending })
    }

    /// Regular axis of `count` centres starting at `first`.
    pub fn regular(first: f64, step: f64, count: usize) -> Result<Self> {
        Self::new((0..count).map(|i| first + (i as f64) * step).collect())
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_ascending(&self) -> bool {
        self.ascending
    }

    /// Mean distance between neighbouring centres, 0 for a single cell.
    pub fn spacing(&self) -> f64 {
        let n = self.values.len();
        if n < 2 {
            return 0.0;
        }
        (self.values[n - 1] - self.values[0]).abs() / (n - 1) as f64
    }

    /// Smallest and largest centre.
    pub fn centre_range(&self) -> (f64, f64) {
        let first = self.values[0];
        let last = self.values[self.values.len() - 1];
        (first.min(last), first.max(last))
    }

    /// Extent covered by the cells, centres plus half a cell on each side.
    pub fn cell_range(&self) -> (f64, f64) {
        let (lo, hi) = self.centre_range();
        let half = self.spacing() / 2.0;
        (lo - half, hi + half)
    }

    /// Fractional index of `coord`.
    ///
    /// Coordinates up to half a cell beyond the outermost centres snap to the
    /// edge index; anything further out has no index.
    pub fn fractional_index(&self, coord: f64) -> Option<f64> {
        let (lo, hi) = self.cell_range();
        if !(coord >= lo && coord <= hi) {
            return None;
        }
        let n = self.values.len();
        if n == 1 {
            return Some(0.0);
        }
        let (clo, chi) = self.centre_range();
        let c = coord.clamp(clo, chi);

        let i = if self.ascending {
            self.values.partition_point(|&v| v <= c)
        } else {
            self.values.partition_point(|&v| v >= c)
        }
        .saturating_sub(1)
        .min(n - 2);

        let (a, b) = (self.values[i], self.values[i + 1]);
        Some(i as f64 + (c - a) / (b - a))
    }

    /// Index of the cell whose centre is closest to `coord`.
    pub fn nearest_index(&self, coord: f64) -> Option<usize> {
        self.fractional_index(coord).map(|f| f.round() as usize)
    }

    /// Indices of cells that overlap the open interval `(lo, hi)`.
    pub fn overlapping(&self, lo: f64, hi: f64) -> std::ops::Range<usize> {
        let half = self.spacing() / 2.0;
        if self.ascending {
            let start = self.values.partition_point(|&v| v + half <= lo);
            let end = self.values.partition_point(|&v| v - half < hi);
            start..end.max(start)
        } else {
            let start = self.values.partition_point(|&v| v - half >= hi);
            let end = self.values.partition_point(|&v| v + half > lo);
            start..end.max(start)
        }
    }

    /// Length of the overlap between cell `index` and `[lo, hi]`.
    pub fn overlap(&self, index: usize, lo: f64, hi: f64) -> f64 {
        let half = self.spacing() / 2.0;
        let v = self.values[index];
        ((v + half).min(hi) - (v - half).max(lo)).max(0.0)
    }
}

/// A window of a source raster on its native axes.
///
/// `data` is row-major: one row per latitude, one column per longitude.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceGrid<T> {
    pub lats: Axis,
    pub lons: Axis,
    pub data: Vec<T>,
}

impl<T: Copy> SourceGrid<T> {
    pub fn new(lats: Axis, lons: Axis, data: Vec<T>) -> Result<Self> {
        if data.len() != lats.len() * lons.len() {
            return Err(GridProcessorError::invalid_metadata(format!(
                "grid has {} values for {} x {} axes",
                data.len(),
                lats.len(),
                lons.len()
            )));
        }
        Ok(Self { lats, lons, data })
    }

    pub fn width(&self) -> usize {
        self.lons.len()
    }

    pub fn height(&self) -> usize {
        self.lats.len()
    }

    /// Get the value at a specific grid coordinate.
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if col >= self.width() || row >= self.height() {
            return None;
        }
        self.data.get(row * self.width() + col).copied()
    }

    /// Geographic extent covered by the window's cells.
    pub fn coverage(&self) -> BoundingBox {
        let (min_lat, max_lat) = self.lats.cell_range();
        let (min_lon, max_lon) = self.lons.cell_range();
        BoundingBox::new(min_lon, min_lat, max_lon, max_lat)
    }
}

/// The regular output grid of a region.
///
/// Latitudes run north to south, longitudes west to east, both at cell
/// centres.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionalGrid {
    pub bbox: BoundingBox,
    pub resolution: f64,
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
}

impl RegionalGrid {
    /// Grid for `region` at its configured resolution.
    pub fn for_region(region: &Region) -> Result<Self> {
        Self::new(region.bbox, region.resolution)
    }

    pub fn new(bbox: BoundingBox, resolution: f64) -> Result<Self> {
        if !(resolution > 0.0 && resolution.is_finite()) {
            return Err(GridProcessorError::ConfigError(format!(
                "resolution must be positive, got {}",
                resolution
            )));
        }
        let rows = (bbox.height() / resolution).round() as usize;
        let cols = (bbox.width() / resolution).round() as usize;
        if rows == 0 || cols == 0 {
            return Err(GridProcessorError::ConfigError(format!(
                "bounding box {:?} is smaller than one {} degree cell",
                bbox, resolution
            )));
        }

        let lats = (0..rows)
            .map(|i| bbox.max_lat - (i as f64 + 0.5) * resolution)
            .collect();
        let lons = (0..cols)
            .map(|j| bbox.min_lon + (j as f64 + 0.5) * resolution)
            .collect();

        Ok(Self {
            bbox,
            resolution,
            lats,
            lons,
        })
    }

    pub fn width(&self) -> usize {
        self.lons.len()
    }

    pub fn height(&self) -> usize {
        self.lats.len()
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.width() * self.height()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height(), self.width())
    }
}

/// Interpolation method for continuous fields (Kd, radiance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMethod {
    /// Nearest neighbor (preserves exact values).
    Nearest,
    /// Bilinear interpolation (smooth, slight value changes).
    #[default]
    Bilinear,
    /// Bicubic interpolation (smoothest, more compute).
    Cubic,
    /// Overlap-weighted mean of the source cells under each target cell.
    Average,
}

impl InterpolationMethod {
    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "nearest" => Some(Self::Nearest),
            "bilinear" | "linear" => Some(Self::Bilinear),
            "cubic" | "bicubic" => Some(Self::Cubic),
            "average" | "mean" => Some(Self::Average),
            _ => None,
        }
    }
}

impl std::fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nearest => write!(f, "nearest"),
            Self::Bilinear => write!(f, "bilinear"),
            Self::Cubic => write!(f, "cubic"),
            Self::Average => write!(f, "average"),
        }
    }
}

/// Resampling method for categorical fields (landmask).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoricalMethod {
    #[default]
    Nearest,
    /// Most frequent category among the source cells under each target cell.
    Majority,
}

impl CategoricalMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "nearest" => Some(Self::Nearest),
            "majority" | "mode" => Some(Self::Majority),
            _ => None,
        }
    }
}

impl std::fmt::Display for CategoricalMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nearest => write!(f, "nearest"),
            Self::Majority => write!(f, "majority"),
        }
    }
}
