//! Land/water classification and masking of depth fields.

use tracing::debug;

use crate::depth::{DepthCell, DepthField};
use crate::error::{AlanError, Result};

/// Landmask state of one regional grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LandClass {
    Water,
    Land,
    /// The landmask does not cover the cell.
    Unknown,
}

impl LandClass {
    /// Classify a resampled landmask category.
    pub fn from_category(category: Option<i32>, water_value: i32) -> Self {
        match category {
            Some(v) if v == water_value => Self::Water,
            Some(_) => Self::Land,
            None => Self::Unknown,
        }
    }
}

/// Applies a landmask to depth fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct LandMasker;

impl LandMasker {
    pub fn new() -> Self {
        Self
    }

    /// Mark land cells as [`DepthCell::Land`] and uncovered cells as
    /// [`DepthCell::Undefined`]; water cells keep their outcome.
    pub fn apply(&self, mut depth: DepthField, landmask: &[LandClass]) -> Result<DepthField> {
        let (rows, cols) = depth.shape();
        if landmask.len() != rows * cols {
            return Err(AlanError::ShapeMismatch {
                context: "landmask".to_string(),
                expected: (rows, cols),
                actual: (landmask.len() / cols.max(1), cols),
            });
        }

        let mut land = 0usize;
        let mut unknown = 0usize;
        for (cell, class) in depth.cells_mut().iter_mut().zip(landmask) {
            match class {
                LandClass::Water => {}
                LandClass::Land => {
                    *cell = DepthCell::Land;
                    land += 1;
                }
                LandClass::Unknown => {
                    *cell = DepthCell::Undefined;
                    unknown += 1;
                }
            }
        }

        debug!(land, unknown, "Applied landmask");
        Ok(depth)
    }
}
