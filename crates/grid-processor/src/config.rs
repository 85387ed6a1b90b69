//! Resampling configuration.

use serde::{Deserialize, Serialize};

use crate::types::{CategoricalMethod, InterpolationMethod};

/// Default read buffer around a region, in degrees.
pub const DEFAULT_BUFFER_DEG: f64 = 1.0;

/// Default gap-fill half window, in cells.
pub const DEFAULT_GAP_FILL_WINDOW: usize = 3;

/// How each source is brought onto a regional grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    /// Interpolation for Kd fields.
    pub kd: InterpolationMethod,

    /// Interpolation for the surface radiance field.
    pub radiance: InterpolationMethod,

    /// Resampling for the categorical landmask.
    pub landmask: CategoricalMethod,

    /// Half width `n` of the `(2n+1) x (2n+1)` gap-fill window; 0 disables.
    pub gap_fill_window: usize,

    /// Extra margin read around the region before resampling, in degrees.
    pub buffer_deg: f64,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            kd: InterpolationMethod::Bilinear,
            radiance: InterpolationMethod::Bilinear,
            landmask: CategoricalMethod::Nearest,
            gap_fill_window: DEFAULT_GAP_FILL_WINDOW,
            buffer_deg: DEFAULT_BUFFER_DEG,
        }
    }
}

impl ResampleConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.buffer_deg >= 0.0 && self.buffer_deg.is_finite()) {
            return Err(format!(
                "buffer_deg must be a non-negative number, got {}",
                self.buffer_deg
            ));
        }

        if self.gap_fill_window > 50 {
            return Err(format!(
                "gap_fill_window must be at most 50 cells, got {}",
                self.gap_fill_window
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResampleConfig::default();
        assert_eq!(config.kd, InterpolationMethod::Bilinear);
        assert_eq!(config.landmask, CategoricalMethod::Nearest);
        assert_eq!(config.gap_fill_window, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_negative_buffer() {
        let config = ResampleConfig {
            buffer_deg: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
