//! Critical depth from surface irradiance and diffuse attenuation.
//!
//! Light decays with depth as `I(d) = I0 * exp(-Kd * d)`, so the depth at
//! which it falls to the threshold `T` is
//!
//! ```text
//! d* = ln(I0 / T) / Kd
//! ```
//!
//! When the Kd climatology carries several spectral bands, the surface
//! radiance is first converted into per-band irradiance `E_b` and the bands are
//! combined into a total irradiance and an effective attenuation over the first
//! metre:
//!
//! ```text
//! I0     = sum_b E_b
//! Kd_eff = -ln( sum_b (E_b / I0) * exp(-Kd_b) )
//! ```

use tracing::debug;

use crate::config::{AttenuationConfig, BandConfig};
use crate::depth::{DepthCell, DepthField};
use crate::error::{AlanError, Result};

/// Per-cell inputs to the depth model, in f64.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedInputs {
    /// Surface irradiance I0; NaN is no-data.
    pub irradiance: Vec<f64>,
    /// Effective attenuation Kd; NaN is no-data.
    pub kd: Vec<f64>,
}

/// Closed-form critical depth model with a fixed threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttenuationModel {
    threshold: f64,
}

impl AttenuationModel {
    pub fn new(threshold: f64) -> Result<Self> {
        if !(threshold > 0.0 && threshold.is_finite()) {
            return Err(AlanError::config(format!(
                "threshold must be a positive number, got {}",
                threshold
            )));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Outcome for one cell.
    ///
    /// Checks run in order: no-data, non-positive Kd, irradiance at or below
    /// the threshold, then the closed form. A depth beyond the f32 range is
    /// undefined.
    pub fn cell(&self, irradiance: f64, kd: f64) -> DepthCell {
        if irradiance.is_nan() || kd.is_nan() {
            return DepthCell::Undefined;
        }
        if kd <= 0.0 {
            return DepthCell::Undefined;
        }
        if irradiance <= self.threshold {
            return DepthCell::ZeroDepth;
        }
        let depth = ((irradiance / self.threshold).ln() / kd).max(0.0);
        if !depth.is_finite() || depth > f32::MAX as f64 {
            return DepthCell::Undefined;
        }
        DepthCell::Depth(depth as f32)
    }

    /// Evaluate every cell of a `rows x cols` grid.
    pub fn compute(&self, rows: usize, cols: usize, inputs: &PreparedInputs) -> Result<DepthField> {
        for (name, len) in [("irradiance", inputs.irradiance.len()), ("kd", inputs.kd.len())] {
            if len != rows * cols {
                return Err(AlanError::ShapeMismatch {
                    context: format!("attenuation {}", name),
                    expected: (rows, cols),
                    actual: (len / cols.max(1), cols),
                });
            }
        }

        let cells = inputs
            .irradiance
            .iter()
            .zip(&inputs.kd)
            .map(|(&i0, &kd)| self.cell(i0, kd))
            .collect();

        DepthField::new(rows, cols, cells).ok_or_else(|| AlanError::ShapeMismatch {
            context: "depth field".to_string(),
            expected: (rows, cols),
            actual: (inputs.kd.len() / cols.max(1), cols),
        })
    }
}

/// Combine radiance and per-band Kd into irradiance and effective Kd.
///
/// `kd_bands` holds one field per entry of `config.bands`, in the same order,
/// each the length of `radiance`.
pub fn prepare_inputs(
    config: &AttenuationConfig,
    radiance: &[f32],
    kd_bands: &[Vec<f32>],
) -> Result<PreparedInputs> {
    if kd_bands.len() != config.bands.len() {
        return Err(AlanError::config(format!(
            "{} Kd bands configured but {} provided",
            config.bands.len(),
            kd_bands.len()
        )));
    }
    let n = radiance.len();
    if let Some((band, field)) = config
        .bands
        .iter()
        .zip(kd_bands)
        .find(|(_, field)| field.len() != n)
    {
        return Err(AlanError::ShapeMismatch {
            context: format!("Kd band '{}'", band.variable),
            expected: (n, 1),
            actual: (field.len(), 1),
        });
    }

    let mut irradiance = Vec::with_capacity(n);
    let mut kd = Vec::with_capacity(n);
    let mut per_band = vec![(0.0f64, 0.0f64); config.bands.len()];

    for i in 0..n {
        let r = radiance[i] as f64;
        if r.is_nan() || config.radiance_floor.is_some_and(|floor| r <= floor) {
            irradiance.push(f64::NAN);
            kd.push(f64::NAN);
            continue;
        }

        for (slot, (band, field)) in per_band.iter_mut().zip(config.bands.iter().zip(kd_bands)) {
            *slot = (band_irradiance(band, r), field[i] as f64);
        }
        let (i0, k) = combine(&per_band);
        irradiance.push(i0);
        kd.push(k);
    }

    debug!(
        cells = n,
        bands = config.bands.len(),
        no_data = irradiance.iter().filter(|v| v.is_nan()).count(),
        "Prepared attenuation inputs"
    );
    Ok(PreparedInputs { irradiance, kd })
}

fn band_irradiance(band: &BandConfig, radiance: f64) -> f64 {
    band.slope * radiance + band.offset
}

/// Total irradiance and effective Kd from `(E_b, Kd_b)` pairs.
fn combine(bands: &[(f64, f64)]) -> (f64, f64) {
    if let [(e, k)] = bands {
        return (*e, *k);
    }
    let total: f64 = bands.iter().map(|(e, _)| e).sum();
    if bands.iter().any(|(e, k)| e.is_nan() || k.is_nan()) || total == 0.0 {
        return (total, f64::NAN);
    }

    let transmitted: f64 = bands.iter().map(|(e, k)| (e / total) * (-k).exp()).sum();
    let kd = if transmitted > 0.0 && transmitted.is_finite() {
        -transmitted.ln()
    } else {
        f64::NAN
    };
    (total, kd)
}
