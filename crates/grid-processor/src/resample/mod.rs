//! Resampling source windows onto a regional grid.
//!
//! Continuous fields (Kd, radiance) and the categorical landmask take
//! different paths: continuous fields are interpolated and carry NaN as
//! no-data, categories are never blended and carry `None` where the source
//! has no coverage.

pub mod interpolation;

pub use interpolation::{bilinear_interpolate, cubic_interpolate, nearest_interpolate};

use crate::types::{CategoricalMethod, InterpolationMethod, RegionalGrid, SourceGrid};

/// Resample a continuous field onto `target`.
///
/// Returns row-major values in target order (north to south, west to east).
/// Target cells outside the source window are NaN.
pub fn resample_continuous(
    src: &SourceGrid<f32>,
    target: &RegionalGrid,
    method: InterpolationMethod,
) -> Vec<f32> {
    let kernel: fn(&SourceGrid<f32>, f64, f64) -> f32 = match method {
        InterpolationMethod::Nearest => nearest_interpolate,
        InterpolationMethod::Bilinear => bilinear_interpolate,
        InterpolationMethod::Cubic => cubic_interpolate,
        InterpolationMethod::Average => return block_average(src, target),
    };

    let cols: Vec<Option<f64>> = target
        .lons
        .iter()
        .map(|&lon| src.lons.fractional_index(lon))
        .collect();

    let mut output = Vec::with_capacity(target.len());
    for &lat in &target.lats {
        let row = src.lats.fractional_index(lat);
        for col in &cols {
            let value = match (row, col) {
                (Some(r), Some(c)) => kernel(src, r, *c),
                _ => f32::NAN,
            };
            output.push(value);
        }
    }
    output
}

/// Overlap-weighted mean of the valid source cells under each target cell.
fn block_average(src: &SourceGrid<f32>, target: &RegionalGrid) -> Vec<f32> {
    let half = target.resolution / 2.0;
    let width = src.width();

    let mut output = Vec::with_capacity(target.len());
    for &lat in &target.lats {
        let (lat_lo, lat_hi) = (lat - half, lat + half);
        let rows = src.lats.overlapping(lat_lo, lat_hi);
        for &lon in &target.lons {
            let (lon_lo, lon_hi) = (lon - half, lon + half);
            let cols = src.lons.overlapping(lon_lo, lon_hi);

            let mut sum = 0.0f64;
            let mut weight = 0.0f64;
            for r in rows.clone() {
                let wr = src.lats.overlap(r, lat_lo, lat_hi);
                for c in cols.clone() {
                    let v = src.data[r * width + c];
                    if v.is_nan() {
                        continue;
                    }
                    let w = wr * src.lons.overlap(c, lon_lo, lon_hi);
                    sum += v as f64 * w;
                    weight += w;
                }
            }
            output.push(if weight > 0.0 {
                (sum / weight) as f32
            } else {
                f32::NAN
            });
        }
    }
    output
}

/// Resample a categorical field onto `target`.
///
/// `None` marks target cells the source does not cover.
pub fn resample_categorical(
    src: &SourceGrid<i32>,
    target: &RegionalGrid,
    method: CategoricalMethod,
) -> Vec<Option<i32>> {
    match method {
        CategoricalMethod::Nearest => {
            let cols: Vec<Option<usize>> = target
                .lons
                .iter()
                .map(|&lon| src.lons.nearest_index(lon))
                .collect();
            let mut output = Vec::with_capacity(target.len());
            for &lat in &target.lats {
                let row = src.lats.nearest_index(lat);
                for col in &cols {
                    output.push(match (row, col) {
                        (Some(r), Some(c)) => src.get(r, *c),
                        _ => None,
                    });
                }
            }
            output
        }
        CategoricalMethod::Majority => majority(src, target),
    }
}

/// Category with the largest overlap under each target cell.
///
/// Ties go to the smaller category value. Target cells finer than the source
/// overlap a single source cell and take its category.
fn majority(src: &SourceGrid<i32>, target: &RegionalGrid) -> Vec<Option<i32>> {
    let half = target.resolution / 2.0;
    let width = src.width();
    let mut tally: Vec<(i32, f64)> = Vec::new();

    let mut output = Vec::with_capacity(target.len());
    for &lat in &target.lats {
        let (lat_lo, lat_hi) = (lat - half, lat + half);
        let rows = src.lats.overlapping(lat_lo, lat_hi);
        for &lon in &target.lons {
            let (lon_lo, lon_hi) = (lon - half, lon + half);
            let cols = src.lons.overlapping(lon_lo, lon_hi);

            tally.clear();
            for r in rows.clone() {
                let wr = src.lats.overlap(r, lat_lo, lat_hi);
                for c in cols.clone() {
                    let w = wr * src.lons.overlap(c, lon_lo, lon_hi);
                    if w <= 0.0 {
                        continue;
                    }
                    let category = src.data[r * width + c];
                    match tally.iter_mut().find(|(k, _)| *k == category) {
                        Some((_, total)) => *total += w,
                        None => tally.push((category, w)),
                    }
                }
            }

            let winner = tally
                .iter()
                .max_by(|a, b| a.1.total_cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
                .map(|(k, _)| *k);
            output.push(winner);
        }
    }
    output
}
