//! Point interpolation kernels over a source grid.
//!
//! Positions are fractional `(row, col)` indices into the grid, as produced
//! by [`Axis::fractional_index`](crate::types::Axis::fractional_index).
//! Every kernel returns NaN when the position falls outside the grid.

use crate::types::SourceGrid;

/// Nearest neighbor interpolation.
///
/// Returns the value of the nearest grid point.
pub fn nearest_interpolate(grid: &SourceGrid<f32>, row: f64, col: f64) -> f32 {
    let r = row.round();
    let c = col.round();
    if r < 0.0 || c < 0.0 {
        return f32::NAN;
    }
    grid.get(r as usize, c as usize).unwrap_or(f32::NAN)
}

/// Bilinear interpolation.
///
/// Smoothly interpolates between the four nearest grid points. Any NaN
/// corner with non-zero weight makes the result NaN.
pub fn bilinear_interpolate(grid: &SourceGrid<f32>, row: f64, col: f64) -> f32 {
    let (width, height) = (grid.width(), grid.height());
    if row < 0.0 || col < 0.0 || row > (height - 1) as f64 || col > (width - 1) as f64 {
        return f32::NAN;
    }

    let r0 = row.floor() as usize;
    let c0 = col.floor() as usize;
    let r1 = (r0 + 1).min(height - 1);
    let c1 = (c0 + 1).min(width - 1);
    let fr = row - r0 as f64;
    let fc = col - c0 as f64;

    let corners = [
        (r0, c0, (1.0 - fr) * (1.0 - fc)),
        (r0, c1, (1.0 - fr) * fc),
        (r1, c0, fr * (1.0 - fc)),
        (r1, c1, fr * fc),
    ];

    let mut sum = 0.0f64;
    for (r, c, w) in corners {
        if w == 0.0 {
            continue;
        }
        let v = grid.data[r * width + c];
        if v.is_nan() {
            return f32::NAN;
        }
        sum += v as f64 * w;
    }
    sum as f32
}

/// Bicubic interpolation.
///
/// Uses the 16 surrounding points (Catmull-Rom). Falls back to bilinear when
/// any of them is NaN.
pub fn cubic_interpolate(grid: &SourceGrid<f32>, row: f64, col: f64) -> f32 {
    let (width, height) = (grid.width() as i64, grid.height() as i64);
    if row < 0.0 || col < 0.0 || row > (height - 1) as f64 || col > (width - 1) as f64 {
        return f32::NAN;
    }

    let ri = row.floor() as i64;
    let ci = col.floor() as i64;
    let fr = row - ri as f64;
    let fc = col - ci as f64;

    let mut row_values = [0.0f64; 4];
    for (j, slot) in row_values.iter_mut().enumerate() {
        let r = (ri + j as i64 - 1).clamp(0, height - 1) as usize;
        let mut p = [0.0f64; 4];
        for (i, value) in p.iter_mut().enumerate() {
            let c = (ci + i as i64 - 1).clamp(0, width - 1) as usize;
            let v = grid.data[r * width as usize + c];
            if v.is_nan() {
                return bilinear_interpolate(grid, row, col);
            }
            *value = v as f64;
        }
        *slot = catmull_rom(p, fc);
    }

    catmull_rom(row_values, fr) as f32
}

/// 1D cubic interpolation using Catmull-Rom spline.
fn catmull_rom(p: [f64; 4], t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;

    let a = -0.5 * p[0] + 1.5 * p[1] - 1.5 * p[2] + 0.5 * p[3];
    let b = p[0] - 2.5 * p[1] + 2.0 * p[2] - 0.5 * p[3];
    let c = -0.5 * p[0] + 0.5 * p[2];
    let d = p[1];

    a * t3 + b * t2 + c * t + d
}
