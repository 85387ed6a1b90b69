//! Coastal gap filling for continuous source windows.
//!
//! Ocean colour and radiance products leave no-data along coastlines where
//! the landmask still says water. Before interpolating, each NaN cell with
//! valid neighbours in a `(2n+1) x (2n+1)` window takes their tricube-weighted
//! mean. Weights come from the unfilled input, so one pass never feeds its
//! own output, and valid cells are left untouched.

use tracing::debug;

use crate::types::SourceGrid;

/// Fill NaN cells of `grid` in place; returns the number of cells filled.
///
/// `window` is the half width `n`; 0 disables filling.
pub fn fill_gaps(grid: &mut SourceGrid<f32>, window: usize) -> usize {
    if window == 0 {
        return 0;
    }

    let width = grid.width();
    let height = grid.height();
    let original = grid.data.clone();
    let n = window as isize;
    // Every cell in the window, corners included, keeps a non-zero weight.
    let max_dist = (window as f64 + 1.0) * std::f64::consts::SQRT_2;

    let mut filled = 0;
    for row in 0..height {
        for col in 0..width {
            let idx = row * width + col;
            if !original[idx].is_nan() {
                continue;
            }

            let mut sum = 0.0f64;
            let mut weight = 0.0f64;
            for dr in -n..=n {
                let r = row as isize + dr;
                if r < 0 || r >= height as isize {
                    continue;
                }
                for dc in -n..=n {
                    let c = col as isize + dc;
                    if c < 0 || c >= width as isize {
                        continue;
                    }
                    let v = original[r as usize * width + c as usize];
                    if v.is_nan() {
                        continue;
                    }
                    let w = tricube(((dr * dr + dc * dc) as f64).sqrt() / max_dist);
                    sum += v as f64 * w;
                    weight += w;
                }
            }

            if weight > 0.0 {
                grid.data[idx] = (sum / weight) as f32;
                filled += 1;
            }
        }
    }

    debug!(filled, window, "Gap fill complete");
    filled
}

/// Tricube kernel `(1 - |u|^3)^3` on `[0, 1]`, zero beyond.
fn tricube(u: f64) -> f64 {
    if u >= 1.0 {
        return 0.0;
    }
    let t = 1.0 - u * u * u;
    t * t * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Axis;

    fn grid(width: usize, height: usize, data: Vec<f32>) -> SourceGrid<f32> {
        SourceGrid::new(
            Axis::regular(0.0, 1.0, height).unwrap(),
            Axis::regular(0.0, 1.0, width).unwrap(),
            data,
        )
        .unwrap()
    }

    #[test]
    fn test_fills_hole_with_neighbour_mean() {
        let mut data = vec![2.0f32; 9];
        data[4] = f32::NAN;
        let mut g = grid(3, 3, data);

        assert_eq!(fill_gaps(&mut g, 1), 1);
        assert!((g.data[4] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_valid_cells_untouched() {
        #[rustfmt::skip]
        let data = vec![
            1.0, f32::NAN, 3.0,
            4.0, 5.0,      6.0,
        ];
        let mut g = grid(3, 2, data.clone());
        fill_gaps(&mut g, 2);

        for (i, (&before, &after)) in data.iter().zip(&g.data).enumerate() {
            if !before.is_nan() {
                assert_eq!(before, after, "cell {} changed", i);
            }
        }
        assert!(!g.data[1].is_nan());
    }

    #[test]
    fn test_closer_neighbours_weigh_more() {
        let mut data = vec![f32::NAN; 5];
        data[1] = 10.0;
        data[4] = 0.0;
        let mut g = grid(5, 1, data);
        fill_gaps(&mut g, 3);
        // cell 2 is 1 away from 10.0 and 2 away from 0.0
        assert!(g.data[2] > 5.0);
    }

    #[test]
    fn test_isolated_gap_stays_nan() {
        let mut data = vec![f32::NAN; 25];
        data[0] = 1.0;
        let mut g = grid(5, 5, data);
        assert!(fill_gaps(&mut g, 1) > 0);
        assert!(g.data[24].is_nan());
    }

    #[test]
    fn test_zero_window_disables() {
        let mut g = grid(2, 1, vec![f32::NAN, 1.0]);
        assert_eq!(fill_gaps(&mut g, 0), 0);
        assert!(g.data[0].is_nan());
    }
}
