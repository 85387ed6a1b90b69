//! Per-cell critical depth outcomes.

/// Outcome of the critical depth computation for one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DepthCell {
    /// Depth in metres at which ALAN falls to the threshold; always >= 0.
    Depth(f32),
    /// Surface light is already at or below the threshold.
    ZeroDepth,
    /// No-data input or non-physical attenuation.
    Undefined,
    /// Cell is land according to the landmask.
    Land,
}

impl DepthCell {
    /// Class code written to `z_thresh_class`.
    pub fn class_code(&self) -> u8 {
        match self {
            Self::Depth(_) => 0,
            Self::ZeroDepth => 1,
            Self::Undefined => 2,
            Self::Land => 3,
        }
    }

    /// Encode as a float with the given sentinels for undefined and land cells.
    pub fn encode(&self, fill_value: f32, land_value: f32) -> f32 {
        match *self {
            Self::Depth(d) => d,
            Self::ZeroDepth => 0.0,
            Self::Undefined => fill_value,
            Self::Land => land_value,
        }
    }
}

/// CF `flag_meanings` matching [`DepthCell::class_code`].
pub const CLASS_FLAG_MEANINGS: &str = "depth zero_depth undefined land";

/// CF `flag_values` matching [`DepthCell::class_code`].
pub const CLASS_FLAG_VALUES: [u8; 4] = [0, 1, 2, 3];

/// A regional grid of depth outcomes, row-major with the northern row first.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthField {
    rows: usize,
    cols: usize,
    cells: Vec<DepthCell>,
}

/// Cell counts per outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DepthSummary {
    pub depth: usize,
    pub zero_depth: usize,
    pub undefined: usize,
    pub land: usize,
}

impl DepthField {
    /// Wrap `cells`; returns `None` when the count does not fit the shape.
    pub fn new(rows: usize, cols: usize, cells: Vec<DepthCell>) -> Option<Self> {
        (cells.len() == rows * cols).then_some(Self { rows, cols, cells })
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn cells(&self) -> &[DepthCell] {
        &self.cells
    }

    pub fn get(&self, row: usize, col: usize) -> Option<DepthCell> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells.get(row * self.cols + col).copied()
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [DepthCell] {
        &mut self.cells
    }

    pub fn summary(&self) -> DepthSummary {
        let mut summary = DepthSummary::default();
        for cell in &self.cells {
            match cell {
                DepthCell::Depth(_) => summary.depth += 1,
                DepthCell::ZeroDepth => summary.zero_depth += 1,
                DepthCell::Undefined => summary.undefined += 1,
                DepthCell::Land => summary.land += 1,
            }
        }
        summary
    }

    /// Float encoding of every cell.
    pub fn encode(&self, fill_value: f32, land_value: f32) -> Vec<f32> {
        self.cells
            .iter()
            .map(|c| c.encode(fill_value, land_value))
            .collect()
    }

    pub fn class_codes(&self) -> Vec<u8> {
        self.cells.iter().map(DepthCell::class_code).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding() {
        assert_eq!(DepthCell::Depth(4.5).encode(-999.0, -998.0), 4.5);
        assert_eq!(DepthCell::ZeroDepth.encode(-999.0, -998.0), 0.0);
        assert_eq!(DepthCell::Undefined.encode(-999.0, -998.0), -999.0);
        assert_eq!(DepthCell::Land.encode(-999.0, -998.0), -998.0);
    }

    #[test]
    fn test_zero_depth_and_zero_metres_differ_by_class() {
        assert_eq!(DepthCell::Depth(0.0).class_code(), 0);
        assert_eq!(DepthCell::ZeroDepth.class_code(), 1);
    }

    #[test]
    fn test_field_shape_checked() {
        assert!(DepthField::new(2, 2, vec![DepthCell::Undefined; 3]).is_none());

        let field = DepthField::new(
            1,
            3,
            vec![DepthCell::Depth(1.0), DepthCell::Land, DepthCell::Land],
        )
        .unwrap();
        assert_eq!(field.shape(), (1, 3));
        assert_eq!(field.get(0, 1), Some(DepthCell::Land));
        assert_eq!(field.get(1, 0), None);
        assert_eq!(
            field.summary(),
            DepthSummary {
                depth: 1,
                land: 2,
                ..Default::default()
            }
        );
        assert_eq!(field.class_codes(), vec![0, 3, 3]);
    }
}
