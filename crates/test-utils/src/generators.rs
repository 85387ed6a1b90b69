//! Synthetic grid definitions and field generators.
//!
//! All generated fields are row-major with the northernmost row first, the
//! same order the regional grid and GeoTIFF rasters use.

/// A regular, cell-centred geographic grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
    /// Cell size in degrees.
    pub resolution: f64,
}

impl GridSpec {
    pub fn new(south: f64, north: f64, west: f64, east: f64, resolution: f64) -> Self {
        Self {
            south,
            north,
            west,
            east,
            resolution,
        }
    }

    pub fn width(&self) -> usize {
        ((self.east - self.west) / self.resolution).round() as usize
    }

    pub fn height(&self) -> usize {
        ((self.north - self.south) / self.resolution).round() as usize
    }

    pub fn len(&self) -> usize {
        self.width() * self.height()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell-centre latitudes, north first.
    pub fn lats(&self) -> Vec<f64> {
        (0..self.height())
            .map(|i| self.north - (i as f64 + 0.5) * self.resolution)
            .collect()
    }

    /// Cell-centre longitudes, west first.
    pub fn lons(&self) -> Vec<f64> {
        (0..self.width())
            .map(|j| self.west + (j as f64 + 0.5) * self.resolution)
            .collect()
    }

    /// Row and column of the cell containing `(lat, lon)`, if inside.
    pub fn cell_of(&self, lat: f64, lon: f64) -> Option<(usize, usize)> {
        if lat <= self.south || lat > self.north || lon < self.west || lon >= self.east {
            return None;
        }
        let row = ((self.north - lat) / self.resolution).floor() as usize;
        let col = ((lon - self.west) / self.resolution).floor() as usize;
        Some((row.min(self.height() - 1), col.min(self.width() - 1)))
    }
}

/// Evaluate `f(lat, lon)` at every cell centre of `spec`.
pub fn field_from_fn<T, F>(spec: &GridSpec, f: F) -> Vec<T>
where
    F: Fn(f64, f64) -> T,
{
    let lons = spec.lons();
    let mut data = Vec::with_capacity(spec.len());
    for lat in spec.lats() {
        for &lon in &lons {
            data.push(f(lat, lon));
        }
    }
    data
}

/// A field with the same value everywhere.
pub fn constant_field(spec: &GridSpec, value: f32) -> Vec<f32> {
    vec![value; spec.len()]
}

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`, so a value read
/// back identifies the cell it came from.
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0); // col=1, row=0
/// assert_eq!(grid[10], 1.0);   // col=0, row=1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}
