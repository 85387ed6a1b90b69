//! Reading monthly Kd (diffuse attenuation) climatology files.
//!
//! Kd files carry one or more `(time, lat, lon)` or `(lat, lon)` variables on
//! a regular geographic grid. Only the window covering the requested region
//! is read; the first time step is used when a time dimension is present.

use std::ops::Range;
use std::path::Path;

use alan_common::BoundingBox;
use tracing::debug;

use crate::error::{NetCdfError, NetCdfResult};
use crate::native::{find_variable, get_f32_attr, get_str_attr, open_existing, read_axis};

const LAT_NAMES: &[&str] = &["lat", "latitude"];
const LON_NAMES: &[&str] = &["lon", "longitude"];

/// netCDF's default fill for float variables (`NC_FILL_FLOAT`).
pub const NC_FILL_FLOAT: f32 = 9.969_209_968_386_869e36;

/// A rectangular window of a Kd file.
#[derive(Debug, Clone)]
pub struct KdSlice {
    /// Latitudes of the window rows, in file order (may be descending).
    pub lats: Vec<f64>,
    /// Longitudes of the window columns, in file order.
    pub lons: Vec<f64>,
    /// One entry per requested variable, in request order.
    pub bands: Vec<KdBand>,
}

/// One Kd variable of a window.
#[derive(Debug, Clone)]
pub struct KdBand {
    pub variable: String,
    /// Row-major `lats.len() x lons.len()` values; fill values are NaN.
    pub values: Vec<f32>,
    pub units: Option<String>,
}

impl KdSlice {
    pub fn width(&self) -> usize {
        self.lons.len()
    }

    pub fn height(&self) -> usize {
        self.lats.len()
    }

    pub fn band(&self, variable: &str) -> Option<&KdBand> {
        self.bands.iter().find(|b| b.variable == variable)
    }
}

/// Read the window of `variables` covering `window`.
///
/// `fill_override` replaces the variables' own `_FillValue` when the file's
/// attribute is absent or wrong. Without either, the library default
/// [`NC_FILL_FLOAT`] marks unwritten cells.
pub fn read_kd_window<P: AsRef<Path>>(
    path: P,
    variables: &[&str],
    window: &BoundingBox,
    fill_override: Option<f32>,
) -> NetCdfResult<KdSlice> {
    let path = path.as_ref();
    let file = open_existing(path)?;

    let lat_var = find_variable(&file, LAT_NAMES)
        .ok_or_else(|| NetCdfError::missing(format!("latitude variable in {}", path.display())))?;
    let lon_var = find_variable(&file, LON_NAMES)
        .ok_or_else(|| NetCdfError::missing(format!("longitude variable in {}", path.display())))?;
    let all_lats = read_axis(&lat_var)?;
    let all_lons = read_axis(&lon_var)?;
    let lat_dim = lat_var.dimensions()[0].name();
    let lon_dim = lon_var.dimensions()[0].name();

    let (lat_range, lon_range) = match (
        axis_window(&all_lats, window.min_lat, window.max_lat),
        axis_window(&all_lons, window.min_lon, window.max_lon),
    ) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => {
            return Err(NetCdfError::OutsideCoverage {
                window: format!("{:?}", window),
                coverage: format!(
                    "lat {:?} lon {:?}",
                    axis_extent(&all_lats),
                    axis_extent(&all_lons)
                ),
            })
        }
    };

    debug!(
        path = %path.display(),
        rows = lat_range.len(),
        cols = lon_range.len(),
        "Reading Kd window"
    );

    let mut bands = Vec::with_capacity(variables.len());
    for &name in variables {
        let var = file.variable(name).ok_or_else(|| {
            NetCdfError::missing(format!("variable '{}' in {}", name, path.display()))
        })?;

        let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        let n = dims.len();
        if n < 2 || dims[n - 2] != lat_dim || dims[n - 1] != lon_dim {
            return Err(NetCdfError::invalid_format(format!(
                "variable '{}' has dimensions {:?}, expected (..., {}, {})",
                name, dims, lat_dim, lon_dim
            )));
        }

        let raw: Vec<f32> = match n {
            2 => var.get_values::<f32, _>((lat_range.clone(), lon_range.clone())),
            3 => var.get_values::<f32, _>((0usize, lat_range.clone(), lon_range.clone())),
            _ => {
                return Err(NetCdfError::invalid_format(format!(
                    "variable '{}' has {} dimensions, expected 2 or 3",
                    name, n
                )))
            }
        }
        .map_err(|e| NetCdfError::invalid_format(format!("failed to read '{}': {}", name, e)))?;

        let fill_value = fill_override
            .or_else(|| get_f32_attr(&var, "_FillValue"))
            .unwrap_or(NC_FILL_FLOAT);
        let scale_factor = get_f32_attr(&var, "scale_factor").unwrap_or(1.0);
        let add_offset = get_f32_attr(&var, "add_offset").unwrap_or(0.0);

        let values = raw
            .into_iter()
            .map(|v| {
                // Fill is compared on the packed value
                if !v.is_finite() || v == fill_value {
                    f32::NAN
                } else {
                    v * scale_factor + add_offset
                }
            })
            .collect();

        bands.push(KdBand {
            variable: name.to_string(),
            values,
            units: get_str_attr(&var, "units"),
        });
    }

    Ok(KdSlice {
        lats: all_lats[lat_range].to_vec(),
        lons: all_lons[lon_range].to_vec(),
        bands,
    })
}

/// Contiguous index range of a monotonic axis whose values lie in `[lo, hi]`.
pub fn axis_window(axis: &[f64], lo: f64, hi: f64) -> Option<Range<usize>> {
    let first = axis.iter().position(|&v| v >= lo && v <= hi)?;
    let last = axis.iter().rposition(|&v| v >= lo && v <= hi)?;
    Some(first..last + 1)
}

fn axis_extent(axis: &[f64]) -> (f64, f64) {
    axis.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use test_utils::{write_kd_netcdf, GridSpec, KD_FILL_VALUE};

    fn spec() -> GridSpec {
        GridSpec::new(-2.0, 0.0, 10.0, 12.0, 1.0)
    }

    fn whole() -> BoundingBox {
        BoundingBox::from_snwe(-2.0, 0.0, 10.0, 12.0)
    }

    /// A `(lat, lon)` file with one variable and no `_FillValue`.
    fn write_plain(path: &Path, values: &[f32], attrs: &[(&str, f32)]) {
        let spec = spec();
        let mut file = netcdf::create(path).unwrap();
        file.add_dimension("lat", spec.height()).unwrap();
        file.add_dimension("lon", spec.width()).unwrap();
        file.add_variable::<f64>("lat", &["lat"])
            .unwrap()
            .put_values(&spec.lats(), ..)
            .unwrap();
        file.add_variable::<f64>("lon", &["lon"])
            .unwrap()
            .put_values(&spec.lons(), ..)
            .unwrap();
        let mut var = file.add_variable::<f32>("kd_490", &["lat", "lon"]).unwrap();
        for (name, value) in attrs {
            var.put_attribute(name, *value).unwrap();
        }
        var.put_values(values, ..).unwrap();
    }

    #[test]
    fn test_fill_value_cells_read_as_nan() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kd.nc");
        write_kd_netcdf(&path, &spec(), &[("kd_490", &[0.1, f32::NAN, 0.3, 0.4])], false).unwrap();

        let slice = read_kd_window(&path, &["kd_490"], &whole(), None).unwrap();
        let values = &slice.band("kd_490").unwrap().values;
        assert_eq!(values[0], 0.1);
        assert!(values[1].is_nan());
        assert_eq!(&values[2..], &[0.3, 0.4]);
        assert_eq!(slice.band("kd_490").unwrap().units.as_deref(), Some("m^-1"));
    }

    #[test]
    fn test_fill_override_replaces_attribute() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kd.nc");
        write_kd_netcdf(&path, &spec(), &[("kd_490", &[0.1, 0.2, 0.3, f32::NAN])], false).unwrap();

        let slice = read_kd_window(&path, &["kd_490"], &whole(), Some(0.2)).unwrap();
        let values = &slice.band("kd_490").unwrap().values;
        assert!(values[1].is_nan());
        // The file's own fill is no longer recognised
        assert_eq!(values[3], KD_FILL_VALUE);
    }

    #[test]
    fn test_packed_values_are_unscaled_after_fill_check() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kd.nc");
        write_plain(
            &path,
            &[100.0, 250.0, -32767.0, 0.0],
            &[("_FillValue", -32767.0), ("scale_factor", 0.001), ("add_offset", 0.01)],
        );

        let slice = read_kd_window(&path, &["kd_490"], &whole(), None).unwrap();
        let values = &slice.band("kd_490").unwrap().values;
        assert!((values[0] - 0.11).abs() < 1e-6);
        assert!((values[1] - 0.26).abs() < 1e-6);
        assert!(values[2].is_nan());
        assert!((values[3] - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_default_fill_without_attribute() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kd.nc");
        write_plain(&path, &[0.1, NC_FILL_FLOAT, 0.3, 0.4], &[]);

        let slice = read_kd_window(&path, &["kd_490"], &whole(), None).unwrap();
        let values = &slice.band("kd_490").unwrap().values;
        assert!(values[1].is_nan());
        assert_eq!(values[3], 0.4);
    }

    #[test]
    fn test_ascending_latitudes_keep_file_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kd.nc");
        // North row first in memory; stored south row first
        write_kd_netcdf(&path, &spec(), &[("kd_490", &[1.0, 2.0, 3.0, 4.0])], true).unwrap();

        let slice = read_kd_window(&path, &["kd_490"], &whole(), None).unwrap();
        assert_eq!(slice.lats, vec![-1.5, -0.5]);
        assert_eq!(slice.lons, vec![10.5, 11.5]);
        assert_eq!(slice.band("kd_490").unwrap().values, vec![3.0, 4.0, 1.0, 2.0]);
    }

    #[test]
    fn test_window_reads_subset_of_bands_and_cells() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kd.nc");
        write_kd_netcdf(
            &path,
            &spec(),
            &[("kd_blue", &[1.0, 2.0, 3.0, 4.0]), ("kd_red", &[5.0, 6.0, 7.0, 8.0])],
            false,
        )
        .unwrap();

        let window = BoundingBox::from_snwe(-1.0, 0.0, 11.0, 12.0);
        let slice = read_kd_window(&path, &["kd_red", "kd_blue"], &window, None).unwrap();
        assert_eq!((slice.height(), slice.width()), (1, 1));
        assert_eq!(slice.bands[0].variable, "kd_red");
        assert_eq!(slice.bands[0].values, vec![6.0]);
        assert_eq!(slice.bands[1].values, vec![2.0]);
    }

    #[test]
    fn test_window_outside_coverage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kd.nc");
        write_kd_netcdf(&path, &spec(), &[("kd_490", &[1.0; 4])], false).unwrap();

        let window = BoundingBox::from_snwe(30.0, 40.0, 10.0, 12.0);
        assert!(matches!(
            read_kd_window(&path, &["kd_490"], &window, None),
            Err(NetCdfError::OutsideCoverage { .. })
        ));
        assert!(matches!(
            read_kd_window(dir.path().join("absent.nc"), &["kd_490"], &whole(), None),
            Err(NetCdfError::NotFound(_))
        ));
    }

    #[test]
    fn test_axis_window_ascending() {
        let axis = [0.0, 1.0, 2.0, 3.0, 4.0];
        assert_eq!(axis_window(&axis, 0.5, 3.0), Some(1..4));
        assert_eq!(axis_window(&axis, -10.0, 10.0), Some(0..5));
        assert_eq!(axis_window(&axis, 5.0, 6.0), None);
    }

    #[test]
    fn test_axis_window_descending() {
        let axis = [4.0, 3.0, 2.0, 1.0, 0.0];
        assert_eq!(axis_window(&axis, 0.5, 3.0), Some(1..4));
    }

    #[test]
    fn test_axis_extent() {
        assert_eq!(axis_extent(&[3.0, -1.0, 2.0]), (-1.0, 3.0));
    }
}
