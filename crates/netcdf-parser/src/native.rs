//! Thin helpers over the native netcdf library.

use std::path::Path;
use std::sync::Once;

use crate::error::{NetCdfError, NetCdfResult};

/// Turn off HDF5's automatic stderr diagnostics for this process.
///
/// Probing optional attributes such as `_FillValue` otherwise prints an
/// `HDF5-DIAG` trace for every absent one. Idempotent.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: a null handler with null client data disables printing for
        // the default error stack.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Open a file read-only, distinguishing a missing path from a bad file.
pub(crate) fn open_existing(path: &Path) -> NetCdfResult<netcdf::File> {
    if !path.exists() {
        return Err(NetCdfError::NotFound(path.to_path_buf()));
    }
    silence_hdf5_errors();
    netcdf::open(path).map_err(|e| {
        NetCdfError::invalid_format(format!("failed to open {} as NetCDF: {}", path.display(), e))
    })
}

/// Attribute lookup by iteration, which never touches the HDF5 error stack.
pub(crate) fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

pub(crate) fn get_f32_attr(var: &netcdf::Variable, name: &str) -> Option<f32> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f32::try_from(attr_value).ok()
}

pub(crate) fn get_str_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

/// Find the first variable whose name matches one of `candidates`.
pub(crate) fn find_variable<'f>(
    file: &'f netcdf::File,
    candidates: &[&str],
) -> Option<netcdf::Variable<'f>> {
    candidates.iter().find_map(|name| file.variable(name))
}

/// Read a 1-D coordinate variable as f64 (netcdf converts on read).
pub(crate) fn read_axis(var: &netcdf::Variable) -> NetCdfResult<Vec<f64>> {
    if var.dimensions().len() != 1 {
        return Err(NetCdfError::invalid_format(format!(
            "coordinate variable '{}' must be one-dimensional",
            var.name()
        )));
    }
    var.get_values::<f64, _>(..).map_err(|e| {
        NetCdfError::invalid_format(format!("failed to read '{}': {}", var.name(), e))
    })
}
