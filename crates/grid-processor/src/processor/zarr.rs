//! Zarr landmask store.
//!
//! The landmask is a directory store holding a 2-D categorical array
//! `[lat, lon]` plus 1-D `lat` and `lon` coordinate arrays. Only the chunks
//! covering a window are decompressed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use alan_common::BoundingBox;
use tracing::debug;
use zarrs::array::{Array, ArrayError, DataType};
use zarrs::array_subset::ArraySubset;
use zarrs_filesystem::FilesystemStore;

use super::WindowSource;
use crate::error::{GridProcessorError, Result};
use crate::types::{Axis, SourceGrid};

const LAT_NAMES: &[&str] = &["lat", "latitude"];
const LON_NAMES: &[&str] = &["lon", "longitude"];

/// A categorical landmask opened from a Zarr directory store.
#[derive(Debug)]
pub struct ZarrLandmask {
    path: PathBuf,
    variable: String,
    array: Array<FilesystemStore>,
    lats: Axis,
    lons: Axis,
}

impl ZarrLandmask {
    /// Open the store at `path` and its `variable` array.
    pub fn open<P: AsRef<Path>>(path: P, variable: &str) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GridProcessorError::not_found(path.display().to_string()));
        }
        let store = Arc::new(
            FilesystemStore::new(path)
                .map_err(|e| GridProcessorError::open_failed(format!("{}: {}", path.display(), e)))?,
        );

        let array = Array::open(store.clone(), &format!("/{}", variable)).map_err(|e| {
            GridProcessorError::zarr_error(format!(
                "cannot open array '{}' in {}: {}",
                variable,
                path.display(),
                e
            ))
        })?;
        let lats = Axis::new(read_coordinate(&store, LAT_NAMES, path)?)?;
        let lons = Axis::new(read_coordinate(&store, LON_NAMES, path)?)?;

        let shape = array.shape();
        if shape.len() != 2 || shape[0] != lats.len() as u64 || shape[1] != lons.len() as u64 {
            return Err(GridProcessorError::invalid_metadata(format!(
                "array '{}' has shape {:?}, expected [{}, {}] from its coordinates",
                variable,
                shape,
                lats.len(),
                lons.len()
            )));
        }

        debug!(
            path = %path.display(),
            variable,
            rows = lats.len(),
            cols = lons.len(),
            data_type = ?array.data_type(),
            "Opened Zarr landmask"
        );

        Ok(Self {
            path: path.to_path_buf(),
            variable: variable.to_string(),
            array,
            lats,
            lons,
        })
    }

    pub fn lats(&self) -> &Axis {
        &self.lats
    }

    pub fn lons(&self) -> &Axis {
        &self.lons
    }

    fn retrieve(&self, subset: &ArraySubset) -> Result<Vec<i32>> {
        let array = &self.array;
        let values = match array.data_type() {
            DataType::UInt8 => widen(array.retrieve_array_subset_elements::<u8>(subset)),
            DataType::Int8 => widen(array.retrieve_array_subset_elements::<i8>(subset)),
            DataType::UInt16 => widen(array.retrieve_array_subset_elements::<u16>(subset)),
            DataType::Int16 => widen(array.retrieve_array_subset_elements::<i16>(subset)),
            DataType::Int32 => array.retrieve_array_subset_elements::<i32>(subset),
            other => {
                return Err(GridProcessorError::invalid_metadata(format!(
                    "landmask '{}' has unsupported data type {:?}",
                    self.variable, other
                )))
            }
        };
        values.map_err(|e| GridProcessorError::read_failed(format!("{}: {}", self.path.display(), e)))
    }
}

impl WindowSource<i32> for ZarrLandmask {
    fn read_window(&self, bbox: &BoundingBox) -> Result<SourceGrid<i32>> {
        let rows = self.lats.overlapping(bbox.min_lat, bbox.max_lat);
        let cols = self.lons.overlapping(bbox.min_lon, bbox.max_lon);
        if rows.is_empty() || cols.is_empty() {
            return Err(GridProcessorError::out_of_bounds(
                format!("{:?}", bbox),
                format!("{:?}", self.coverage()),
            ));
        }

        // Zarr uses [row, col] indexing
        let subset = ArraySubset::new_with_start_shape(
            vec![rows.start as u64, cols.start as u64],
            vec![rows.len() as u64, cols.len() as u64],
        )
        .map_err(|e| GridProcessorError::read_failed(e.to_string()))?;
        let data = self.retrieve(&subset)?;

        debug!(
            path = %self.path.display(),
            rows = rows.len(),
            cols = cols.len(),
            "Read landmask window"
        );

        SourceGrid::new(
            Axis::new(self.lats.values()[rows].to_vec())?,
            Axis::new(self.lons.values()[cols].to_vec())?,
            data,
        )
    }

    fn coverage(&self) -> BoundingBox {
        let (min_lat, max_lat) = self.lats.cell_range();
        let (min_lon, max_lon) = self.lons.cell_range();
        BoundingBox::new(min_lon, min_lat, max_lon, max_lat)
    }

    fn location(&self) -> String {
        format!("{}/{}", self.path.display(), self.variable)
    }
}

fn widen<T: Into<i32>>(
    values: std::result::Result<Vec<T>, ArrayError>,
) -> std::result::Result<Vec<i32>, ArrayError> {
    values.map(|v| v.into_iter().map(Into::into).collect())
}

/// Read the first coordinate array found among `names` as f64.
fn read_coordinate(store: &Arc<FilesystemStore>, names: &[&str], path: &Path) -> Result<Vec<f64>> {
    let array = names
        .iter()
        .find_map(|name| Array::open(store.clone(), &format!("/{}", name)).ok())
        .ok_or_else(|| {
            GridProcessorError::invalid_metadata(format!(
                "{} has none of the coordinate arrays {:?}",
                path.display(),
                names
            ))
        })?;

    let shape = array.shape().to_vec();
    if shape.len() != 1 {
        return Err(GridProcessorError::invalid_metadata(format!(
            "coordinate array in {} must be one-dimensional, got shape {:?}",
            path.display(),
            shape
        )));
    }
    let subset = ArraySubset::new_with_shape(shape);
    let read_err = |e: ArrayError| GridProcessorError::read_failed(e.to_string());

    match array.data_type() {
        DataType::Float64 => array
            .retrieve_array_subset_elements::<f64>(&subset)
            .map_err(read_err),
        DataType::Float32 => Ok(array
            .retrieve_array_subset_elements::<f32>(&subset)
            .map_err(read_err)?
            .into_iter()
            .map(f64::from)
            .collect()),
        other => Err(GridProcessorError::invalid_metadata(format!(
            "coordinate array in {} has unsupported data type {:?}",
            path.display(),
            other
        ))),
    }
}
