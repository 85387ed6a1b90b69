//! Writers for synthetic source files.
//!
//! Each writer produces the smallest file its reader accepts: a Kd NetCDF
//! climatology, a georeferenced single-band GeoTIFF and a Zarr landmask store.
//! [`SourceFixture`] ties them together in one temporary directory.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use zarrs::array::{ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs_filesystem::FilesystemStore;

use crate::generators::GridSpec;

pub type FixtureResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Fill value written into synthetic Kd files.
pub const KD_FILL_VALUE: f32 = -32767.0;

/// Kd filename pattern used by [`SourceFixture`].
pub const KD_PATTERN: &str = "kd_{month}.nc";

/// Category value marking water in synthetic landmasks.
pub const WATER: u8 = 255;

/// Category value marking land in synthetic landmasks.
pub const LAND: u8 = 1;

/// Write a Kd climatology file with `(time, lat, lon)` band variables.
///
/// NaN values in `bands` are written as [`KD_FILL_VALUE`]. With
/// `lat_ascending` the latitude axis (and the data rows) run south to north.
pub fn write_kd_netcdf(
    path: &Path,
    spec: &GridSpec,
    bands: &[(&str, &[f32])],
    lat_ascending: bool,
) -> FixtureResult<()> {
    let (width, height) = (spec.width(), spec.height());
    let mut lats = spec.lats();
    if lat_ascending {
        lats.reverse();
    }

    let mut file = netcdf::create(path)?;
    file.add_dimension("time", 1)?;
    file.add_dimension("lat", height)?;
    file.add_dimension("lon", width)?;

    let mut lat = file.add_variable::<f64>("lat", &["lat"])?;
    lat.put_attribute("units", "degrees_north")?;
    lat.put_values(&lats, ..)?;
    let mut lon = file.add_variable::<f64>("lon", &["lon"])?;
    lon.put_attribute("units", "degrees_east")?;
    lon.put_values(&spec.lons(), ..)?;

    for (name, values) in bands {
        if values.len() != width * height {
            return Err(format!("band {} has {} values, grid has {}", name, values.len(), width * height).into());
        }
        let mut rows: Vec<&[f32]> = values.chunks(width).collect();
        if lat_ascending {
            rows.reverse();
        }
        let data: Vec<f32> = rows
            .concat()
            .into_iter()
            .map(|v| if v.is_nan() { KD_FILL_VALUE } else { v })
            .collect();

        let mut var = file.add_variable::<f32>(name, &["time", "lat", "lon"])?;
        var.set_fill_value(KD_FILL_VALUE)?;
        var.put_attribute("units", "m^-1")?;
        var.put_values(&data, ..)?;
    }
    Ok(())
}

/// Write a single-band float GeoTIFF covering `spec`, north row first.
///
/// `rows_per_strip` controls the strip layout so windowed reads cross strip
/// boundaries.
pub fn write_radiance_geotiff(
    path: &Path,
    spec: &GridSpec,
    data: &[f32],
    nodata: Option<f32>,
    rows_per_strip: u32,
) -> FixtureResult<()> {
    let (width, height) = (spec.width() as u32, spec.height() as u32);
    if data.len() != spec.len() {
        return Err(format!("raster has {} values, grid has {}", data.len(), spec.len()).into());
    }

    let mut tiff = TiffEncoder::new(BufWriter::new(File::create(path)?))?;
    let mut image = tiff.new_image::<colortype::Gray32Float>(width, height)?;
    image
        .encoder()
        .write_tag(Tag::Unknown(33550), &[spec.resolution, spec.resolution, 0.0][..])?;
    image.encoder().write_tag(
        Tag::Unknown(33922),
        &[0.0, 0.0, 0.0, spec.west, spec.north, 0.0][..],
    )?;
    if let Some(nodata) = nodata {
        image
            .encoder()
            .write_tag(Tag::Unknown(42113), nodata.to_string().as_str())?;
    }
    image.rows_per_strip(rows_per_strip)?;
    image.write_data(data)?;
    Ok(())
}

/// Write a Zarr landmask store with `landmask`, `lat` and `lon` arrays.
pub fn write_landmask_zarr(
    path: &Path,
    spec: &GridSpec,
    data: &[u8],
    chunk_size: u64,
) -> FixtureResult<()> {
    let (width, height) = (spec.width() as u64, spec.height() as u64);
    if data.len() != spec.len() {
        return Err(format!("landmask has {} values, grid has {}", data.len(), spec.len()).into());
    }

    std::fs::create_dir_all(path)?;
    let store = Arc::new(FilesystemStore::new(path)?);

    let mask = ArrayBuilder::new(
        vec![height, width],
        DataType::UInt8,
        vec![chunk_size, chunk_size].try_into()?,
        FillValue::from(0u8),
    )
    .build(store.clone(), "/landmask")?;
    mask.store_metadata()?;
    let subset = ArraySubset::new_with_start_shape(vec![0, 0], vec![height, width])?;
    mask.store_array_subset_elements(&subset, data)?;

    for (name, values) in [("/lat", spec.lats()), ("/lon", spec.lons())] {
        let n = values.len() as u64;
        let axis = ArrayBuilder::new(
            vec![n],
            DataType::Float64,
            vec![n].try_into()?,
            FillValue::from(f64::NAN),
        )
        .build(store.clone(), name)?;
        axis.store_metadata()?;
        axis.store_array_subset_elements(&ArraySubset::new_with_shape(vec![n]), values.as_slice())?;
    }
    Ok(())
}

/// A temporary directory holding one set of synthetic sources.
///
/// Paths follow the layout the pipeline configuration expects: a Kd directory
/// with one file per month named by [`KD_PATTERN`], one radiance GeoTIFF, one
/// landmask store and an empty output directory.
pub struct SourceFixture {
    _dir: TempDir,
    pub kd_dir: PathBuf,
    pub radiance_path: PathBuf,
    pub landmask_path: PathBuf,
    pub output_dir: PathBuf,
}

impl SourceFixture {
    pub fn new() -> FixtureResult<Self> {
        let dir = TempDir::new()?;
        let kd_dir = dir.path().join("kd");
        let output_dir = dir.path().join("out");
        std::fs::create_dir_all(&kd_dir)?;
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self {
            radiance_path: dir.path().join("radiance.tif"),
            landmask_path: dir.path().join("landmask.zarr"),
            kd_dir,
            output_dir,
            _dir: dir,
        })
    }

    /// Root of the temporary directory.
    pub fn root(&self) -> &Path {
        self._dir.path()
    }

    /// Path of the Kd file for a two-digit month.
    pub fn kd_path(&self, month: &str) -> PathBuf {
        self.kd_dir.join(KD_PATTERN.replace("{month}", month))
    }

    pub fn write_kd(&self, month: &str, spec: &GridSpec, bands: &[(&str, &[f32])]) -> FixtureResult<PathBuf> {
        let path = self.kd_path(month);
        write_kd_netcdf(&path, spec, bands, false)?;
        Ok(path)
    }

    pub fn write_radiance(&self, spec: &GridSpec, data: &[f32], nodata: Option<f32>) -> FixtureResult<()> {
        write_radiance_geotiff(&self.radiance_path, spec, data, nodata, 2)
    }

    pub fn write_landmask(&self, spec: &GridSpec, data: &[u8]) -> FixtureResult<()> {
        write_landmask_zarr(&self.landmask_path, spec, data, 4)
    }
}
