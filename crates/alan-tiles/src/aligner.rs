//! Bringing every source onto a region's grid.
//!
//! Each source is read as a window around the region (its bounding box plus
//! a buffer), cleaned of no-data, optionally gap filled and resampled onto the
//! [`RegionalGrid`]. The radiance raster and landmask do not change between
//! months, so they are aligned separately from the monthly Kd fields and can
//! be reused across a region's months.

use std::path::Path;

use alan_common::{BoundingBox, Month, Region};
use grid_processor::{
    fill_gaps, resample_categorical, resample_continuous, Axis, GeoTiffRaster,
    InterpolationMethod, RegionalGrid, ResampleConfig, SourceGrid, WindowSource, ZarrLandmask,
};
use netcdf_parser::read_kd_window;
use tracing::debug;

use crate::config::{InputPaths, LandmaskConfig, PipelineConfig};
use crate::error::{AlanError, Result};
use crate::landmask::LandClass;

/// Month-independent fields of one region.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticFields {
    pub grid: RegionalGrid,
    /// Surface radiance; NaN is no-data.
    pub radiance: Vec<f32>,
    pub landmask: Vec<LandClass>,
}

/// Every input of one (region, month) on the regional grid.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedFields {
    pub grid: RegionalGrid,
    /// One field per configured band, in configuration order; NaN is no-data.
    pub kd: Vec<Vec<f32>>,
    pub radiance: Vec<f32>,
    pub landmask: Vec<LandClass>,
}

/// Reads source windows and resamples them onto regional grids.
#[derive(Debug, Clone)]
pub struct GridAligner {
    resample: ResampleConfig,
    landmask: LandmaskConfig,
    bands: Vec<String>,
}

impl GridAligner {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            resample: config.resample.clone(),
            landmask: config.landmask.clone(),
            bands: config
                .attenuation
                .bands
                .iter()
                .map(|b| b.variable.clone())
                .collect(),
        }
    }

    /// Align all sources for one (region, month).
    pub fn align(&self, region: &Region, month: Month, inputs: &InputPaths) -> Result<AlignedFields> {
        let statics = self.align_static(region, inputs)?;
        let kd = self.align_kd(region, &statics.grid, &inputs.kd_path(month), inputs.kd_fill_value)?;
        Ok(AlignedFields {
            grid: statics.grid,
            kd,
            radiance: statics.radiance,
            landmask: statics.landmask,
        })
    }

    /// Build the region grid and align the radiance raster and landmask.
    pub fn align_static(&self, region: &Region, inputs: &InputPaths) -> Result<StaticFields> {
        let grid = RegionalGrid::for_region(region).map_err(|e| {
            AlanError::config(format!("cannot build grid for region {}: {}", region.id, e))
        })?;
        debug!(
            region = %region.id,
            rows = grid.height(),
            cols = grid.width(),
            resolution = grid.resolution,
            "Built regional grid"
        );

        let radiance = self.align_radiance(region, &grid, &inputs.radiance_path, inputs.radiance_nodata)?;
        let landmask = self.align_landmask(region, &grid, &inputs.landmask_path)?;

        Ok(StaticFields {
            grid,
            radiance,
            landmask,
        })
    }

    /// Read and resample the configured Kd bands of one monthly file.
    pub fn align_kd(
        &self,
        region: &Region,
        grid: &RegionalGrid,
        path: &Path,
        fill_override: Option<f32>,
    ) -> Result<Vec<Vec<f32>>> {
        let variables: Vec<&str> = self.bands.iter().map(String::as_str).collect();
        let slice = read_kd_window(path, &variables, &self.window(region), fill_override)
            .map_err(|e| AlanError::from_netcdf(e, path, &region.id))?;

        let lats = Axis::new(slice.lats.clone()).map_err(|e| AlanError::format(path, e.to_string()))?;
        let lons = Axis::new(slice.lons.clone()).map_err(|e| AlanError::format(path, e.to_string()))?;

        let mut fields = Vec::with_capacity(slice.bands.len());
        for band in slice.bands {
            let source = SourceGrid::new(lats.clone(), lons.clone(), band.values)
                .map_err(|e| AlanError::format(path, e.to_string()))?;
            if fields.is_empty() {
                check_overlap(&source.coverage(), region, path)?;
            }
            debug!(
                region = %region.id,
                variable = %band.variable,
                rows = source.height(),
                cols = source.width(),
                "Read Kd band window"
            );
            fields.push(self.fill_and_resample(source, grid, self.resample.kd));
        }
        Ok(fields)
    }

    fn align_radiance(
        &self,
        region: &Region,
        grid: &RegionalGrid,
        path: &Path,
        nodata: Option<f32>,
    ) -> Result<Vec<f32>> {
        let raster = GeoTiffRaster::open(path, nodata).map_err(|e| AlanError::from_grid(e, path, &region.id))?;
        check_overlap(&raster.coverage(), region, path)?;

        let window = raster
            .read_window(&self.window(region))
            .map_err(|e| AlanError::from_grid(e, path, &region.id))?;
        Ok(self.fill_and_resample(window, grid, self.resample.radiance))
    }

    fn align_landmask(&self, region: &Region, grid: &RegionalGrid, path: &Path) -> Result<Vec<LandClass>> {
        let mask = ZarrLandmask::open(path, &self.landmask.variable)
            .map_err(|e| AlanError::from_grid(e, path, &region.id))?;
        check_overlap(&mask.coverage(), region, path)?;

        let window = mask
            .read_window(&self.window(region))
            .map_err(|e| AlanError::from_grid(e, path, &region.id))?;
        let categories = resample_categorical(&window, grid, self.resample.landmask);

        let water = self.landmask.water_value;
        let classes: Vec<LandClass> = categories
            .into_iter()
            .map(|c| LandClass::from_category(c, water))
            .collect();
        debug!(
            region = %region.id,
            method = %self.resample.landmask,
            water = classes.iter().filter(|c| **c == LandClass::Water).count(),
            unknown = classes.iter().filter(|c| **c == LandClass::Unknown).count(),
            "Aligned landmask"
        );
        Ok(classes)
    }

    fn fill_and_resample(
        &self,
        mut source: SourceGrid<f32>,
        grid: &RegionalGrid,
        method: InterpolationMethod,
    ) -> Vec<f32> {
        fill_gaps(&mut source, self.resample.gap_fill_window);
        resample_continuous(&source, grid, method)
    }

    fn window(&self, region: &Region) -> BoundingBox {
        region.bbox.expand(self.resample.buffer_deg)
    }
}

fn check_overlap(coverage: &BoundingBox, region: &Region, path: &Path) -> Result<()> {
    if coverage.intersects(&region.bbox) {
        return Ok(());
    }
    Err(AlanError::GridMismatch {
        region: region.id.clone(),
        source_name: path.display().to_string(),
        detail: format!(
            "source covers {} but region spans {}",
            coverage.extent_description(),
            region.bbox.extent_description()
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BandConfig;
    use std::path::PathBuf;

    fn region() -> Region {
        Region::new("Test", "Test", BoundingBox::from_snwe(-4.0, 0.0, 100.0, 104.0)).with_resolution(1.0)
    }

    fn inputs(dir: &Path) -> InputPaths {
        InputPaths {
            kd_dir: dir.to_path_buf(),
            kd_pattern: "kd_{month}.nc".to_string(),
            radiance_path: dir.join("radiance.tif"),
            landmask_path: dir.join("landmask.zarr"),
            kd_fill_value: None,
            radiance_nodata: None,
        }
    }

    #[test]
    fn test_missing_radiance_is_missing_input() {
        let dir = PathBuf::from("/nonexistent/alan");
        let config = PipelineConfig::new(inputs(&dir), 1.0, BandConfig::new("kd_490", 1.0, 0.0));
        let aligner = GridAligner::new(&config);

        let err = aligner.align_static(&region(), &config.inputs).unwrap_err();
        assert_eq!(
            err,
            AlanError::MissingInput {
                path: dir.join("radiance.tif")
            }
        );
    }

    #[test]
    fn test_check_overlap() {
        let r = region();
        assert!(check_overlap(&BoundingBox::new(90.0, -10.0, 110.0, 10.0), &r, Path::new("a")).is_ok());
        let err = check_overlap(&BoundingBox::new(-10.0, 40.0, 0.0, 50.0), &r, Path::new("a")).unwrap_err();
        assert!(matches!(err, AlanError::GridMismatch { .. }));
    }
}
