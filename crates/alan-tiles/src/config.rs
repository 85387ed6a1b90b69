//! Pipeline configuration.
//!
//! Everything the core needs is passed in through [`PipelineConfig`]; nothing
//! is read from the environment here. The driver builds it from YAML and CLI
//! flags.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use alan_common::{Month, Region, RegionRegistry};
use grid_processor::ResampleConfig;
use serde::{Deserialize, Serialize};

use crate::error::{AlanError, Result};
use crate::metadata::MetadataTemplate;

/// Placeholder replaced by the two-digit month in Kd filename patterns.
pub const MONTH_TOKEN: &str = "{month}";

/// Landmask category that marks water in the atlas landmask.
pub const DEFAULT_WATER_VALUE: i32 = 255;

/// `z_thresh` encoding of undefined cells.
pub const DEFAULT_FILL_VALUE: f32 = -999.0;

/// `z_thresh` encoding of land cells.
pub const DEFAULT_LAND_VALUE: f32 = -998.0;

/// Year every monthly tile's time coordinate is pinned to.
pub const DEFAULT_REFERENCE_YEAR: i32 = 2019;

/// Complete configuration of a [`TilePipeline`](crate::TilePipeline).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub inputs: InputPaths,

    #[serde(default)]
    pub resample: ResampleConfig,

    pub attenuation: AttenuationConfig,

    #[serde(default)]
    pub landmask: LandmaskConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub regions: RegionsConfig,
}

/// Locations of the three source datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputPaths {
    /// Directory holding the monthly Kd climatology files.
    pub kd_dir: PathBuf,

    /// Kd filename with a `{month}` placeholder, e.g. `kd_{month}.nc`.
    pub kd_pattern: String,

    /// Surface radiance GeoTIFF.
    pub radiance_path: PathBuf,

    /// Landmask Zarr directory store.
    pub landmask_path: PathBuf,

    /// Overrides the Kd variables' `_FillValue`.
    #[serde(default)]
    pub kd_fill_value: Option<f32>,

    /// Overrides the radiance GDAL_NODATA tag.
    #[serde(default)]
    pub radiance_nodata: Option<f32>,
}

impl InputPaths {
    /// Kd file for `month`.
    pub fn kd_path(&self, month: Month) -> PathBuf {
        self.kd_dir
            .join(self.kd_pattern.replace(MONTH_TOKEN, &month.to_string()))
    }
}

/// Critical depth model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttenuationConfig {
    /// Ecological intensity threshold T, in the same units as irradiance.
    pub threshold: f64,

    /// Kd band variables with their radiance-to-irradiance conversion.
    pub bands: Vec<BandConfig>,

    /// Radiance at or below this value is treated as no-data.
    #[serde(default)]
    pub radiance_floor: Option<f64>,
}

/// One spectral band: `E = slope * radiance + offset`, attenuated by `variable`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandConfig {
    /// Kd variable name in the monthly files.
    pub variable: String,

    #[serde(default = "default_slope")]
    pub slope: f64,

    #[serde(default)]
    pub offset: f64,
}

fn default_slope() -> f64 {
    1.0
}

impl BandConfig {
    pub fn new(variable: impl Into<String>, slope: f64, offset: f64) -> Self {
        Self {
            variable: variable.into(),
            slope,
            offset,
        }
    }
}

/// Landmask store layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmaskConfig {
    /// Name of the categorical array in the store.
    pub variable: String,

    /// Category value meaning water; any other category is land.
    pub water_value: i32,
}

impl Default for LandmaskConfig {
    fn default() -> Self {
        Self {
            variable: "landmask".to_string(),
            water_value: DEFAULT_WATER_VALUE,
        }
    }
}

/// Tile encoding and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// `z_thresh` value of undefined cells, also its `_FillValue`.
    pub fill_value: f32,

    /// `z_thresh` value of land cells.
    pub land_value: f32,

    /// Year of the tile time coordinate.
    pub reference_year: i32,

    /// End generated filenames with `_{region_id}`.
    pub region_suffix: bool,

    /// YAML file of global attributes; inline `metadata` entries win.
    pub metadata_file: Option<PathBuf>,

    /// Inline template; the built-in one when neither this nor a file is set.
    pub metadata: Option<MetadataTemplate>,
}

impl OutputConfig {
    /// The effective attribute template.
    pub fn template(&self) -> MetadataTemplate {
        self.metadata.clone().unwrap_or_default()
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            fill_value: DEFAULT_FILL_VALUE,
            land_value: DEFAULT_LAND_VALUE,
            reference_year: DEFAULT_REFERENCE_YEAR,
            region_suffix: true,
            metadata_file: None,
            metadata: None,
        }
    }
}

/// Changes to the built-in region registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionsConfig {
    /// Resolution applied to every region, in degrees.
    pub resolution: Option<f64>,

    /// Regions added to, or replacing entries of, the atlas registry.
    pub extra: Vec<Region>,
}

impl PipelineConfig {
    /// Minimal configuration over the given inputs and a single band.
    pub fn new(inputs: InputPaths, threshold: f64, band: BandConfig) -> Self {
        Self {
            inputs,
            resample: ResampleConfig::default(),
            attenuation: AttenuationConfig {
                threshold,
                bands: vec![band],
                radiance_floor: None,
            },
            landmask: LandmaskConfig::default(),
            output: OutputConfig::default(),
            regions: RegionsConfig::default(),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.inputs.kd_pattern.contains(MONTH_TOKEN) {
            return Err(AlanError::config(format!(
                "kd_pattern '{}' must contain {}",
                self.inputs.kd_pattern, MONTH_TOKEN
            )));
        }

        self.resample.validate().map_err(AlanError::Config)?;

        let attenuation = &self.attenuation;
        if !(attenuation.threshold > 0.0 && attenuation.threshold.is_finite()) {
            return Err(AlanError::config(format!(
                "threshold must be a positive number, got {}",
                attenuation.threshold
            )));
        }
        if attenuation.bands.is_empty() {
            return Err(AlanError::config("at least one Kd band must be configured"));
        }
        let mut seen = HashSet::new();
        for band in &attenuation.bands {
            if !seen.insert(band.variable.as_str()) {
                return Err(AlanError::config(format!(
                    "Kd band '{}' is configured twice",
                    band.variable
                )));
            }
            if !band.slope.is_finite() || !band.offset.is_finite() {
                return Err(AlanError::config(format!(
                    "Kd band '{}' has a non-finite conversion",
                    band.variable
                )));
            }
        }
        if attenuation.radiance_floor.is_some_and(|f| !f.is_finite()) {
            return Err(AlanError::config("radiance_floor must be finite"));
        }

        let output = &self.output;
        if !output.fill_value.is_finite() || !output.land_value.is_finite() {
            return Err(AlanError::config("fill_value and land_value must be finite"));
        }
        if output.fill_value == output.land_value {
            return Err(AlanError::config(format!(
                "fill_value and land_value must differ, both are {}",
                output.fill_value
            )));
        }
        if output.fill_value >= 0.0 || output.land_value >= 0.0 {
            return Err(AlanError::config(
                "fill_value and land_value must be negative so they never collide with depths",
            ));
        }
        if !(1970..=9999).contains(&output.reference_year) {
            return Err(AlanError::config(format!(
                "reference_year must be between 1970 and 9999, got {}",
                output.reference_year
            )));
        }

        if let Some(resolution) = self.regions.resolution {
            if !(resolution > 0.0 && resolution.is_finite()) {
                return Err(AlanError::config(format!(
                    "resolution must be positive, got {}",
                    resolution
                )));
            }
        }

        Ok(())
    }

    /// The atlas registry with this configuration's overrides applied.
    ///
    /// `regions.resolution` also applies to `regions.extra`.
    pub fn region_registry(&self) -> Result<RegionRegistry> {
        let mut registry = RegionRegistry::atlas();
        for region in &self.regions.extra {
            registry
                .insert(region.clone())
                .map_err(|e| AlanError::config(e.to_string()))?;
        }
        if let Some(resolution) = self.regions.resolution {
            registry
                .set_resolution(resolution)
                .map_err(|e| AlanError::config(e.to_string()))?;
        }
        Ok(registry)
    }

    /// Load `output.metadata_file`, keeping inline attributes on top.
    ///
    /// Relative paths are resolved against `base_dir`.
    pub fn load_metadata_file(&mut self, base_dir: &Path) -> Result<()> {
        let Some(file) = self.output.metadata_file.clone() else {
            return Ok(());
        };
        let path = if file.is_relative() {
            base_dir.join(file)
        } else {
            file
        };
        let loaded = MetadataTemplate::load(&path)?;
        self.output.metadata = Some(match self.output.metadata.take() {
            Some(inline) => loaded.merged_with(&inline),
            None => loaded,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PipelineConfig {
        PipelineConfig::new(
            InputPaths {
                kd_dir: PathBuf::from("/data/kd"),
                kd_pattern: "ESACCI-OC-kd-{month}.nc".to_string(),
                radiance_path: PathBuf::from("/data/falchi.tif"),
                landmask_path: PathBuf::from("/data/landmask.zarr"),
                kd_fill_value: None,
                radiance_nodata: None,
            },
            0.102,
            BandConfig::new("kd_490", 1.0, 0.0),
        )
    }

    #[test]
    fn test_kd_path_substitutes_month() {
        let config = config();
        assert_eq!(
            config.inputs.kd_path(Month::new(3).unwrap()),
            PathBuf::from("/data/kd/ESACCI-OC-kd-03.nc")
        );
    }

    #[test]
    fn test_defaults_validate() {
        let config = config();
        assert!(config.validate().is_ok());
        assert_eq!(config.landmask.water_value, 255);
        assert_eq!(config.output.fill_value, -999.0);
        assert_eq!(config.output.land_value, -998.0);
        assert_eq!(config.output.reference_year, 2019);
        assert!(config.output.region_suffix);
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let mut c = config();
        c.inputs.kd_pattern = "kd.nc".to_string();
        assert!(matches!(c.validate(), Err(AlanError::Config(_))));

        let mut c = config();
        c.attenuation.threshold = 0.0;
        assert!(c.validate().is_err());

        let mut c = config();
        c.attenuation.bands.clear();
        assert!(c.validate().is_err());

        let mut c = config();
        c.attenuation.bands.push(BandConfig::new("kd_490", 2.0, 0.0));
        assert!(c.validate().is_err());

        let mut c = config();
        c.output.land_value = c.output.fill_value;
        assert!(c.validate().is_err());

        let mut c = config();
        c.regions.resolution = Some(-1.0);
        assert!(c.validate().is_err());

        let mut c = config();
        c.resample.buffer_deg = -1.0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_deserialize_yaml() {
        let yaml = r#"
inputs:
  kd_dir: /data/kd
  kd_pattern: "kd_{month}.nc"
  radiance_path: /data/falchi.tif
  landmask_path: /data/landmask.zarr
resample:
  kd: cubic
  landmask: majority
attenuation:
  threshold: 0.102
  bands:
    - variable: kd_blue
      slope: 0.4
      offset: 0.1
    - variable: kd_red
regions:
  resolution: 0.5
"#;
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.attenuation.bands.len(), 2);
        assert_eq!(config.attenuation.bands[1].slope, 1.0);
        assert_eq!(config.attenuation.bands[1].offset, 0.0);
        assert_eq!(config.resample.gap_fill_window, 3);
        assert_eq!(config.landmask.variable, "landmask");
        assert!(config.validate().is_ok());

        let registry = config.region_registry().unwrap();
        assert_eq!(registry.get("Oceania").unwrap().resolution, 0.5);
    }

    #[test]
    fn test_threshold_is_required() {
        let yaml = r#"
inputs:
  kd_dir: /data/kd
  kd_pattern: "kd_{month}.nc"
  radiance_path: /data/falchi.tif
  landmask_path: /data/landmask.zarr
attenuation:
  bands:
    - variable: kd_490
"#;
        assert!(serde_yaml::from_str::<PipelineConfig>(yaml).is_err());
    }

    #[test]
    fn test_extra_region_replaces_atlas_entry() {
        let mut c = config();
        c.regions.extra.push(
            Region::new(
                "Oceania",
                "Oceania",
                alan_common::BoundingBox::from_snwe(-4.0, 0.0, 100.0, 104.0),
            )
            .with_resolution(1.0),
        );
        let registry = c.region_registry().unwrap();
        assert_eq!(registry.len(), 11);
        assert_eq!(registry.get("Oceania").unwrap().bbox.min_lat, -4.0);
    }

    #[test]
    fn test_resolution_override_covers_extra_regions() {
        let mut c = config();
        c.regions.resolution = Some(0.25);
        c.regions.extra.push(
            Region::new(
                "Reef",
                "Reef",
                alan_common::BoundingBox::from_snwe(-20.0, -10.0, 140.0, 150.0),
            )
            .with_resolution(1.0),
        );
        let registry = c.region_registry().unwrap();
        assert_eq!(registry.get("Reef").unwrap().resolution, 0.25);
        assert_eq!(registry.get("SAm").unwrap().resolution, 0.25);
    }
}
