//! Packaging depth fields into self-describing NetCDF tiles.
//!
//! A tile holds two `[time, lat, lon]` variables:
//!
//! - `z_thresh`: critical depth in metres, `0.0` where the surface is already
//!   below threshold, the fill value where undefined and the land value on land
//! - `z_thresh_class`: the outcome of each cell as a CF flag variable
//!
//! Tiles are written into a temporary directory next to their destination and
//! renamed into place, so a failed write never leaves a partial file.

use std::path::{Path, PathBuf};

use alan_common::{Month, Region};
use chrono::NaiveDate;
use grid_processor::RegionalGrid;
use netcdf_parser::{write_tile, AttrValue, DataValues, DataVariable, TileDataset};
use tracing::{debug, info};

use crate::config::OutputConfig;
use crate::depth::{DepthField, CLASS_FLAG_MEANINGS, CLASS_FLAG_VALUES};
use crate::error::{AlanError, Result};
use crate::metadata::MetadataTemplate;

pub const DEPTH_VARIABLE: &str = "z_thresh";
pub const CLASS_VARIABLE: &str = "z_thresh_class";

/// An assembled tile ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTile {
    pub region_id: String,
    pub month: Month,
    pub filename: String,
    pub dataset: TileDataset,
}

/// Builds and writes output tiles.
#[derive(Debug, Clone)]
pub struct TileAssembler {
    template: MetadataTemplate,
    fill_value: f32,
    land_value: f32,
    reference_year: i32,
    region_suffix: bool,
    threshold: f64,
}

impl TileAssembler {
    /// `threshold` is recorded on the depth variable.
    pub fn new(output: &OutputConfig, threshold: f64) -> Self {
        Self {
            template: output.template(),
            fill_value: output.fill_value,
            land_value: output.land_value,
            reference_year: output.reference_year,
            region_suffix: output.region_suffix,
            threshold,
        }
    }

    /// Build the tile for `depth` on `grid`, dated `created`.
    pub fn assemble(
        &self,
        region: &Region,
        month: Month,
        grid: &RegionalGrid,
        depth: &DepthField,
        created: NaiveDate,
    ) -> Result<OutputTile> {
        if depth.shape() != grid.shape() {
            return Err(AlanError::ShapeMismatch {
                context: format!("tile {}/{}", region.id, month),
                expected: grid.shape(),
                actual: depth.shape(),
            });
        }

        let mut global_attributes: Vec<(String, AttrValue)> = self
            .template
            .render(region, created)?
            .into_iter()
            .map(|(k, v)| (k, AttrValue::Text(v)))
            .collect();
        global_attributes.push(("region_id".to_string(), AttrValue::text(&region.id)));
        global_attributes.push(("region_name".to_string(), AttrValue::text(&region.name)));
        global_attributes.push(("month".to_string(), AttrValue::text(month.to_string())));
        global_attributes.push((
            "geospatial_bounds".to_string(),
            AttrValue::Doubles(vec![
                region.bbox.min_lat,
                region.bbox.max_lat,
                region.bbox.min_lon,
                region.bbox.max_lon,
            ]),
        ));
        global_attributes.push(("crs".to_string(), AttrValue::text(region.crs.to_string())));

        let depth_variable = DataVariable {
            name: DEPTH_VARIABLE.to_string(),
            values: DataValues::F32(depth.encode(self.fill_value, self.land_value)),
            fill_value: Some(self.fill_value),
            attributes: vec![
                (
                    "long_name".to_string(),
                    AttrValue::text("Depth below which light threshold reached"),
                ),
                ("units".to_string(), AttrValue::text("m")),
                ("alias".to_string(), AttrValue::text("Critical Depth (m)")),
                ("level_descr".to_string(), AttrValue::text("Surface")),
                ("var_desc".to_string(), AttrValue::text("Threshold depth: m")),
                (
                    "field_descr".to_string(),
                    AttrValue::text(format!(
                        "Depth at which the modelled light level in the water column, \
                         illuminated by artificial light at night, drops below {} \
                         (the threshold irradiance)",
                        self.threshold
                    )),
                ),
                ("land_value".to_string(), AttrValue::Float(self.land_value)),
                ("threshold_irradiance".to_string(), AttrValue::Double(self.threshold)),
                (
                    "comment".to_string(),
                    AttrValue::text(format!(
                        "0 where surface light is at or below threshold; {} where undefined; {} on land",
                        self.fill_value, self.land_value
                    )),
                ),
            ],
        };

        let class_variable = DataVariable {
            name: CLASS_VARIABLE.to_string(),
            values: DataValues::U8(depth.class_codes()),
            fill_value: None,
            attributes: vec![
                (
                    "long_name".to_string(),
                    AttrValue::text("Critical depth outcome class"),
                ),
                (
                    "flag_values".to_string(),
                    AttrValue::Bytes(CLASS_FLAG_VALUES.to_vec()),
                ),
                (
                    "flag_meanings".to_string(),
                    AttrValue::text(CLASS_FLAG_MEANINGS),
                ),
            ],
        };

        let dataset = TileDataset {
            lats: grid.lats.clone(),
            lons: grid.lons.clone(),
            time: time_coordinate(self.reference_year, month)?,
            variables: vec![depth_variable, class_variable],
            global_attributes,
        };

        debug!(
            region = %region.id,
            month = %month,
            rows = grid.height(),
            cols = grid.width(),
            "Assembled tile"
        );

        Ok(OutputTile {
            region_id: region.id.clone(),
            month,
            filename: tile_filename(region, month, self.region_suffix),
            dataset,
        })
    }

    /// Write `tile` into `output_dir`, replacing an earlier tile of the same
    /// region and month. Returns the final path.
    pub fn write(&self, tile: &OutputTile, output_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(output_dir).map_err(|e| AlanError::write(output_dir, e))?;

        let target = output_dir.join(&tile.filename);
        if target.exists() && !target.is_file() {
            return Err(AlanError::write(&target, "destination exists and is not a file"));
        }

        let staging = tempfile::Builder::new()
            .prefix(".alan-tile-")
            .tempdir_in(output_dir)
            .map_err(|e| AlanError::write(output_dir, e))?;
        let staged = staging.path().join(&tile.filename);

        write_tile(&staged, &tile.dataset).map_err(|e| AlanError::write(&target, e))?;
        std::fs::rename(&staged, &target).map_err(|e| AlanError::write(&target, e))?;

        info!(
            region = %tile.region_id,
            month = %tile.month,
            path = %target.display(),
            "Wrote tile"
        );
        Ok(target)
    }
}

/// `In-water_clear-sky_ALAN_Zc_Month-{MM}_{S}S_{N}N_{W}W_{E}E[_{region}].nc`
pub fn tile_filename(region: &Region, month: Month, region_suffix: bool) -> String {
    let b = &region.bbox;
    let suffix = if region_suffix {
        format!("_{}", region.id)
    } else {
        String::new()
    };
    format!(
        "In-water_clear-sky_ALAN_Zc_Month-{}_{}S_{}N_{}W_{}E{}.nc",
        month, b.min_lat, b.max_lat, b.min_lon, b.max_lon, suffix
    )
}

/// Check a caller-chosen tile filename: a bare `.nc` file name.
pub fn check_filename(name: &str) -> Result<()> {
    let bare = Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name);
    if !bare || name.starts_with('.') || !name.ends_with(".nc") {
        return Err(AlanError::config(format!(
            "tile filename '{}' must be a plain .nc file name",
            name
        )));
    }
    Ok(())
}

/// Days since 1970-01-01 of the first day of `month` in `year`.
pub fn time_coordinate(year: i32, month: Month) -> Result<f64> {
    let date = NaiveDate::from_ymd_opt(year, month.number() as u32, 1)
        .ok_or_else(|| AlanError::config(format!("invalid reference date {}-{}-01", year, month)))?;
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
        .ok_or_else(|| AlanError::config("invalid epoch"))?;
    Ok((date - epoch).num_days() as f64)
}
