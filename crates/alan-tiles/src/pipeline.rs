//! The per-(region, month) tile pipeline.
//!
//! ```text
//! GridAligner::align ─► prepare_inputs ─► AttenuationModel::compute
//!                                              │
//!                     LandMasker::apply ◄──────┘
//!                            │
//!                            ▼
//!     TileAssembler::assemble ─► TileAssembler::write
//! ```
//!
//! Every call is synchronous and independent; the only shared state is the
//! read-only configuration.

use std::path::{Path, PathBuf};

use alan_common::{Month, Region, RegionRegistry};
use chrono::{Local, NaiveDate};
use tracing::{debug, info, warn};

use crate::aligner::{GridAligner, StaticFields};
use crate::assembler::{check_filename, TileAssembler};
use crate::attenuation::{prepare_inputs, AttenuationModel};
use crate::config::{InputPaths, PipelineConfig};
use crate::depth::DepthSummary;
use crate::error::{AlanError, Result, Stage, TileFailure};
use crate::landmask::LandMasker;

/// Per-invocation replacements for the configured input locations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputOverrides {
    pub kd_dir: Option<PathBuf>,
    pub kd_pattern: Option<String>,
    pub radiance_path: Option<PathBuf>,
    pub landmask_path: Option<PathBuf>,
    /// Written tile name in place of the generated one.
    pub filename: Option<String>,
}

impl InputOverrides {
    /// `base` with every set override applied.
    pub fn apply(&self, base: &InputPaths) -> InputPaths {
        let mut inputs = base.clone();
        if let Some(dir) = &self.kd_dir {
            inputs.kd_dir = dir.clone();
        }
        if let Some(pattern) = &self.kd_pattern {
            inputs.kd_pattern = pattern.clone();
        }
        if let Some(path) = &self.radiance_path {
            inputs.radiance_path = path.clone();
        }
        if let Some(path) = &self.landmask_path {
            inputs.landmask_path = path.clone();
        }
        inputs
    }
}

/// A successfully written tile.
#[derive(Debug, Clone, PartialEq)]
pub struct TileOutcome {
    pub region: String,
    pub month: Month,
    pub path: PathBuf,
    pub summary: DepthSummary,
}

/// Produces critical-depth tiles into one output directory.
pub struct TilePipeline {
    config: PipelineConfig,
    registry: RegionRegistry,
    aligner: GridAligner,
    model: AttenuationModel,
    masker: LandMasker,
    assembler: TileAssembler,
    output_dir: PathBuf,
    creation_date: Option<NaiveDate>,
}

impl TilePipeline {
    /// Validate `config` and build the pipeline.
    pub fn new(config: PipelineConfig, output_dir: impl Into<PathBuf>) -> Result<Self> {
        config.validate()?;
        let registry = config.region_registry()?;
        let model = AttenuationModel::new(config.attenuation.threshold)?;
        let aligner = GridAligner::new(&config);
        let assembler = TileAssembler::new(&config.output, config.attenuation.threshold);

        Ok(Self {
            registry,
            aligner,
            model,
            masker: LandMasker::new(),
            assembler,
            output_dir: output_dir.into(),
            creation_date: None,
            config,
        })
    }

    /// Stamp tiles with a fixed creation date instead of today's.
    pub fn with_creation_date(mut self, date: NaiveDate) -> Self {
        self.creation_date = Some(date);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &RegionRegistry {
        &self.registry
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Produce and write the tile for one region and month.
    pub fn produce_tile(
        &self,
        region: &str,
        month: Month,
        overrides: &InputOverrides,
    ) -> std::result::Result<TileOutcome, TileFailure> {
        let fail = |stage: Stage, error: AlanError| TileFailure::new(region, month, stage, error);

        let region_def = self.region(region).map_err(|e| fail(Stage::Align, e))?;
        let inputs = overrides.apply(&self.config.inputs);
        if !inputs.kd_pattern.contains(crate::config::MONTH_TOKEN) {
            return Err(fail(
                Stage::Align,
                AlanError::config(format!("kd_pattern '{}' has no {{month}}", inputs.kd_pattern)),
            ));
        }
        if let Some(name) = &overrides.filename {
            check_filename(name).map_err(|e| fail(Stage::Assemble, e))?;
        }

        let statics = self
            .aligner
            .align_static(region_def, &inputs)
            .map_err(|e| fail(Stage::Align, e))?;
        self.produce_from_static(region_def, month, &inputs, &statics, overrides.filename.as_deref())
    }

    /// Produce the tiles of one region for each of `months`.
    ///
    /// The region grid, radiance and landmask are aligned once and reused for
    /// every month. A failed month does not affect the others.
    pub fn produce_region(
        &self,
        region: &str,
        months: &[Month],
    ) -> Vec<std::result::Result<TileOutcome, TileFailure>> {
        let region_def = match self.region(region) {
            Ok(r) => r,
            Err(e) => {
                return months
                    .iter()
                    .map(|m| Err(TileFailure::new(region, *m, Stage::Align, e.clone())))
                    .collect()
            }
        };

        info!(region = %region, months = months.len(), "Aligning static sources");
        let inputs = &self.config.inputs;
        let statics = match self.aligner.align_static(region_def, inputs) {
            Ok(s) => s,
            Err(e) => {
                warn!(region = %region, error = %e, "Static alignment failed");
                return months
                    .iter()
                    .map(|m| Err(TileFailure::new(region, *m, Stage::Align, e.clone())))
                    .collect();
            }
        };

        months
            .iter()
            .map(|&month| self.produce_from_static(region_def, month, inputs, &statics, None))
            .collect()
    }

    fn region(&self, id: &str) -> Result<&Region> {
        self.registry
            .get(id)
            .map_err(|e| AlanError::config(e.to_string()))
    }

    fn produce_from_static(
        &self,
        region: &Region,
        month: Month,
        inputs: &InputPaths,
        statics: &StaticFields,
        filename: Option<&str>,
    ) -> std::result::Result<TileOutcome, TileFailure> {
        let fail = |stage: Stage, error: AlanError| {
            warn!(region = %region.id, month = %month, stage = %stage, error = %error, "Tile failed");
            TileFailure::new(region.id.as_str(), month, stage, error)
        };
        let grid = &statics.grid;
        let (rows, cols) = grid.shape();

        let kd = self
            .aligner
            .align_kd(region, grid, &inputs.kd_path(month), inputs.kd_fill_value)
            .map_err(|e| fail(Stage::Align, e))?;
        debug!(region = %region.id, month = %month, bands = kd.len(), "Aligned Kd");

        let prepared = prepare_inputs(&self.config.attenuation, &statics.radiance, &kd)
            .map_err(|e| fail(Stage::Attenuate, e))?;
        let depth = self
            .model
            .compute(rows, cols, &prepared)
            .map_err(|e| fail(Stage::Attenuate, e))?;

        let depth = self
            .masker
            .apply(depth, &statics.landmask)
            .map_err(|e| fail(Stage::Mask, e))?;
        let summary = depth.summary();

        let created = self
            .creation_date
            .unwrap_or_else(|| Local::now().date_naive());
        let mut tile = self
            .assembler
            .assemble(region, month, grid, &depth, created)
            .map_err(|e| fail(Stage::Assemble, e))?;
        if let Some(name) = filename {
            tile.filename = name.to_string();
        }
        let path = self
            .assembler
            .write(&tile, &self.output_dir)
            .map_err(|e| fail(Stage::Write, e))?;

        info!(
            region = %region.id,
            month = %month,
            depth = summary.depth,
            zero_depth = summary.zero_depth,
            undefined = summary.undefined,
            land = summary.land,
            "Tile complete"
        );

        Ok(TileOutcome {
            region: region.id.clone(),
            month,
            path,
            summary,
        })
    }
}
