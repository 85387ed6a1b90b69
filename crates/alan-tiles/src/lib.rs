//! Critical-depth tile generation for the ALAN atlas.
//!
//! Computes, for every ocean cell of a region and month, the depth at which
//! artificial light from the surface decays to a biological threshold, and
//! writes the result as a self-describing NetCDF tile.
//!
//! # Architecture
//!
//! ```text
//!   Kd climatology (NetCDF, monthly)   radiance (GeoTIFF)   landmask (Zarr)
//!                 │                           │                    │
//!                 └────────────┬──────────────┴────────────────────┘
//!                              ▼
//!                    GridAligner (regional grid)
//!                              │
//!                              ▼
//!                 AttenuationModel (d* = ln(I0/T) / Kd)
//!                              │
//!                              ▼
//!                    LandMasker (land / unknown)
//!                              │
//!                              ▼
//!              TileAssembler (CF attributes, atomic write)
//! ```
//!
//! [`TilePipeline`] drives the stages for one (region, month) at a time; the
//! `alan-tiler` service fans it out over regions.

pub mod aligner;
pub mod assembler;
pub mod attenuation;
pub mod config;
pub mod depth;
pub mod error;
pub mod landmask;
pub mod metadata;
pub mod pipeline;

// Re-exports
pub use aligner::{AlignedFields, GridAligner, StaticFields};
pub use assembler::{check_filename, tile_filename, time_coordinate, OutputTile, TileAssembler};
pub use attenuation::{prepare_inputs, AttenuationModel, PreparedInputs};
pub use config::{
    AttenuationConfig, BandConfig, InputPaths, LandmaskConfig, OutputConfig, PipelineConfig,
    RegionsConfig,
};
pub use depth::{DepthCell, DepthField, DepthSummary};
pub use error::{AlanError, Result, Stage, TileFailure};
pub use landmask::{LandClass, LandMasker};
pub use metadata::MetadataTemplate;
pub use pipeline::{InputOverrides, TileOutcome, TilePipeline};
