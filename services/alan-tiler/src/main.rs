//! ALAN critical-depth tiler.
//!
//! Produces one NetCDF tile per (region, month) from a Kd climatology, a
//! surface radiance raster and a landmask. Regions run in parallel on a rayon
//! pool; the months of a region run in order so the region's static fields
//! are aligned once.

mod config_loader;

use std::path::PathBuf;

use alan_common::{Month, RegionRegistry};
use alan_tiles::{TileFailure, TileOutcome, TilePipeline};
use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "alan-tiler")]
#[command(about = "Generate in-water ALAN critical-depth tiles")]
struct Args {
    /// Directory receiving the tiles
    #[arg(required_unless_present = "list_regions")]
    output_dir: Option<PathBuf>,

    /// Regions to produce (default: every registry region)
    #[arg(short, long, value_delimiter = ',')]
    regions: Vec<String>,

    /// Two-digit months to produce (default: 01-12)
    #[arg(short, long, value_delimiter = ',')]
    months: Vec<String>,

    /// Pipeline configuration file
    #[arg(short, long, default_value = "config/alan.yaml", env = "ALAN_CONFIG")]
    config: PathBuf,

    /// Directory of the monthly Kd files
    #[arg(long, env = "ALAN_KD_DIR")]
    kd_dir: Option<PathBuf>,

    /// Kd filename pattern containing {month}
    #[arg(long)]
    kd_pattern: Option<String>,

    /// Surface radiance GeoTIFF
    #[arg(long, env = "ALAN_RADIANCE_PATH")]
    radiance_path: Option<PathBuf>,

    /// Landmask Zarr store
    #[arg(long, env = "ALAN_LANDMASK_PATH")]
    landmask_path: Option<PathBuf>,

    /// Ecological irradiance threshold
    #[arg(long)]
    threshold: Option<f64>,

    /// Worker threads (default: one per core)
    #[arg(short, long, env = "ALAN_JOBS")]
    jobs: Option<usize>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Print the region registry and exit
    #[arg(long)]
    list_regions: bool,
}

fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.json_logs);

    match run(args) {
        Ok(0) => {}
        Ok(failed) => {
            error!(failed, "Some tiles failed");
            std::process::exit(1);
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), "Tiler aborted");
            std::process::exit(2);
        }
    }
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let builder = fmt().with_env_filter(filter).with_target(true).with_level(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Run the tiler; returns the number of failed tiles.
fn run(args: Args) -> Result<usize> {
    let mut config = config_loader::load_pipeline_config(&args.config)?;
    info!(config = %args.config.display(), "Loaded configuration");

    if let Some(dir) = &args.kd_dir {
        config.inputs.kd_dir = config_loader::expand_path(dir);
    }
    if let Some(pattern) = &args.kd_pattern {
        config.inputs.kd_pattern = pattern.clone();
    }
    if let Some(path) = &args.radiance_path {
        config.inputs.radiance_path = config_loader::expand_path(path);
    }
    if let Some(path) = &args.landmask_path {
        config.inputs.landmask_path = config_loader::expand_path(path);
    }
    if let Some(threshold) = args.threshold {
        config.attenuation.threshold = threshold;
    }

    if args.list_regions {
        let registry = config
            .region_registry()
            .context("Failed to build region registry")?;
        print_regions(&registry);
        return Ok(0);
    }

    let output_dir = args
        .output_dir
        .clone()
        .context("An output directory is required")?;
    let pipeline = TilePipeline::new(config, &output_dir).context("Invalid configuration")?;

    let regions = select_regions(pipeline.registry(), &args.regions)?;
    let months = parse_months(&args.months)?;

    let mut pool = rayon::ThreadPoolBuilder::new();
    if let Some(jobs) = args.jobs {
        pool = pool.num_threads(jobs);
    }
    let pool = pool.build().context("Failed to build worker pool")?;

    info!(
        regions = regions.len(),
        months = months.len(),
        threads = pool.current_num_threads(),
        output = %output_dir.display(),
        "Starting tile generation"
    );

    let results: Vec<Result<TileOutcome, TileFailure>> = pool.install(|| {
        regions
            .par_iter()
            .flat_map_iter(|region| pipeline.produce_region(region, &months))
            .collect()
    });

    let mut failed = 0;
    for result in &results {
        match result {
            Ok(outcome) => info!(
                region = %outcome.region,
                month = %outcome.month,
                path = %outcome.path.display(),
                "Tile written"
            ),
            Err(failure) => {
                failed += 1;
                warn!(
                    region = %failure.region,
                    month = %failure.month,
                    stage = %failure.stage,
                    error = %failure.error,
                    "Tile failed"
                );
            }
        }
    }

    info!(
        written = results.len() - failed,
        failed,
        "Tile generation complete"
    );
    Ok(failed)
}

/// Requested regions in first-mention order, or every registry region when
/// none are named. Repeats are dropped so no tile is written twice.
fn select_regions(registry: &RegionRegistry, requested: &[String]) -> Result<Vec<String>> {
    if requested.is_empty() {
        return Ok(registry.ids());
    }
    let mut selected: Vec<String> = Vec::with_capacity(requested.len());
    for id in requested {
        registry
            .get(id)
            .with_context(|| format!("Unknown region '{}'; known: {}", id, registry.ids().join(", ")))?;
        if !selected.contains(id) {
            selected.push(id.clone());
        }
    }
    Ok(selected)
}

/// Requested months, or all twelve when none are named.
fn parse_months(requested: &[String]) -> Result<Vec<Month>> {
    if requested.is_empty() {
        return Ok(Month::all());
    }
    let mut months = requested
        .iter()
        .map(|m| {
            m.parse::<Month>()
                .with_context(|| format!("Invalid month '{}'; expected 01-12", m))
        })
        .collect::<Result<Vec<_>>>()?;
    months.sort();
    months.dedup();
    Ok(months)
}

fn print_regions(registry: &RegionRegistry) {
    for region in registry.iter() {
        println!(
            "{:<12} {:<45} {} ({} deg)",
            region.id,
            region.name,
            region.bbox.extent_description(),
            region.resolution
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_months_defaults_to_all() {
        assert_eq!(parse_months(&[]).unwrap().len(), 12);
    }

    #[test]
    fn test_parse_months_sorted_and_deduplicated() {
        let months = parse_months(&["03".into(), "01".into(), "03".into()]).unwrap();
        assert_eq!(
            months.iter().map(|m| m.to_string()).collect::<Vec<_>>(),
            vec!["01", "03"]
        );
    }

    #[test]
    fn test_parse_months_rejects_invalid() {
        assert!(parse_months(&["13".into()]).is_err());
        assert!(parse_months(&["3".into()]).is_err());
    }

    #[test]
    fn test_select_regions() {
        let registry = RegionRegistry::atlas();
        assert_eq!(select_regions(&registry, &[]).unwrap().len(), registry.len());
        assert_eq!(
            select_regions(&registry, &["Oceania".into()]).unwrap(),
            vec!["Oceania".to_string()]
        );
        assert!(select_regions(&registry, &["Atlantis".into()]).is_err());
    }

    #[test]
    fn test_select_regions_drops_repeats() {
        let registry = RegionRegistry::atlas();
        let selected = select_regions(
            &registry,
            &["SAm".into(), "Oceania".into(), "SAm".into()],
        )
        .unwrap();
        assert_eq!(selected, vec!["SAm".to_string(), "Oceania".to_string()]);
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "alan-tiler",
            "/tmp/out",
            "--regions",
            "Oceania,EuropeMed",
            "--months",
            "01,02",
            "--threshold",
            "0.2",
            "--json-logs",
        ])
        .unwrap();
        assert_eq!(args.output_dir, Some(PathBuf::from("/tmp/out")));
        assert_eq!(args.regions, vec!["Oceania", "EuropeMed"]);
        assert_eq!(args.months, vec!["01", "02"]);
        assert_eq!(args.threshold, Some(0.2));
        assert!(args.json_logs);
    }

    #[test]
    fn test_output_dir_optional_when_listing() {
        let args = Args::try_parse_from(["alan-tiler", "--list-regions"]).unwrap();
        assert!(args.list_regions);
        assert!(args.output_dir.is_none());
        assert!(Args::try_parse_from(["alan-tiler"]).is_err());
    }
}
