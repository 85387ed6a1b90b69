//! End-to-end tile production against synthetic sources.
//!
//! The region is a 4x4 one-degree grid over 4S-0N, 100E-104E whose cell
//! centres coincide with the source grids, so resampling is exact.

use alan_common::{BoundingBox, Month, Region};
use alan_tiles::{
    AlanError, BandConfig, DepthSummary, GridAligner, InputOverrides, InputPaths, LandClass,
    PipelineConfig, Stage, TileOutcome, TilePipeline,
};
use approx::assert_relative_eq;
use chrono::NaiveDate;
use netcdf_parser::read_tile;
use test_utils::{GridSpec, SourceFixture, KD_PATTERN, LAND, WATER};

const FILL: f32 = -999.0;
const LAND_VALUE: f32 = -998.0;
const RADIANCE_NODATA: f32 = -9999.0;

fn spec() -> GridSpec {
    GridSpec::new(-4.0, 0.0, 100.0, 104.0, 1.0)
}

fn month(s: &str) -> Month {
    s.parse().unwrap()
}

/// Kd 0.5 everywhere except a zero at (1, 1).
fn kd_field() -> Vec<f32> {
    let mut kd = vec![0.5f32; 16];
    kd[5] = 0.0;
    kd
}

/// Radiance 10 everywhere except 0.5 at (0, 1).
fn radiance_field() -> Vec<f32> {
    let mut r = vec![10.0f32; 16];
    r[1] = 0.5;
    r
}

/// Water everywhere except land at (1, 0).
fn landmask_field() -> Vec<u8> {
    let mut m = vec![WATER; 16];
    m[4] = LAND;
    m
}

fn fixture(months: &[&str]) -> SourceFixture {
    let fx = SourceFixture::new().unwrap();
    let spec = spec();
    let kd = kd_field();
    for m in months {
        fx.write_kd(m, &spec, &[("kd_490", kd.as_slice())]).unwrap();
    }
    fx.write_radiance(&spec, &radiance_field(), None).unwrap();
    fx.write_landmask(&spec, &landmask_field()).unwrap();
    fx
}

fn config(fx: &SourceFixture) -> PipelineConfig {
    let mut config = PipelineConfig::new(
        InputPaths {
            kd_dir: fx.kd_dir.clone(),
            kd_pattern: KD_PATTERN.to_string(),
            radiance_path: fx.radiance_path.clone(),
            landmask_path: fx.landmask_path.clone(),
            kd_fill_value: None,
            radiance_nodata: None,
        },
        1.0,
        BandConfig::new("kd_490", 1.0, 0.0),
    );
    config.regions.extra.push(oceania());
    config
}

fn oceania() -> Region {
    Region::new("Oceania", "Oceania", BoundingBox::from_snwe(-4.0, 0.0, 100.0, 104.0))
        .with_resolution(1.0)
}

fn pipeline(fx: &SourceFixture) -> TilePipeline {
    pipeline_with(fx, config(fx))
}

fn pipeline_with(fx: &SourceFixture, config: PipelineConfig) -> TilePipeline {
    TilePipeline::new(config, fx.output_dir.clone())
        .unwrap()
        .with_creation_date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
}

/// Uniform Kd and radiance with one Kd fill cell at (2, 2) and one radiance
/// nodata cell at (3, 2).
fn no_data_fixture() -> SourceFixture {
    let fx = SourceFixture::new().unwrap();
    let spec = spec();
    let mut kd = vec![0.5f32; 16];
    kd[10] = f32::NAN;
    fx.write_kd("03", &spec, &[("kd_490", kd.as_slice())]).unwrap();
    let mut radiance = vec![10.0f32; 16];
    radiance[14] = RADIANCE_NODATA;
    fx.write_radiance(&spec, &radiance, Some(RADIANCE_NODATA)).unwrap();
    fx.write_landmask(&spec, &landmask_field()).unwrap();
    fx
}

fn z_thresh(outcome: &TileOutcome) -> Vec<f32> {
    let tile = read_tile(&outcome.path).unwrap();
    tile.variable("z_thresh")
        .unwrap()
        .values
        .as_f32()
        .unwrap()
        .to_vec()
}

#[test]
fn test_aligner_reproduces_coincident_grids() {
    let fx = fixture(&["03"]);
    let config = config(&fx);
    let aligned = GridAligner::new(&config)
        .align(&oceania(), month("03"), &config.inputs)
        .unwrap();

    assert_eq!(aligned.grid.shape(), (4, 4));
    assert_eq!(aligned.kd.len(), 1);
    assert_eq!(aligned.kd[0], kd_field());
    assert_eq!(aligned.radiance, radiance_field());
    assert_eq!(aligned.landmask[4], LandClass::Land);
    assert_eq!(
        aligned
            .landmask
            .iter()
            .filter(|c| **c == LandClass::Water)
            .count(),
        15
    );
}

#[test]
fn test_oceania_march_tile() {
    let fx = fixture(&["03"]);
    let outcome = pipeline(&fx)
        .produce_tile("Oceania", month("03"), &InputOverrides::default())
        .unwrap();

    assert_eq!(
        outcome.path.file_name().unwrap().to_str().unwrap(),
        "In-water_clear-sky_ALAN_Zc_Month-03_-4S_0N_100W_104E_Oceania.nc"
    );
    assert_eq!(
        outcome.summary,
        DepthSummary {
            depth: 13,
            zero_depth: 1,
            undefined: 1,
            land: 1,
        }
    );

    let tile = read_tile(&outcome.path).unwrap();
    assert_eq!(tile.lats, vec![-0.5, -1.5, -2.5, -3.5]);
    assert_eq!(tile.lons, vec![100.5, 101.5, 102.5, 103.5]);
    assert_eq!(tile.time, 17956.0);

    let depth = tile.variable("z_thresh").unwrap();
    assert_eq!(depth.fill_value, Some(FILL));
    let values = depth.values.as_f32().unwrap();
    assert_eq!(values.len(), 16);
    assert_relative_eq!(values[0], 4.60517, epsilon = 1e-4);
    assert_eq!(values[1], 0.0);
    assert_eq!(values[4], LAND_VALUE);
    assert_eq!(values[5], FILL);
    assert_relative_eq!(values[15], 4.60517, epsilon = 1e-4);

    let classes = tile.variable("z_thresh_class").unwrap();
    let codes = classes.values.as_u8().unwrap();
    assert_eq!(&codes[..6], &[0, 1, 0, 0, 3, 2]);

    let title = tile.global_attribute("title").and_then(|a| a.as_text());
    assert!(title.unwrap().starts_with("Oceania"));
    assert_eq!(
        tile.global_attribute("creation_date").and_then(|a| a.as_text()),
        Some("01/05/2024")
    );
    assert_eq!(
        tile.global_attribute("region_id").and_then(|a| a.as_text()),
        Some("Oceania")
    );
}

#[test]
fn test_missing_month_fails_alone() {
    let fx = fixture(&["01", "03"]);
    let months = [month("01"), month("02"), month("03")];
    let results = pipeline(&fx).produce_region("Oceania", &months);

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[2].is_ok());

    let failure = results[1].as_ref().unwrap_err();
    assert_eq!(failure.stage, Stage::Align);
    assert_eq!(failure.month, month("02"));
    assert_eq!(
        failure.error,
        AlanError::MissingInput {
            path: fx.kd_path("02")
        }
    );

    let written = std::fs::read_dir(&fx.output_dir).unwrap().count();
    assert_eq!(written, 2);
}

#[test]
fn test_rerun_is_deterministic_and_replaces_tile() {
    let fx = fixture(&["03"]);
    let p = pipeline(&fx);

    let first = p
        .produce_tile("Oceania", month("03"), &InputOverrides::default())
        .unwrap();
    let first_values = read_tile(&first.path).unwrap();
    let second = p
        .produce_tile("Oceania", month("03"), &InputOverrides::default())
        .unwrap();
    let second_values = read_tile(&second.path).unwrap();

    assert_eq!(first.path, second.path);
    assert_eq!(
        first_values.variable("z_thresh").unwrap().values,
        second_values.variable("z_thresh").unwrap().values
    );
    assert_eq!(std::fs::read_dir(&fx.output_dir).unwrap().count(), 1);
}

#[test]
fn test_overrides_redirect_inputs() {
    let fx = fixture(&["03"]);
    let p = pipeline(&fx);
    let overrides = InputOverrides {
        kd_dir: Some(fx.root().join("elsewhere")),
        ..Default::default()
    };

    let failure = p
        .produce_tile("Oceania", month("03"), &overrides)
        .unwrap_err();
    assert_eq!(failure.stage, Stage::Align);
    assert!(matches!(failure.error, AlanError::MissingInput { .. }));
}

#[test]
fn test_region_outside_sources_is_grid_mismatch() {
    let fx = fixture(&["03"]);
    let failure = pipeline(&fx)
        .produce_tile("EuropeMed", month("03"), &InputOverrides::default())
        .unwrap_err();
    assert_eq!(failure.stage, Stage::Align);
    assert!(matches!(failure.error, AlanError::GridMismatch { .. }));
}

#[test]
fn test_source_no_data_is_undefined_without_gap_fill() {
    let fx = no_data_fixture();
    let mut config = config(&fx);
    config.resample.gap_fill_window = 0;
    let outcome = pipeline_with(&fx, config)
        .produce_tile("Oceania", month("03"), &InputOverrides::default())
        .unwrap();

    let values = z_thresh(&outcome);
    assert_eq!(values[10], FILL);
    assert_eq!(values[14], FILL);
    assert_relative_eq!(values[9], 4.60517, epsilon = 1e-4);
    assert_eq!(outcome.summary.undefined, 2);
}

#[test]
fn test_gap_fill_recovers_isolated_no_data() {
    let fx = no_data_fixture();
    let outcome = pipeline(&fx)
        .produce_tile("Oceania", month("03"), &InputOverrides::default())
        .unwrap();

    let values = z_thresh(&outcome);
    // Neighbours are uniform, so the filled cells match them
    assert_relative_eq!(values[10], 4.60517, epsilon = 1e-4);
    assert_relative_eq!(values[14], 4.60517, epsilon = 1e-4);
    assert_eq!(outcome.summary.undefined, 0);
    assert_eq!(outcome.summary.land, 1);
}

#[test]
fn test_radiance_floor_marks_dim_cells_undefined() {
    let fx = fixture(&["03"]);
    let mut config = config(&fx);
    config.attenuation.radiance_floor = Some(1.0);
    let outcome = pipeline_with(&fx, config)
        .produce_tile("Oceania", month("03"), &InputOverrides::default())
        .unwrap();

    // (0, 1) was zero depth; below the floor it has no usable radiance
    assert_eq!(z_thresh(&outcome)[1], FILL);
    assert_eq!(
        outcome.summary,
        DepthSummary {
            depth: 13,
            zero_depth: 0,
            undefined: 2,
            land: 1,
        }
    );
}

#[test]
fn test_three_band_effective_kd() {
    let fx = SourceFixture::new().unwrap();
    let spec = spec();
    let (blue, green, red) = (0.1f32, 0.2f32, 0.5f32);
    fx.write_kd(
        "03",
        &spec,
        &[
            ("kd_blue", vec![blue; 16].as_slice()),
            ("kd_green", vec![green; 16].as_slice()),
            ("kd_red", vec![red; 16].as_slice()),
        ],
    )
    .unwrap();
    fx.write_radiance(&spec, &[10.0f32; 16], None).unwrap();
    fx.write_landmask(&spec, &[WATER; 16]).unwrap();

    let mut config = config(&fx);
    config.attenuation.bands = vec![
        BandConfig::new("kd_blue", 0.5, 0.0),
        BandConfig::new("kd_green", 0.3, 0.0),
        BandConfig::new("kd_red", 0.2, 0.0),
    ];
    let outcome = pipeline_with(&fx, config)
        .produce_tile("Oceania", month("03"), &InputOverrides::default())
        .unwrap();

    // E = (5, 3, 2), I0 = 10
    let kd_eff = -(0.5 * (-(blue as f64)).exp()
        + 0.3 * (-(green as f64)).exp()
        + 0.2 * (-(red as f64)).exp())
    .ln();
    let expected = (10.0f64.ln() / kd_eff) as f32;

    let values = z_thresh(&outcome);
    assert_eq!(outcome.summary.depth, 16);
    for v in values {
        assert_relative_eq!(v, expected, max_relative = 1e-5);
    }
}

#[test]
fn test_filename_override_and_region_suffix() {
    let fx = fixture(&["03"]);
    let overrides = InputOverrides {
        filename: Some("oceania_march.nc".to_string()),
        ..Default::default()
    };
    let renamed = pipeline(&fx)
        .produce_tile("Oceania", month("03"), &overrides)
        .unwrap();
    assert_eq!(renamed.path, fx.output_dir.join("oceania_march.nc"));

    let mut config = config(&fx);
    config.output.region_suffix = false;
    let plain = pipeline_with(&fx, config)
        .produce_tile("Oceania", month("03"), &InputOverrides::default())
        .unwrap();
    assert_eq!(
        plain.path.file_name().unwrap().to_str().unwrap(),
        "In-water_clear-sky_ALAN_Zc_Month-03_-4S_0N_100W_104E.nc"
    );
}
