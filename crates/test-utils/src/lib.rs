//! Shared test utilities for the ALAN atlas workspace.
//!
//! Small synthetic Kd NetCDF, radiance GeoTIFF and landmask Zarr sources,
//! laid out in a temporary directory the way the pipeline expects them.
//!
//! ```ignore
//! use test_utils::{GridSpec, SourceFixture};
//!
//! let spec = GridSpec::new(-4.0, 0.0, 100.0, 104.0, 1.0);
//! let fixture = SourceFixture::new()?;
//! fixture.write_kd("03", &spec, &[("Kd_490", &kd)])?;
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::*;
pub use generators::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_layout() {
        let fixture = SourceFixture::new().unwrap();
        assert!(fixture.kd_dir.is_dir());
        assert!(fixture.output_dir.is_dir());
        assert_eq!(
            fixture.kd_path("03").file_name().unwrap(),
            "kd_03.nc"
        );
        assert!(fixture.root().exists());
    }
}
