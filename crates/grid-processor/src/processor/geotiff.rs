//! GeoTIFF radiance raster with strip/tile windowed reads.
//!
//! The atlas radiance map is a single global float raster far too large to
//! decode whole, so only the TIFF chunks (strips or tiles) intersecting a
//! window are decoded.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use alan_common::BoundingBox;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tracing::debug;

use super::WindowSource;
use crate::error::{GridProcessorError, Result};
use crate::types::{Axis, SourceGrid};

/// GeoTIFF ModelTiepointTag.
const TAG_MODEL_TIEPOINT: u16 = 33922;
/// GeoTIFF ModelPixelScaleTag.
const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
/// GDAL_NODATA, stored as ASCII.
const TAG_GDAL_NODATA: u16 = 42113;

/// Georeferencing and layout of a single-band geographic GeoTIFF.
#[derive(Debug, Clone)]
pub struct GeoTiffRaster {
    path: PathBuf,
    width: u32,
    height: u32,
    /// Longitude of the west edge of column 0.
    west: f64,
    /// Latitude of the north edge of row 0.
    north: f64,
    /// Degrees per pixel (lon, lat).
    scale: (f64, f64),
    nodata: Option<f32>,
}

impl GeoTiffRaster {
    /// Open a raster and read its georeferencing.
    ///
    /// `nodata_override` takes precedence over the file's GDAL_NODATA tag.
    pub fn open<P: AsRef<Path>>(path: P, nodata_override: Option<f32>) -> Result<Self> {
        let path = path.as_ref();
        let mut decoder = open_decoder(path)?;
        let (width, height) = decoder.dimensions()?;

        let samples = decoder
            .find_tag_unsigned::<u16>(Tag::SamplesPerPixel)?
            .unwrap_or(1);
        if samples != 1 {
            return Err(GridProcessorError::invalid_metadata(format!(
                "{} has {} samples per pixel; only single-band rasters are supported",
                path.display(),
                samples
            )));
        }

        let tiepoint = decoder
            .get_tag_f64_vec(Tag::Unknown(TAG_MODEL_TIEPOINT))
            .map_err(|_| {
                GridProcessorError::invalid_metadata(format!(
                    "{} has no ModelTiepoint tag",
                    path.display()
                ))
            })?;
        let scale = decoder
            .get_tag_f64_vec(Tag::Unknown(TAG_MODEL_PIXEL_SCALE))
            .map_err(|_| {
                GridProcessorError::invalid_metadata(format!(
                    "{} has no ModelPixelScale tag",
                    path.display()
                ))
            })?;
        if tiepoint.len() < 6 || scale.len() < 2 || scale[0] <= 0.0 || scale[1] <= 0.0 {
            return Err(GridProcessorError::invalid_metadata(format!(
                "{} has malformed georeferencing tags",
                path.display()
            )));
        }

        // Tiepoint format: [i, j, k, x, y, z], raster (i, j) maps to (x, y)
        let (scale_x, scale_y) = (scale[0], scale[1]);
        let west = tiepoint[3] - tiepoint[0] * scale_x;
        let north = tiepoint[4] + tiepoint[1] * scale_y;

        let nodata = nodata_override.or_else(|| {
            decoder
                .get_tag_ascii_string(Tag::Unknown(TAG_GDAL_NODATA))
                .ok()
                .and_then(|s| s.trim_matches(char::from(0)).trim().parse().ok())
        });

        debug!(
            path = %path.display(),
            width,
            height,
            west,
            north,
            scale_x,
            scale_y,
            nodata = ?nodata,
            "Opened GeoTIFF raster"
        );

        Ok(Self {
            path: path.to_path_buf(),
            width,
            height,
            west,
            north,
            scale: (scale_x, scale_y),
            nodata,
        })
    }

    /// Dimensions in pixels (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn nodata(&self) -> Option<f32> {
        self.nodata
    }

    /// Pixel index range `[start, end)` of cells overlapping `[lo, hi]` along
    /// one axis whose pixel 0 starts at `origin` and advances by `step`.
    fn pixel_range(origin: f64, step: f64, lo: f64, hi: f64, count: u32) -> (u32, u32) {
        let start = ((lo - origin) / step).floor().max(0.0);
        let end = ((hi - origin) / step).ceil().min(count as f64);
        if end <= start {
            return (0, 0);
        }
        (start as u32, end as u32)
    }
}

impl WindowSource<f32> for GeoTiffRaster {
    fn read_window(&self, bbox: &BoundingBox) -> Result<SourceGrid<f32>> {
        let (sx, sy) = self.scale;
        let (c0, c1) = Self::pixel_range(self.west, sx, bbox.min_lon, bbox.max_lon, self.width);
        // Rows advance southwards.
        let (r0, r1) = Self::pixel_range(-self.north, sy, -bbox.max_lat, -bbox.min_lat, self.height);
        if c0 == c1 || r0 == r1 {
            return Err(GridProcessorError::out_of_bounds(
                format!("{:?}", bbox),
                format!("{:?}", self.coverage()),
            ));
        }

        let out_w = (c1 - c0) as usize;
        let out_h = (r1 - r0) as usize;
        let mut output = vec![f32::NAN; out_w * out_h];

        let mut decoder = open_decoder(&self.path)?;
        let (chunk_w, chunk_h) = decoder.chunk_dimensions();
        if chunk_w == 0 || chunk_h == 0 {
            return Err(GridProcessorError::invalid_metadata("TIFF reports empty chunks"));
        }
        let chunks_across = self.width.div_ceil(chunk_w);

        for chunk_row in (r0 / chunk_h)..=((r1 - 1) / chunk_h) {
            for chunk_col in (c0 / chunk_w)..=((c1 - 1) / chunk_w) {
                let index = chunk_row * chunks_across + chunk_col;
                let (data_w, data_h) = decoder.chunk_data_dimensions(index);
                if data_w == 0 || data_h == 0 {
                    continue;
                }
                let chunk = decoding_to_f32(decoder.read_chunk(index)?);
                // Chunks may be padded to the full tile size.
                let stride = if chunk.len() >= (chunk_w * data_h) as usize && data_w < chunk_w {
                    chunk_w as usize
                } else {
                    data_w as usize
                };
                if chunk.len() < stride * (data_h as usize - 1) + data_w as usize {
                    return Err(GridProcessorError::read_failed(format!(
                        "chunk {} of {} is shorter than its declared size",
                        index,
                        self.path.display()
                    )));
                }

                let chunk_r0 = chunk_row * chunk_h;
                let chunk_c0 = chunk_col * chunk_w;
                let rows = r0.max(chunk_r0)..r1.min(chunk_r0 + data_h);
                let cols = c0.max(chunk_c0)..c1.min(chunk_c0 + data_w);

                for r in rows {
                    let src_row = (r - chunk_r0) as usize * stride;
                    let dst_row = (r - r0) as usize * out_w;
                    for c in cols.clone() {
                        output[dst_row + (c - c0) as usize] = chunk[src_row + (c - chunk_c0) as usize];
                    }
                }
            }
        }

        let nodata = self.nodata;
        for v in output.iter_mut() {
            if !v.is_finite() || Some(*v) == nodata {
                *v = f32::NAN;
            }
        }

        let lats = Axis::new(
            (r0..r1)
                .map(|r| self.north - (r as f64 + 0.5) * sy)
                .collect(),
        )?;
        let lons = Axis::new(
            (c0..c1)
                .map(|c| self.west + (c as f64 + 0.5) * sx)
                .collect(),
        )?;

        debug!(
            path = %self.path.display(),
            rows = out_h,
            cols = out_w,
            "Read GeoTIFF window"
        );

        SourceGrid::new(lats, lons, output)
    }

    fn coverage(&self) -> BoundingBox {
        BoundingBox::new(
            self.west,
            self.north - self.height as f64 * self.scale.1,
            self.west + self.width as f64 * self.scale.0,
            self.north,
        )
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>> {
    if !path.exists() {
        return Err(GridProcessorError::not_found(path.display().to_string()));
    }
    let file = File::open(path)?;
    let decoder = Decoder::new(BufReader::new(file)).map_err(|e| {
        GridProcessorError::open_failed(format!("{} is not a readable TIFF: {}", path.display(), e))
    })?;

    // Global radiance rasters exceed the default decoding limits.
    let mut limits = Limits::default();
    limits.decoding_buffer_size = 1024 * 1024 * 1024;
    limits.intermediate_buffer_size = 1024 * 1024 * 1024;
    limits.ifd_value_size = 1024 * 1024 * 1024;
    Ok(decoder.with_limits(limits))
}

fn decoding_to_f32(result: DecodingResult) -> Vec<f32> {
    match result {
        DecodingResult::F32(data) => data,
        DecodingResult::F64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I16(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U16(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U8(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I8(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I64(data) => data.into_iter().map(|v| v as f32).collect(),
    }
}
