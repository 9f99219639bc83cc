//! Bar-graph rasterizer

use scrubwave_core::{LoudnessSeries, Rgb};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::WaveformError;

/// Minimum bar height in pixels, so silent points still show up
const MIN_BAR_HEIGHT: i64 = 2;

/// Bytes per RGBA pixel
const CHANNELS: usize = 4;

/// Largest accepted image width or height in pixels
pub const MAX_IMAGE_DIMENSION: u32 = 16_384;

/// Which of the two rendered color variants an image is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveformVariant {
    /// Accent-colored bars (the "played" overlay)
    Primary,
    /// Neutral dark bars (the unplayed track background)
    Secondary,
}

impl WaveformVariant {
    /// Artifact file name for this variant
    pub fn file_name(&self) -> &'static str {
        match self {
            WaveformVariant::Primary => "waveform_primary.png",
            WaveformVariant::Secondary => "waveform_secondary.png",
        }
    }
}

impl std::fmt::Display for WaveformVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaveformVariant::Primary => write!(f, "primary"),
            WaveformVariant::Secondary => write!(f, "secondary"),
        }
    }
}

/// Uncompressed RGBA image, row-major, top row first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RasterImage {
    /// RGBA value at `(x, y)`
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }

    /// Encode as a non-interlaced 8-bit RGBA PNG
    pub fn encode_png(&self) -> Result<Vec<u8>, WaveformError> {
        let mut png_data = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut png_data, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&self.pixels)?;
            writer.finish()?;
        }

        debug!(
            "Encoded {}x{} waveform PNG ({} bytes)",
            self.width,
            self.height,
            png_data.len()
        );
        Ok(png_data)
    }
}

/// Draws one vertical, vertically centered bar per loudness sample
pub struct WaveformRasterizer;

impl WaveformRasterizer {
    /// Render `series` into a `width` x `height` image with `color` bars on a
    /// transparent background
    pub fn rasterize(
        series: &LoudnessSeries,
        width: u32,
        height: u32,
        color: Rgb,
    ) -> Result<RasterImage, WaveformError> {
        if series.is_empty() {
            return Err(WaveformError::InvalidArgument(
                "cannot rasterize an empty loudness series".to_string(),
            ));
        }

        if width == 0 || height == 0 {
            return Err(WaveformError::InvalidArgument(format!(
                "image dimensions must be positive, got {}x{}",
                width, height
            )));
        }

        if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
            return Err(WaveformError::InvalidArgument(format!(
                "image dimensions {}x{} exceed the maximum of {}",
                width, height, MAX_IMAGE_DIMENSION
            )));
        }

        let row_stride = (width as usize)
            .checked_mul(CHANNELS)
            .ok_or_else(|| WaveformError::InvalidArgument(format!("image width {} is too large", width)))?;
        let buffer_len = row_stride.checked_mul(height as usize).ok_or_else(|| {
            WaveformError::InvalidArgument(format!("image {}x{} is too large", width, height))
        })?;
        let mut pixels = vec![0u8; buffer_len];
        let foreground = [color.r, color.g, color.b, u8::MAX];

        let bar_width = width as usize / series.len();
        let image_height = height as i64;

        for (index, sample) in series.iter().enumerate() {
            let bar_height = ((sample.level * height as f64).floor() as i64).max(MIN_BAR_HEIGHT);
            let top = (image_height - bar_height).div_euclid(2);

            let x_start = index * bar_width;
            let x_end = (x_start + bar_width).min(width as usize);
            let y_start = top.max(0) as usize;
            let y_end = (top + bar_height).min(image_height) as usize;

            for y in y_start..y_end {
                let row = y * row_stride;
                for x in x_start..x_end {
                    let idx = row + x * CHANNELS;
                    pixels[idx..idx + CHANNELS].copy_from_slice(&foreground);
                }
            }
        }

        debug!(
            "Rasterized {} bars ({}px wide) into {}x{} image with {}",
            series.len(),
            bar_width,
            width,
            height,
            color
        );

        Ok(RasterImage {
            width,
            height,
            pixels,
        })
    }
}
