//! Waveform rendering for scrubwave
//!
//! Turns a loudness series into a bar-graph raster image and encodes it as an
//! 8-bit RGBA PNG suitable for serving straight to a browser.

pub mod error;
pub mod rasterizer;

pub use error::WaveformError;
pub use rasterizer::{RasterImage, WaveformRasterizer, WaveformVariant, MAX_IMAGE_DIMENSION};
