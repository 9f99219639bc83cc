//! scrubwave-core - shared types for waveform generation
//!
//! Time-point planning, the loudness data model, and the fixed two-tier
//! compression applied before rendering.

pub mod color;
pub mod compressor;
pub mod error;
pub mod planner;
pub mod types;

pub use color::Rgb;
pub use compressor::DynamicRangeCompressor;
pub use error::CoreError;
pub use planner::{TimePointPlanner, MAX_SAMPLE_COUNT};
pub use types::*;
