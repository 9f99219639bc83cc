//! Loudness sampling for scrubwave
//!
//! Streams an audio source exactly once through a bounded channel into an
//! analyzer that measures mean power in a one-second window around each
//! planned time point. Two analyzers are provided: an in-process symphonia
//! decoder and an external ffmpeg process.

pub mod analyzer;
pub mod decoder;
pub mod error;
pub mod ffmpeg;
pub mod sampler;
pub mod source;
pub mod stream;
pub mod window;

pub use analyzer::{db_to_level, AudioAnalyzer};
pub use decoder::SymphoniaAnalyzer;
pub use error::LoudnessError;
pub use ffmpeg::FfmpegAnalyzer;
pub use sampler::{LoudnessSampler, SamplerOptions, DEFAULT_LEVEL};
pub use source::{AudioFetcher, AudioSource};
pub use stream::{AudioStream, StreamHint};
pub use window::{AnalysisWindow, WindowAccumulator};
