//! Waveform pipeline for scrubwave
//!
//! Ties planning, loudness sampling, compression and rasterization into one
//! run per job, and writes the resulting artifacts.

pub mod backend;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod job;
pub mod sink;

pub use backend::BackendAnalyzer;
pub use config::{AnalyzerBackend, PipelineConfig};
pub use coordinator::{PipelineCoordinator, PipelineStage, WaveformArtifactSet};
pub use error::{ErrorKind, PipelineError};
pub use job::{ImageSpec, ResolvedJob, WaveformJob};
pub use sink::{read_series, ArtifactManifest, ArtifactSink, DirectorySink};
