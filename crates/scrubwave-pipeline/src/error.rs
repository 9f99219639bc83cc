//! Pipeline error taxonomy

use std::time::Duration;

use scrubwave_core::CoreError;
use scrubwave_loudness::LoudnessError;
use scrubwave_waveform::WaveformError;
use thiserror::Error;

/// Failure category, used for retry decisions and exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    Fetch,
    Decode,
    AnalysisTimeout,
    Persist,
    Render,
}

/// Pipeline-level errors
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Bad job, configuration or series
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Audio source could not be opened or read
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Audio could not be decoded
    #[error("Decode failed: {0}")]
    Decode(String),

    /// Sampling exceeded its wall-clock budget
    #[error("Analysis timed out after {0:?}")]
    AnalysisTimeout(Duration),

    /// Artifacts could not be written
    #[error("Failed to persist artifacts: {0}")]
    Persist(String),

    /// Image encoding failed
    #[error("Rendering failed: {0}")]
    Render(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            PipelineError::Fetch(_) => ErrorKind::Fetch,
            PipelineError::Decode(_) => ErrorKind::Decode,
            PipelineError::AnalysisTimeout(_) => ErrorKind::AnalysisTimeout,
            PipelineError::Persist(_) => ErrorKind::Persist,
            PipelineError::Render(_) => ErrorKind::Render,
        }
    }

    /// Whether running the same job again may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Fetch | ErrorKind::AnalysisTimeout | ErrorKind::Persist
        )
    }
}

impl From<CoreError> for PipelineError {
    fn from(err: CoreError) -> Self {
        PipelineError::InvalidArgument(err.to_string())
    }
}

impl From<LoudnessError> for PipelineError {
    fn from(err: LoudnessError) -> Self {
        match err {
            LoudnessError::Timeout(budget) => PipelineError::AnalysisTimeout(budget),
            LoudnessError::FetchFailed(_) | LoudnessError::HttpStatus { .. } => {
                PipelineError::Fetch(err.to_string())
            }
            LoudnessError::DecodeFailed(_) | LoudnessError::AnalyzerUnavailable(_) => {
                PipelineError::Decode(err.to_string())
            }
        }
    }
}

impl From<WaveformError> for PipelineError {
    fn from(err: WaveformError) -> Self {
        match err {
            WaveformError::InvalidArgument(msg) => PipelineError::InvalidArgument(msg),
            WaveformError::Encoding(e) => PipelineError::Render(e.to_string()),
        }
    }
}

impl From<config::ConfigError> for PipelineError {
    fn from(err: config::ConfigError) -> Self {
        PipelineError::InvalidArgument(format!("configuration: {}", err))
    }
}
