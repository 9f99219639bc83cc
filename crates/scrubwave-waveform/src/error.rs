//! Waveform rendering error types

use thiserror::Error;

/// Waveform-related errors
#[derive(Error, Debug)]
pub enum WaveformError {
    /// Empty series or zero-sized image
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// PNG encoder rejected the image
    #[error("PNG encoding failed: {0}")]
    Encoding(#[from] png::EncodingError),
}
