//! Loudness sampling error types

use std::time::Duration;

use thiserror::Error;

/// Loudness-related errors
#[derive(Error, Debug)]
pub enum LoudnessError {
    /// Audio source could not be opened or read
    #[error("Failed to fetch audio: {0}")]
    FetchFailed(String),

    /// Remote server answered with a non-success status
    #[error("Failed to fetch {url}: HTTP {status}")]
    HttpStatus { status: u16, url: String },

    /// Audio could not be decoded
    #[error("Failed to decode audio: {0}")]
    DecodeFailed(String),

    /// External analyzer could not be started
    #[error("Audio analyzer unavailable: {0}")]
    AnalyzerUnavailable(String),

    /// Analysis exceeded its wall-clock budget
    #[error("Loudness analysis timed out after {0:?}")]
    Timeout(Duration),
}

impl LoudnessError {
    /// True for errors caused by the audio source rather than its content
    pub fn is_fetch(&self) -> bool {
        matches!(self, LoudnessError::FetchFailed(_) | LoudnessError::HttpStatus { .. })
    }
}

impl From<reqwest::Error> for LoudnessError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LoudnessError::FetchFailed(format!("request timed out: {}", err))
        } else if err.is_connect() {
            LoudnessError::FetchFailed(format!("connection failed: {}", err))
        } else {
            LoudnessError::FetchFailed(err.to_string())
        }
    }
}
