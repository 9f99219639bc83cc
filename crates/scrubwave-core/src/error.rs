//! Core error types

use thiserror::Error;

/// Errors raised while building core values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Caller passed a value outside the accepted domain
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Color string is not `#RRGGBB`
    #[error("Invalid color {0:?}, expected #RRGGBB")]
    InvalidColor(String),
}
