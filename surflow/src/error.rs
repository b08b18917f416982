//! # Estimation errors

use thiserror::Error;

/// Errors produced by the flow estimation pipeline.
///
/// Ill-conditioned windows are not errors. Such cells silently resolve to zero motion.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    /// The two frames of a pair have different dimensions.
    #[error("frame dimensions differ: previous is {}x{}, current is {}x{}", previous.0, previous.1, current.0, current.1)]
    DimensionMismatch {
        previous: (usize, usize),
        current: (usize, usize),
    },
    /// The configuration can not describe a valid estimation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Pixel buffer does not match the declared frame geometry.
    #[error("invalid frame: expected {expected} bytes, got {actual}")]
    InvalidFrame { expected: usize, actual: usize },
}

/// Result type of the estimation pipeline.
pub type FlowResult<T> = std::result::Result<T, FlowError>;
