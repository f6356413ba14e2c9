//! Core error types.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Buffer length does not match dimensions.
    #[error("buffer size mismatch: expected {expected} floats, got {actual}")]
    BufferSizeMismatch {
        /// Expected element count.
        expected: usize,
        /// Actual element count.
        actual: usize,
    },

    /// Zero or otherwise unusable dimensions.
    #[error("invalid dimensions: {0}x{1}")]
    InvalidDimensions(u32, u32),
}
