//! # gview-compute
//!
//! Grading execution backends for the pipeline:
//!
//! - [`grade`] - pure per-pixel grade math (the reference semantics)
//! - [`backend`] - CPU (rayon) and optional wgpu backends behind a common trait
//! - [`Dispatcher`] - backend selection policy with transparent CPU fallback
//! - [`geometry`] - rotate/flip/resize primitives
//!
//! The CPU path is the numerical reference; the GPU path implements the
//! same math and must agree within 1/255 per channel.
//!
//! # Usage
//!
//! ```rust
//! use gview_compute::{Backend, Dispatcher};
//! use gview_core::{EnhanceSettings, PixelBuffer};
//!
//! let dispatcher = Dispatcher::new(Backend::Auto);
//! let img = PixelBuffer::filled(8, 8, [0.5, 0.5, 0.5]);
//! let settings = EnhanceSettings::default().with_contrast(1.2);
//! let out = dispatcher.grade(&img, &settings, None).unwrap();
//! assert_eq!(out.dimensions(), (8, 8));
//! ```

#![warn(missing_docs)]

use thiserror::Error;

pub mod backend;
mod dispatch;
pub mod geometry;
pub mod grade;
#[cfg(feature = "wgpu")]
pub mod shaders;

pub use backend::{Backend, BackendInfo, GradeBackend, detect_backends, select_best_backend};
pub use dispatch::{Dispatcher, GPU_PIXEL_THRESHOLD};

/// Result type for compute operations.
pub type ComputeResult<T> = Result<T, ComputeError>;

/// Errors that can occur during compute operations.
#[derive(Debug, Error)]
pub enum ComputeError {
    /// No suitable GPU adapter found.
    #[error("no suitable GPU adapter found")]
    NoAdapter,

    /// Device creation failed.
    #[error("device creation failed: {0}")]
    DeviceCreation(String),

    /// Buffer size does not match expectations.
    #[error("buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch {
        /// Expected element count.
        expected: usize,
        /// Actual element count.
        actual: usize,
    },

    /// Zero or otherwise unusable dimensions.
    #[error("invalid image dimensions")]
    InvalidDimensions,

    /// Generic operation failure.
    #[error("operation failed: {0}")]
    OperationFailed(String),
}

impl From<gview_core::CoreError> for ComputeError {
    fn from(e: gview_core::CoreError) -> Self {
        match e {
            gview_core::CoreError::BufferSizeMismatch { expected, actual } => {
                ComputeError::BufferSizeMismatch { expected, actual }
            }
            gview_core::CoreError::InvalidDimensions(..) => ComputeError::InvalidDimensions,
        }
    }
}
