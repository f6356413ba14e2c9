//! # gview-view
//!
//! Viewer-side pipeline pieces:
//!
//! - [`cache`] - two-tier LRU render cache (geometry-only and fully-enhanced)
//! - [`annotations`] - canonical-space annotation lines with exact
//!   display/canonical mapping
//! - [`viewport`] - fit/zoom/pan composition and line rasterization
//! - [`orchestrator`] - synchronous preview + cancellable async finalize
//! - [`Viewer`] - facade tying the pipeline together
//!
//! # Usage
//!
//! ```rust
//! use gview_view::Viewer;
//! use gview_core::{EnhanceSettings, PixelBuffer};
//!
//! let mut viewer = Viewer::new(400, 300);
//! viewer.load_image(PixelBuffer::filled(64, 64, [0.5, 0.5, 0.5]));
//! viewer.set_settings(EnhanceSettings::default().with_contrast(1.2)).unwrap();
//! let preview = viewer.request_render().unwrap();
//! assert_eq!(preview.generation, 1);
//! ```

#![warn(missing_docs)]

use thiserror::Error;

pub mod annotations;
pub mod cache;
pub mod orchestrator;
mod viewer;
pub mod viewport;

pub use viewer::Viewer;

/// Result type for viewer operations.
pub type ViewResult<T> = Result<T, ViewError>;

/// Errors surfaced by the viewer pipeline.
#[derive(Debug, Error)]
pub enum ViewError {
    /// No image loaded.
    #[error("no image loaded")]
    NoImage,

    /// Settings reference a LUT the store does not have.
    #[error("unknown LUT: {0}")]
    UnknownLut(String),

    /// Compute backend failure.
    #[error(transparent)]
    Compute(#[from] gview_compute::ComputeError),

    /// LUT loading failure.
    #[error(transparent)]
    Lut(#[from] gview_lut::ParseError),
}
