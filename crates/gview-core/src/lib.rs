//! # gview-core
//!
//! Core types shared across the grading pipeline:
//!
//! - [`PixelBuffer`] - flat f32 RGB image storage
//! - [`EnhanceSettings`] - tone/LUT grading parameters with clamped ranges
//! - [`Rotation`] - quarter-turn orientation
//!
//! # Usage
//!
//! ```rust
//! use gview_core::{PixelBuffer, EnhanceSettings};
//!
//! let img = PixelBuffer::new(64, 64);
//! let settings = EnhanceSettings::default().with_contrast(1.2);
//! assert!(settings.is_identity() == false);
//! ```

#![warn(missing_docs)]

mod error;
mod image;
mod settings;

pub use error::{CoreError, CoreResult};
pub use image::PixelBuffer;
pub use settings::{EnhanceSettings, Rotation};
