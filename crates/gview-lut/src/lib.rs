//! # gview-lut
//!
//! 3D Look-Up Table support for the grading pipeline.
//!
//! - [`Lut3d`] - flat-storage RGB cube with trilinear sampling
//! - [`cube`] - Adobe/Resolve `.cube` text format parsing
//! - [`LutStore`] - folder-scoped collection of named LUTs
//!
//! # Storage order
//!
//! LUT entries are kept in `.cube` file order: the flat index of grid
//! point `(r, g, b)` is `r + g*N + b*N*N` (red varies fastest). The CPU
//! sampler and the GPU kernel both use this formula, so the buffer can be
//! handed to either path without reordering.
//!
//! # Usage
//!
//! ```rust
//! use gview_lut::Lut3d;
//!
//! let lut = Lut3d::identity(17);
//! let out = lut.sample([0.5, 0.3, 0.2]);
//! assert!((out[0] - 0.5).abs() < 1e-6);
//! ```

#![warn(missing_docs)]

pub mod cube;
mod error;
mod lut3d;
mod store;

pub use error::{ParseError, ParseResult};
pub use lut3d::Lut3d;
pub use store::LutStore;
