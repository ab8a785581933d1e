//! # filmlab-core
//!
//! Core types shared by every filmlab crate.
//!
//! - [`ImageBuffer`] - three-channel `f32` frame tagged with a [`ColorDomain`]
//! - [`Rect`] - pixel rectangles for crops and analysis regions
//! - [`ProcessMode`], [`Polarity`] - film process selection
//! - [`luminance_rec709`] and friends - per-pixel helpers
//!
//! ## Crate Structure
//!
//! ```text
//! filmlab-core (this crate)
//!    ^
//!    +-- filmlab-color   (sRGB, CIELAB, HSV)
//!    +-- filmlab-compute (neighborhood kernels, CPU backend)
//!    +-- filmlab-ops     (pipeline stages)
//!    +-- filmlab-io      (PNG adapter)
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod image;
pub mod mode;
pub mod pixel;
pub mod rect;

pub use error::{Error, Result};
pub use image::{CHANNELS, ColorDomain, ImageBuffer};
pub use mode::{Polarity, ProcessMode};
pub use pixel::{
    REC709_LUMA, REC709_LUMA_B, REC709_LUMA_G, REC709_LUMA_R, channel_mean, clamp01,
    luminance_rec709, smoothstep,
};
pub use rect::Rect;

/// Smallest magnitude used wherever a value would otherwise divide by zero
/// or be fed to a logarithm.
pub const EPSILON: f32 = 1e-6;
