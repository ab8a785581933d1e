//! # filmlab-color
//!
//! Color conversions used by lab refinement and the I/O adapters.
//!
//! - [`srgb`] - sRGB transfer function
//! - [`lab`] - linear RGB <-> XYZ <-> CIELAB (D65)
//! - [`hsv`] - HSV for global saturation
//! - [`matrix`] - row-major 3x3 helpers over [`glam::Mat3`]
//!
//! All functions work on plain `[f32; 3]` triples so they can be called from
//! per-pixel kernels without conversion overhead.

pub mod hsv;
pub mod lab;
pub mod matrix;
pub mod srgb;

pub use glam::Mat3;
