//! # filmlab-io
//!
//! File adapter for the filmlab pipeline. Decoding camera raw files and
//! encoding deliverables (JPEG, TIFF, ICC) belong to other tools; this crate
//! only moves RGB PNGs in and out of [`ImageBuffer`](filmlab_core::ImageBuffer).
//!
//! - [`png::read`] - scan to linear transmittance
//! - [`png::write`] - print to 8 or 16 bit RGB

#![warn(missing_docs)]

mod error;
pub mod png;

pub use error::{IoError, IoResult};
pub use png::BitDepth;
