//! Error types for filmlab-core operations.
//!
//! Core errors are contract violations: a buffer whose length does not match
//! its dimensions, a region that leaves the frame, or a stage handed a buffer
//! in the wrong color domain. Numeric degeneracies (zero spread, zero pivot,
//! log of zero) are never errors anywhere in filmlab; they are resolved by
//! epsilon substitution at the point of use.
//!
//! # Usage
//!
//! ```rust
//! use filmlab_core::{Error, Result};
//!
//! fn check(width: usize, height: usize) -> Result<()> {
//!     if width == 0 || height == 0 {
//!         return Err(Error::invalid_dimensions(width, height, "empty frame"));
//!     }
//!     Ok(())
//! }
//! assert!(check(0, 10).is_err());
//! ```

use thiserror::Error;

use crate::image::ColorDomain;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by core buffer and region operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Width or height is zero, or the pixel count overflows.
    #[error("invalid dimensions: {width}x{height} ({reason})")]
    InvalidDimensions {
        /// Requested width
        width: usize,
        /// Requested height
        height: usize,
        /// Reason why dimensions are invalid
        reason: String,
    },

    /// Sample vector length does not match `width * height * 3`.
    #[error("buffer size mismatch: expected {expected} samples, got {actual}")]
    BufferSize {
        /// Expected sample count
        expected: usize,
        /// Actual sample count
        actual: usize,
    },

    /// Region of interest extends beyond image bounds.
    #[error("region ({rx}, {ry}, {rw}x{rh}) exceeds image bounds {width}x{height}")]
    InvalidRegion {
        /// Region X origin
        rx: usize,
        /// Region Y origin
        ry: usize,
        /// Region width
        rw: usize,
        /// Region height
        rh: usize,
        /// Image width
        width: usize,
        /// Image height
        height: usize,
    },

    /// A stage received samples in a color domain it does not accept.
    #[error("color domain mismatch: expected {expected}, got {actual}")]
    DomainMismatch {
        /// Domain the stage requires
        expected: ColorDomain,
        /// Domain the buffer is tagged with
        actual: ColorDomain,
    },

    /// A textual value (mode name, ratio) could not be parsed.
    #[error("cannot parse {what} from '{value}'")]
    Parse {
        /// What was being parsed
        what: &'static str,
        /// Offending input
        value: String,
    },
}

impl Error {
    /// Creates an [`Error::InvalidDimensions`] error.
    #[inline]
    pub fn invalid_dimensions(width: usize, height: usize, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::InvalidRegion`] error.
    #[inline]
    pub fn invalid_region(rx: usize, ry: usize, rw: usize, rh: usize, width: usize, height: usize) -> Self {
        Self::InvalidRegion {
            rx,
            ry,
            rw,
            rh,
            width,
            height,
        }
    }

    /// Creates an [`Error::DomainMismatch`] error.
    #[inline]
    pub fn domain_mismatch(expected: ColorDomain, actual: ColorDomain) -> Self {
        Self::DomainMismatch { expected, actual }
    }

    /// Creates an [`Error::Parse`] error.
    #[inline]
    pub fn parse(what: &'static str, value: impl Into<String>) -> Self {
        Self::Parse {
            what,
            value: value.into(),
        }
    }
}
