//! Compute backends for per-pixel kernels.
//!
//! # Architecture
//!
//! ```text
//! KernelBackend
//!     +-- CpuBackend (rayon row bands)
//! ```
//!
//! Kernels are written against [`PixelKernel`] and never know which backend
//! runs them.

mod cpu_backend;
mod detect;
mod kernel;
mod limits;

pub use cpu_backend::CpuBackend;
pub use detect::{BackendInfo, describe_backends, detect_backends, select_best_backend};
pub use kernel::{Neighborhood, PixelKernel, PointKernel};
pub use limits::ComputeLimits;

use filmlab_core::ImageBuffer;

use crate::ComputeResult;

/// Available compute backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Auto-select best available.
    #[default]
    Auto,
    /// CPU backend using rayon for parallelization.
    Cpu,
}

impl Backend {
    /// Check if this backend is available on current system.
    pub fn is_available(&self) -> bool {
        match self {
            Self::Auto => true,
            Self::Cpu => true,
        }
    }

    /// Get human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Cpu => "cpu",
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = crate::ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            other => Err(crate::ComputeError::BackendNotAvailable(other.to_string())),
        }
    }
}

/// A device able to run [`PixelKernel`]s over an [`ImageBuffer`].
pub trait KernelBackend: Send + Sync {
    /// Backend name.
    fn name(&self) -> &'static str;

    /// Resource limits used for dispatch sizing.
    fn limits(&self) -> &ComputeLimits;

    /// Runs `kernel` once per pixel of `src`, producing a new buffer of the
    /// same size.
    fn dispatch<K: PixelKernel>(&self, src: &ImageBuffer, kernel: &K) -> ComputeResult<ImageBuffer>;
}
