//! Backend-agnostic compute layer for per-pixel film kernels.
//!
//! Every per-pixel stage of the pipeline is written once as a
//! [`PixelKernel`]: a function of a pixel's [`Neighborhood`] with a declared
//! read radius. A backend decides how the grid is dispatched; the math never
//! changes between backends.
//!
//! # Architecture
//!
//! ```text
//! Executor (unified API)
//!     └── Backend (Auto or CPU)
//!             └── KernelBackend trait
//!                     └── CpuBackend (rayon row bands)
//! ```
//!
//! # Example
//!
//! ```rust
//! use filmlab_compute::{Executor, PointKernel};
//! use filmlab_core::{ColorDomain, ImageBuffer};
//!
//! let exec = Executor::cpu();
//! let img = ImageBuffer::filled(8, 8, ColorDomain::LinearTransmittance, [0.25; 3]);
//! let doubled = exec
//!     .run(&img, &PointKernel::new("double", |rgb| rgb.map(|v| v * 2.0)))
//!     .unwrap();
//! assert_eq!(doubled.pixel(3, 3), [0.5; 3]);
//! ```

pub mod backend;
pub mod executor;

pub use backend::{
    Backend, BackendInfo, ComputeLimits, CpuBackend, KernelBackend, Neighborhood, PixelKernel,
    PointKernel, describe_backends, detect_backends, select_best_backend,
};
pub use executor::{Executor, ExecutorBuilder, ExecutorConfig};

use thiserror::Error;

/// Compute dispatch errors
#[derive(Error, Debug)]
pub enum ComputeError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("Image too large: {width}x{height} needs {required} bytes, {available} available")]
    ImageTooLarge {
        width: usize,
        height: usize,
        required: u64,
        available: u64,
    },

    #[error("Invalid dimensions: {0}x{1}")]
    InvalidDimensions(usize, usize),

    #[error(transparent)]
    Core(#[from] filmlab_core::Error),
}

pub type ComputeResult<T> = Result<T, ComputeError>;
