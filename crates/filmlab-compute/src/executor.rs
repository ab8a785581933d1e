//! Kernel executor: backend selection plus dispatch.
//!
//! # Configuration
//!
//! ```rust
//! use filmlab_compute::{Backend, ExecutorBuilder};
//!
//! let exec = ExecutorBuilder::new()
//!     .backend(Backend::Cpu)
//!     .band_bytes(64 * 1024)
//!     .build()
//!     .unwrap();
//! assert_eq!(exec.backend_name(), "cpu");
//! ```

use tracing::debug;

use filmlab_core::{ColorDomain, ImageBuffer};

use crate::backend::{
    Backend, ComputeLimits, CpuBackend, KernelBackend, PixelKernel, PointKernel,
    select_best_backend,
};
use crate::{ComputeError, ComputeResult};

/// Executor configuration.
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    /// Requested backend.
    pub backend: Backend,
    /// Override output bytes per work item (None = backend default).
    pub band_bytes: Option<usize>,
    /// Override memory budget in bytes (None = detected).
    pub memory_limit: Option<u64>,
}

/// Runs kernels on the selected backend.
#[derive(Debug, Clone)]
pub struct Executor {
    backend: CpuBackend,
    config: ExecutorConfig,
}

impl Executor {
    /// Executor for a specific backend.
    pub fn new(backend: Backend) -> ComputeResult<Self> {
        ExecutorBuilder::new().backend(backend).build()
    }

    /// Executor on the best available backend.
    pub fn auto() -> ComputeResult<Self> {
        Self::new(Backend::Auto)
    }

    /// CPU executor; always available.
    pub fn cpu() -> Self {
        Self {
            backend: CpuBackend::new(),
            config: ExecutorConfig {
                backend: Backend::Cpu,
                ..ExecutorConfig::default()
            },
        }
    }

    /// Name of the backend that runs kernels.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Active configuration.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Backend limits.
    pub fn limits(&self) -> &ComputeLimits {
        self.backend.limits()
    }

    /// Runs `kernel` over every pixel of `src`.
    pub fn run<K: PixelKernel>(&self, src: &ImageBuffer, kernel: &K) -> ComputeResult<ImageBuffer> {
        self.backend.dispatch(src, kernel)
    }

    /// Runs a pure per-pixel function, tagging the output with `domain`.
    pub fn map<F>(&self, src: &ImageBuffer, name: &'static str, domain: ColorDomain, f: F) -> ComputeResult<ImageBuffer>
    where
        F: Fn([f32; 3]) -> [f32; 3] + Sync,
    {
        self.run(src, &PointKernel::new(name, f).with_domain(domain))
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::cpu()
    }
}

/// Builder for [`Executor`].
#[derive(Debug, Clone, Default)]
pub struct ExecutorBuilder {
    config: ExecutorConfig,
}

impl ExecutorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requested backend.
    pub fn backend(mut self, backend: Backend) -> Self {
        self.config.backend = backend;
        self
    }

    /// Output bytes per parallel work item.
    pub fn band_bytes(mut self, bytes: usize) -> Self {
        self.config.band_bytes = Some(bytes.max(1));
        self
    }

    /// Memory budget in bytes.
    pub fn memory_limit(mut self, bytes: u64) -> Self {
        self.config.memory_limit = Some(bytes);
        self
    }

    /// Resolves the backend and builds the executor.
    pub fn build(self) -> ComputeResult<Executor> {
        let resolved = match self.config.backend {
            Backend::Auto => select_best_backend(),
            other => other,
        };
        if !resolved.is_available() {
            return Err(ComputeError::BackendNotAvailable(resolved.name().to_string()));
        }

        let mut limits = ComputeLimits::detect();
        if let Some(bytes) = self.config.band_bytes {
            limits.band_bytes = bytes;
        }
        if let Some(bytes) = self.config.memory_limit {
            limits.available_memory = bytes;
        }
        debug!(backend = resolved.name(), memory = limits.available_memory, "executor ready");

        let backend = match resolved {
            Backend::Cpu | Backend::Auto => CpuBackend::with_limits(limits),
        };
        Ok(Executor {
            backend,
            config: self.config,
        })
    }
}
