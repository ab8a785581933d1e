//! Error types for pipeline operations.

use thiserror::Error;

/// Error type for pipeline operations.
#[derive(Error, Debug)]
pub enum OpsError {
    /// Images have incompatible sizes.
    #[error("size mismatch: {0}")]
    SizeMismatch(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Roll analysis was given no frames.
    #[error("roll contains no frames")]
    EmptyRoll,

    /// Buffer contract violation.
    #[error(transparent)]
    Core(#[from] filmlab_core::Error),

    /// Kernel dispatch failure.
    #[error(transparent)]
    Compute(#[from] filmlab_compute::ComputeError),

    /// Settings or roll document could not be parsed or written.
    #[error("settings: {0}")]
    Settings(#[from] serde_yaml::Error),

    /// Settings file could not be read.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pipeline operations.
pub type OpsResult<T> = Result<T, OpsError>;
