//! Error types for the OMP core.

/// Core error type for OMP server infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum OmpError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience result type for OMP operations.
pub type OmpResult<T> = Result<T, OmpError>;
