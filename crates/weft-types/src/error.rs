//! Error types for the weft collision core.
//!
//! All crates return `WeftResult<T>` from fallible operations.

use thiserror::Error;

/// Unified error type for the weft collision core.
#[derive(Debug, Error)]
pub enum WeftError {
    /// Mesh data is malformed or inconsistent.
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// Configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A caller broke an API contract (out-of-range id, all-fixed impulse, ...).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The collision could not be characterized (zero-length normal after every fallback).
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// A collision record was read before a successful analysis.
    #[error("Collision has not been analysed")]
    NotAnalysed,

    /// A collision record was analysed a second time.
    #[error("Collision has already been analysed")]
    AlreadyAnalysed,

    /// Serialization/deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias for `Result<T, WeftError>`.
pub type WeftResult<T> = Result<T, WeftError>;
