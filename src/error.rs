//! Error taxonomy for paisaje.
//!
//! Every failure is fatal for a single-run diagnostic tool: errors propagate
//! uncaught to `main` and terminate the process with a diagnostic message.

use thiserror::Error;

/// All errors produced by paisaje.
#[derive(Debug, Error)]
pub enum PaisajeError {
    /// Checkpoint file does not exist.
    #[error("checkpoint not found: {0}")]
    CheckpointNotFound(String),

    /// Checkpoint exists but its tensors do not match the architecture.
    #[error("failed to load checkpoint {path}: {reason}")]
    CheckpointLoad {
        /// Path of the offending checkpoint.
        path: String,
        /// What went wrong (missing tensor, shape mismatch, parse failure).
        reason: String,
    },

    /// The two source models do not share parameter names/shapes.
    #[error("model structure mismatch: {reason}")]
    StructureMismatch {
        /// First detected disagreement.
        reason: String,
    },

    /// A caller-supplied value is out of the accepted domain.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Which argument and why.
        reason: String,
    },

    /// Dataset directory is missing or malformed.
    #[error("dataset error at {path}: {reason}")]
    Dataset {
        /// Directory or file involved.
        path: String,
        /// What was expected there.
        reason: String,
    },

    /// Chart rendering failed.
    #[error("failed to render chart: {reason}")]
    Chart {
        /// Backend failure detail.
        reason: String,
    },

    /// Tensor operation failure from candle.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// Image decoding failure.
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),

    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Result-bundle (de)serialization failure.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PaisajeError>;
