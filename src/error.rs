//! Error types for the topic pipeline.

use thiserror::Error;

/// Top-level error type for pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid configuration values.
    #[error("configuration error: {0}")]
    Config(String),

    /// Stored data violates an invariant the pipeline relies on,
    /// e.g. a zero document frequency feeding the idf logarithm.
    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    /// The fitting capability could not produce a model.
    #[error("fit error: {0}")]
    Fit(String),

    /// A bulk write or query against the record store failed.
    #[error("store error: {0}")]
    Store(String),

    /// A fit artifact is missing or unusable.
    #[error("artifact error: {0}")]
    Artifact(String),

    /// I/O error wrapper.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CBOR encoding/decoding of fit artifacts.
    #[error("codec error: {0}")]
    Codec(#[from] serde_cbor::Error),

    /// JSON configuration parsing.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
