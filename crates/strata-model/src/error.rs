//! Model error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    /// Raw payload arrived with no entities at all.
    #[error("raw graph has no entities")]
    EmptyEntityList,

    /// Raw payload failed validation; nothing was ingested.
    #[error("raw graph validation failed: {0}")]
    Validation(String),

    /// A GUID lookup failed after a structural change.
    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}
