//! Checkpoint error types.

use thiserror::Error;

/// Errors that can occur during snapshot operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckpointError {
    /// Serialization to JSON or binary format failed
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Deserialization from JSON or binary format failed
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    /// Snapshot version is not supported by this version
    #[error("Unsupported snapshot version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// The snapshot was taken from a machine bound to another definition
    #[error("Snapshot belongs to definition '{found}', machine runs '{expected}'")]
    DefinitionMismatch { expected: String, found: String },

    #[error("Snapshot names unknown state '{0}'")]
    UnknownState(String),

    #[error("Snapshot names unknown transition '{0}'")]
    UnknownTransition(String),

    /// Snapshot data failed validation
    #[error("Snapshot validation failed: {0}")]
    ValidationFailed(String),
}
