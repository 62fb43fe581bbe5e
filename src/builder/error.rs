//! Build errors for definition and transition builders.

use crate::error::GraphError;
use thiserror::Error;

/// Errors that can occur when building definitions and transitions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("Transition source state not specified. Call .from(state)")]
    MissingFromState,

    #[error("Transition target state not specified. Call .to(state)")]
    MissingToState,

    #[error("Invalid trigger pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error(transparent)]
    Graph(#[from] GraphError),
}
