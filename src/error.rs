//! Errors raised by the graph model and the execution engine.

use crate::validation::Finding;
use thiserror::Error;

/// Errors from building or editing a [`Graph`](crate::core::Graph).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("{kind} named '{name}' already exists in '{definition}'")]
    DuplicateName {
        kind: &'static str,
        name: String,
        definition: String,
    },

    #[error("Unknown state '{path}'")]
    UnknownState { path: String },

    #[error("Unknown transition '{path}'")]
    UnknownTransition { path: String },

    #[error("Unknown definition '{path}'")]
    UnknownDefinition { path: String },

    #[error("State '{state}' is not reachable from definition '{definition}'")]
    ForeignState { state: String, definition: String },
}

/// Errors from driving a [`Machine`](crate::engine::Machine).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MachineError {
    #[error("Unknown transition '{name}' from state '{state}'")]
    UnknownTransition { name: String, state: String },

    #[error("Cannot take transition '{transition}': {reason}")]
    CannotTransition { transition: String, reason: String },

    #[error("Ambiguous transition, candidates: {}", candidates.join(", "))]
    AmbiguousTransition { candidates: Vec<String> },

    #[error("Unexpected recursion in {operation}")]
    UnexpectedRecursion { operation: &'static str },

    #[error("Transition '{pending}' is already pending")]
    TransitionPending { pending: String },

    #[error("{message}: '{event}'")]
    UnhandledEvent {
        message: &'static str,
        event: String,
        candidates: Vec<String>,
    },

    #[error("Definition is invalid: {} finding(s)", findings.len())]
    ObjectInvalid { findings: Vec<Finding> },

    #[error("{feature} not implemented")]
    NotImplemented { feature: &'static str },

    #[error("Machine has not been started")]
    NotStarted,

    #[error("Definition '{definition}' has no start state")]
    NoStartState { definition: String },

    #[error("State '{state}' is not composite")]
    NotComposite { state: String },

    #[error("Behavior '{behavior}' failed: {message}")]
    Behavior { behavior: String, message: String },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl MachineError {
    /// Convenience constructor for failures raised inside user behaviors.
    pub fn behavior(behavior: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Behavior {
            behavior: behavior.into(),
            message: message.into(),
        }
    }
}

pub(crate) const NO_TRANSITIONS: &str = "No transitions for event";
pub(crate) const TOO_MANY_TRANSITIONS: &str = "Too many transitions for event";
