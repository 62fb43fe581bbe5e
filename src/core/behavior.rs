//! Behaviors attached to states and transitions.
//!
//! A behavior is either absent, a name resolved against the caller's
//! [`Context`], or a callback stored on the element itself.

use super::{StateDefinition, TransitionDefinition};
use crate::engine::{Context, Machine};
use crate::error::MachineError;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Outcome of invoking a behavior.
///
/// `Ok(None)` means "no answer". For guards that counts as a pass.
pub type BehaviorResult = Result<Option<bool>, MachineError>;

/// Signature of a callback behavior.
pub type BehaviorFn =
    dyn Fn(&mut Machine, &mut dyn Context, Element<'_>, &[Value]) -> BehaviorResult + Send + Sync;

/// The slots a behavior can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Entry,
    Exit,
    DoActivity,
    Guard,
    Effect,
}

impl Action {
    /// Name used when nothing more specific is configured.
    pub fn key(self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::Exit => "exit",
            Self::DoActivity => "doActivity",
            Self::Guard => "guard",
            Self::Effect => "effect",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// What to run for an [`Action`].
#[derive(Clone, Default)]
pub enum Behavior {
    #[default]
    None,
    Named(String),
    Callback(Arc<BehaviorFn>),
}

impl Behavior {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Wraps a closure as a callback behavior.
    ///
    /// # Example
    ///
    /// ```rust
    /// use statewalk::core::Behavior;
    ///
    /// let guard = Behavior::callback(|_machine, _ctx, _element, args| {
    ///     Ok(Some(!args.is_empty()))
    /// });
    /// assert!(!guard.is_none());
    /// ```
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&mut Machine, &mut dyn Context, Element<'_>, &[Value]) -> BehaviorResult
            + Send
            + Sync
            + 'static,
    {
        Self::Callback(Arc::new(f))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Debug for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl From<&str> for Behavior {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

/// The element a behavior runs for.
#[derive(Debug, Clone, Copy)]
pub enum Element<'a> {
    State(&'a StateDefinition),
    Transition(&'a TransitionDefinition),
}

impl<'a> Element<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            Self::State(state) => state.name(),
            Self::Transition(transition) => transition.name(),
        }
    }

    pub fn as_state(&self) -> Option<&'a StateDefinition> {
        match self {
            Self::State(state) => Some(state),
            Self::Transition(_) => None,
        }
    }

    pub fn as_transition(&self) -> Option<&'a TransitionDefinition> {
        match self {
            Self::Transition(transition) => Some(transition),
            Self::State(_) => None,
        }
    }
}
