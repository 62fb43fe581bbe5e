//! Receiver of named behaviors.
//!
//! A machine never owns its collaborator. The caller passes a `&mut dyn
//! Context` into every operation that may run behaviors, and named
//! behaviors are dispatched to it.

use super::Machine;
use crate::core::{BehaviorResult, Element};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Receives [`Behavior::Named`](crate::core::Behavior::Named) calls.
///
/// Both methods have defaults, so `()` serves as a context that answers
/// nothing.
pub trait Context {
    /// Whether `call` handles `behavior`. Unhandled names are skipped.
    fn responds_to(&self, behavior: &str) -> bool {
        let _ = behavior;
        false
    }

    fn call(
        &mut self,
        behavior: &str,
        machine: &mut Machine,
        element: Element<'_>,
        args: &[Value],
    ) -> BehaviorResult {
        let _ = (behavior, machine, element, args);
        Ok(None)
    }
}

impl Context for () {}

/// Handler stored in a [`Handlers`] table.
pub type Handler<S> = Arc<
    dyn Fn(&mut Handlers<S>, &mut Machine, Element<'_>, &[Value]) -> BehaviorResult + Send + Sync,
>;

/// A [`Context`] built from a name-to-closure table plus user state.
///
/// # Example
///
/// ```rust
/// use statewalk::engine::{Context, Handlers};
///
/// let mut ctx = Handlers::new(0u32).on("count", |cx, _machine, _element, _args| {
///     cx.state += 1;
///     Ok(None)
/// });
/// assert!(ctx.responds_to("count"));
/// assert!(!ctx.responds_to("other"));
/// ```
pub struct Handlers<S> {
    pub state: S,
    table: HashMap<String, Handler<S>>,
}

impl<S> Handlers<S> {
    pub fn new(state: S) -> Self {
        Self {
            state,
            table: HashMap::new(),
        }
    }

    pub fn on<F>(mut self, behavior: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Handlers<S>, &mut Machine, Element<'_>, &[Value]) -> BehaviorResult
            + Send
            + Sync
            + 'static,
    {
        self.insert(behavior, handler);
        self
    }

    pub fn insert<F>(&mut self, behavior: impl Into<String>, handler: F)
    where
        F: Fn(&mut Handlers<S>, &mut Machine, Element<'_>, &[Value]) -> BehaviorResult
            + Send
            + Sync
            + 'static,
    {
        self.table.insert(behavior.into(), Arc::new(handler));
    }

    pub fn remove(&mut self, behavior: &str) -> bool {
        self.table.remove(behavior).is_some()
    }
}

impl<S> Context for Handlers<S> {
    fn responds_to(&self, behavior: &str) -> bool {
        self.table.contains_key(behavior)
    }

    fn call(
        &mut self,
        behavior: &str,
        machine: &mut Machine,
        element: Element<'_>,
        args: &[Value],
    ) -> BehaviorResult {
        let Some(handler) = self.table.get(behavior).cloned() else {
            return Ok(None);
        };
        handler(self, machine, element, args)
    }
}

impl<S: fmt::Debug> fmt::Debug for Handlers<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.table.keys().collect();
        names.sort();
        f.debug_struct("Handlers")
            .field("state", &self.state)
            .field("behaviors", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_context_answers_nothing() {
        assert!(!().responds_to("entry"));
    }

    #[test]
    fn handlers_register_and_remove() {
        let mut ctx = Handlers::new(Vec::<String>::new())
            .on("a", |_, _, _, _| Ok(None))
            .on("b", |_, _, _, _| Ok(Some(false)));
        assert!(ctx.responds_to("a"));
        assert!(ctx.remove("a"));
        assert!(!ctx.responds_to("a"));
        assert!(!ctx.remove("a"));
        assert_eq!(
            format!("{ctx:?}"),
            "Handlers { state: [], behaviors: [\"b\"] }"
        );
    }
}
