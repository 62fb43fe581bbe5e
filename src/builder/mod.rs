//! Builder API for ergonomic definition construction.
//!
//! This module provides fluent builders for creating definition graphs by
//! state name, without handling ids directly.

pub mod definition;
pub mod error;
pub mod state;
pub mod transition;

pub use definition::GraphBuilder;
pub use error::BuildError;
pub use state::StateBuilder;
pub use transition::TransitionBuilder;

/// Create a transition that fires on the event `event`.
///
/// # Example
///
/// ```
/// use statewalk::builder::{event_transition, GraphBuilder};
///
/// let graph = GraphBuilder::new("light")
///     .initial("off")
///     .final_state("broken")
///     .transition(event_transition("off", "on", "flip"))
///     .unwrap()
///     .transition(event_transition("on", "broken", "smash"))
///     .unwrap()
///     .build()
///     .unwrap();
///
/// let flip = graph.transition_by_path("off->on").unwrap();
/// assert_eq!(graph.transition(flip).unwrap().triggers().len(), 1);
/// ```
pub fn event_transition(
    from: impl Into<String>,
    to: impl Into<String>,
    event: &str,
) -> TransitionBuilder {
    TransitionBuilder::new().from(from).to(to).trigger(event)
}

/// Create a transition guarded by a predicate over its arguments.
///
/// # Example
///
/// ```
/// use statewalk::builder::{guarded_transition, GraphBuilder};
///
/// let graph = GraphBuilder::new("gate")
///     .initial("shut")
///     .final_state("through")
///     .transition(guarded_transition("shut", "through", |args| !args.is_empty()))
///     .unwrap()
///     .build()
///     .unwrap();
///
/// assert!(graph.transition_by_path("shut->through").is_ok());
/// ```
pub fn guarded_transition<F>(
    from: impl Into<String>,
    to: impl Into<String>,
    predicate: F,
) -> TransitionBuilder
where
    F: Fn(&[serde_json::Value]) -> bool + Send + Sync + 'static,
{
    TransitionBuilder::new().from(from).to(to).when(predicate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Machine, RunMode};
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn guarded_transition_consults_arguments() {
        let graph = GraphBuilder::new("gate")
            .initial("shut")
            .final_state("through")
            .transition(guarded_transition("shut", "through", |args| {
                args.first() == Some(&json!("key"))
            }))
            .unwrap()
            .build()
            .unwrap();

        let mut machine = Machine::new(Arc::new(graph));
        machine.start(&mut (), &[]).unwrap();
        assert!(machine.transition(&mut (), "shut->through", vec![]).is_err());

        machine
            .transition(&mut (), "shut->through", vec![json!("key")])
            .unwrap();
        machine.run(&mut (), RunMode::Single).unwrap();
        assert!(machine.at_end());
    }
}
