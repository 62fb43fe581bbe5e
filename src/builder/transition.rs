//! Builder for constructing transitions.

use crate::builder::error::BuildError;
use crate::core::{Behavior, Event, Trigger, TransitionKind};
use serde_json::Value;

#[derive(Debug, Clone)]
enum TriggerSpec {
    Ready(Trigger),
    Pattern(String),
}

/// A transition whose endpoints are still names.
#[derive(Debug, Clone)]
pub(crate) struct TransitionPlan {
    pub(crate) from: String,
    pub(crate) to: String,
    pub(crate) name: Option<String>,
    pub(crate) kind: TransitionKind,
    pub(crate) triggers: Vec<Trigger>,
    pub(crate) guard: Behavior,
    pub(crate) effect: Behavior,
    pub(crate) metadata: Vec<(String, Value)>,
}

/// Builder for constructing transitions with a fluent API.
///
/// Endpoints are state names. They are looked up in the definition the
/// transition is added to and then in each enclosing definition; names that
/// resolve nowhere are declared in the transition's own definition.
#[derive(Debug, Clone, Default)]
pub struct TransitionBuilder {
    from: Option<String>,
    to: Option<String>,
    name: Option<String>,
    kind: TransitionKind,
    triggers: Vec<TriggerSpec>,
    guard: Behavior,
    effect: Behavior,
    metadata: Vec<(String, Value)>,
}

impl TransitionBuilder {
    /// Create a new transition builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source state (required).
    pub fn from(mut self, state: impl Into<String>) -> Self {
        self.from = Some(state.into());
        self
    }

    /// Set the target state (required).
    pub fn to(mut self, state: impl Into<String>) -> Self {
        self.to = Some(state.into());
        self
    }

    /// Name the transition. Defaults to `source->target`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// React to events with exactly this name.
    pub fn trigger(mut self, trigger: impl Into<Trigger>) -> Self {
        self.triggers.push(TriggerSpec::Ready(trigger.into()));
        self
    }

    /// React to events whose name matches a regular expression.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.triggers.push(TriggerSpec::Pattern(pattern.into()));
        self
    }

    /// React to events accepted by a predicate.
    pub fn on_event<F>(mut self, label: impl Into<String>, test: F) -> Self
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        self.triggers
            .push(TriggerSpec::Ready(Trigger::predicate(label, test)));
        self
    }

    /// Add a guard behavior (optional).
    pub fn guard(mut self, guard: impl Into<Behavior>) -> Self {
        self.guard = guard.into();
        self
    }

    /// Add a guard over the transition arguments using a closure (optional).
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&[Value]) -> bool + Send + Sync + 'static,
    {
        self.guard = Behavior::callback(move |_, _, _, args| Ok(Some(predicate(args))));
        self
    }

    /// Set the effect behavior (optional).
    pub fn effect(mut self, effect: impl Into<Behavior>) -> Self {
        self.effect = effect.into();
        self
    }

    /// Make the transition internal: no exit or entry behaviors run.
    pub fn internal(mut self) -> Self {
        self.kind = TransitionKind::Internal;
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.push((key.into(), value));
        self
    }

    pub(crate) fn build(self) -> Result<TransitionPlan, BuildError> {
        let from = self.from.ok_or(BuildError::MissingFromState)?;
        let to = self.to.ok_or(BuildError::MissingToState)?;
        let triggers = self
            .triggers
            .into_iter()
            .map(|spec| match spec {
                TriggerSpec::Ready(trigger) => Ok(trigger),
                TriggerSpec::Pattern(pattern) => {
                    Trigger::pattern(&pattern).map_err(|e| BuildError::InvalidPattern {
                        message: e.to_string(),
                        pattern,
                    })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TransitionPlan {
            from,
            to,
            name: self.name,
            kind: self.kind,
            triggers,
            guard: self.guard,
            effect: self.effect,
            metadata: self.metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_builder_requires_from() {
        let result = TransitionBuilder::new().to("b").build();
        assert!(matches!(result, Err(BuildError::MissingFromState)));
    }

    #[test]
    fn transition_builder_requires_to() {
        let result = TransitionBuilder::new().from("a").build();
        assert!(matches!(result, Err(BuildError::MissingToState)));
    }

    #[test]
    fn transition_builder_compiles_patterns_in_order() {
        let plan = TransitionBuilder::new()
            .from("a")
            .to("b")
            .trigger("go")
            .pattern("^retry-[0-9]+$")
            .build()
            .unwrap();

        let labels: Vec<&str> = plan.triggers.iter().map(|t| t.label()).collect();
        assert_eq!(labels, vec!["go", "^retry-[0-9]+$"]);
        assert!(plan.triggers[1].matches(&Event::new("retry-3")));
        assert!(!plan.triggers[1].matches(&Event::new("retry")));
    }

    #[test]
    fn transition_builder_rejects_bad_pattern() {
        let result = TransitionBuilder::new().from("a").to("b").pattern("(").build();
        assert!(matches!(result, Err(BuildError::InvalidPattern { .. })));
    }

    #[test]
    fn internal_transitions_keep_their_kind() {
        let plan = TransitionBuilder::new()
            .from("a")
            .to("a")
            .internal()
            .build()
            .unwrap();
        assert_eq!(plan.kind, TransitionKind::Internal);
        assert!(plan.name.is_none());
    }
}
