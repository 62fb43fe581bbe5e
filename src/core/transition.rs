//! Transition definitions.

use super::behavior::{Action, Behavior};
use super::element::{DefinitionId, ElementData, Named, StateId, TransitionId};
use super::event::{Event, Trigger};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Whether a transition leaves and re-enters the states it crosses.
///
/// Internal transitions run their effect and move the active state without
/// running any exit or entry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    #[default]
    External,
    Internal,
}

/// A directed edge between two states, owned by one definition.
///
/// # Example
///
/// ```rust
/// use statewalk::core::{Graph, StateDefinition, TransitionDefinition};
///
/// let mut graph = Graph::new("light");
/// let root = graph.root();
/// let off = graph.add_state(root, StateDefinition::new("off")).unwrap();
/// let on = graph.add_state(root, StateDefinition::new("on")).unwrap();
///
/// let flip = graph
///     .add_transition(root, TransitionDefinition::new("flip", off, on).with_trigger("press"))
///     .unwrap();
///
/// let transition = graph.transition(flip).unwrap();
/// assert_eq!(transition.source(), off);
/// assert!(transition.matching_trigger(&"press".into()).is_some());
/// ```
#[derive(Debug, Clone)]
pub struct TransitionDefinition {
    pub(crate) id: TransitionId,
    pub(crate) element: ElementData,
    pub(crate) kind: TransitionKind,
    pub(crate) owner: DefinitionId,
    pub(crate) source: StateId,
    pub(crate) target: StateId,
    pub(crate) triggers: Vec<Trigger>,
    pub(crate) guard: Behavior,
    pub(crate) effect: Behavior,
}

impl TransitionDefinition {
    pub fn new(name: impl Into<String>, source: StateId, target: StateId) -> Self {
        Self {
            id: TransitionId::DETACHED,
            element: ElementData::new(name),
            kind: TransitionKind::External,
            owner: DefinitionId::DETACHED,
            source,
            target,
            triggers: Vec::new(),
            guard: Behavior::None,
            effect: Behavior::None,
        }
    }

    pub fn with_kind(mut self, kind: TransitionKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn internal(self) -> Self {
        self.with_kind(TransitionKind::Internal)
    }

    pub fn with_trigger(mut self, trigger: impl Into<Trigger>) -> Self {
        self.triggers.push(trigger.into());
        self
    }

    pub fn with_guard(mut self, guard: impl Into<Behavior>) -> Self {
        self.guard = guard.into();
        self
    }

    pub fn with_effect(mut self, effect: impl Into<Behavior>) -> Self {
        self.effect = effect.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.element.metadata.insert(key.into(), value);
        self
    }

    pub fn id(&self) -> TransitionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.element.name
    }

    pub fn kind(&self) -> TransitionKind {
        self.kind
    }

    pub fn is_internal(&self) -> bool {
        self.kind == TransitionKind::Internal
    }

    pub fn owner(&self) -> DefinitionId {
        self.owner
    }

    pub fn source(&self) -> StateId {
        self.source
    }

    pub fn target(&self) -> StateId {
        self.target
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    /// First trigger accepting `event`. A transition without triggers never
    /// reacts to events.
    pub fn matching_trigger(&self, event: &Event) -> Option<&Trigger> {
        self.triggers.iter().find(|t| t.matches(event))
    }

    pub fn behavior(&self, action: Action) -> &Behavior {
        match action {
            Action::Guard => &self.guard,
            Action::Effect => &self.effect,
            Action::Entry | Action::Exit | Action::DoActivity => &Behavior::None,
        }
    }
}

impl Named for TransitionDefinition {
    fn element(&self) -> &ElementData {
        &self.element
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge() -> TransitionDefinition {
        TransitionDefinition::new("a->b", StateId(0), StateId(1))
    }

    #[test]
    fn new_transition_is_external_without_triggers() {
        let t = edge();
        assert_eq!(t.kind(), TransitionKind::External);
        assert!(t.triggers().is_empty());
        assert!(t.matching_trigger(&"anything".into()).is_none());
    }

    #[test]
    fn first_matching_trigger_wins() {
        let t = edge()
            .with_trigger(Trigger::pattern("^go").unwrap())
            .with_trigger("go_now");
        let hit = t.matching_trigger(&"go_now".into()).unwrap();
        assert_eq!(hit.label(), "^go");
    }

    #[test]
    fn guard_and_effect_slots() {
        let t = edge().with_guard("ok").with_effect("log").internal();
        assert!(t.is_internal());
        assert!(matches!(t.behavior(Action::Guard), Behavior::Named(n) if n == "ok"));
        assert!(matches!(t.behavior(Action::Effect), Behavior::Named(n) if n == "log"));
        assert!(t.behavior(Action::Entry).is_none());
    }
}
