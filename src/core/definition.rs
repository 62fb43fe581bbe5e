//! State machine definitions.

use super::behavior::{Action, Behavior};
use super::element::{DefinitionId, ElementData, Named, StateId, TransitionId};
use std::collections::HashMap;

/// A named set of states and transitions.
///
/// The root definition of a [`Graph`](super::Graph) has no
/// `submachine_state`; every nested definition is owned by exactly one
/// composite state.
#[derive(Debug, Clone)]
pub struct StateMachineDefinition {
    pub(crate) id: DefinitionId,
    pub(crate) element: ElementData,
    pub(crate) states: Vec<StateId>,
    pub(crate) transitions: Vec<TransitionId>,
    pub(crate) submachine_state: Option<StateId>,
    pub(crate) start_state: Option<StateId>,
    pub(crate) end_state: Option<StateId>,
    pub(crate) options: HashMap<Action, Behavior>,
}

impl StateMachineDefinition {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            id: DefinitionId::DETACHED,
            element: ElementData::new(name),
            states: Vec::new(),
            transitions: Vec::new(),
            submachine_state: None,
            start_state: None,
            end_state: None,
            options: HashMap::new(),
        }
    }

    pub fn id(&self) -> DefinitionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.element.name
    }

    /// States in insertion order.
    pub fn states(&self) -> &[StateId] {
        &self.states
    }

    /// Transitions in insertion order.
    pub fn transitions(&self) -> &[TransitionId] {
        &self.transitions
    }

    /// Composite state owning this definition, `None` for the root.
    pub fn submachine_state(&self) -> Option<StateId> {
        self.submachine_state
    }

    pub fn is_root(&self) -> bool {
        self.submachine_state.is_none()
    }

    pub fn start_state(&self) -> Option<StateId> {
        self.start_state
    }

    pub fn end_state(&self) -> Option<StateId> {
        self.end_state
    }

    /// Definition-wide fallback for `action`, used by elements that leave
    /// the slot empty.
    pub fn option(&self, action: Action) -> Option<&Behavior> {
        self.options.get(&action)
    }
}

impl Named for StateMachineDefinition {
    fn element(&self) -> &ElementData {
        &self.element
    }
}
