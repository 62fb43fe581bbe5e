//! State definitions.
//!
//! A state is a node of a definition. It owns its entry, exit and
//! doActivity behaviors and may be composite, in which case it refers to a
//! nested definition through [`StateDefinition::submachine`].

use super::behavior::{Action, Behavior};
use super::element::{DefinitionId, ElementData, Named, StateId, TransitionId};
use crate::error::MachineError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

/// Role of a state inside its definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateKind {
    #[default]
    Normal,
    Start,
    End,
}

/// States and transitions adjacent to a state, computed on demand.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Neighbours {
    pub(crate) sources: Vec<StateId>,
    pub(crate) targets: Vec<StateId>,
    pub(crate) transitions: Vec<TransitionId>,
}

/// A state inside a [`StateMachineDefinition`](super::StateMachineDefinition).
///
/// Built detached with [`StateDefinition::new`] and the `with_*` methods,
/// then placed into a definition with [`Graph::add_state`](super::Graph::add_state),
/// which assigns its handle and owner.
///
/// # Example
///
/// ```rust
/// use statewalk::core::{Graph, StateDefinition, StateKind};
///
/// let mut graph = Graph::new("door");
/// let root = graph.root();
/// let open = graph
///     .add_state(root, StateDefinition::new("open").with_entry("log_open"))
///     .unwrap();
///
/// let state = graph.state(open).unwrap();
/// assert_eq!(state.name(), "open");
/// assert_eq!(state.kind(), StateKind::Normal);
/// assert!(state.is_simple());
/// ```
#[derive(Debug, Clone)]
pub struct StateDefinition {
    pub(crate) id: StateId,
    pub(crate) element: ElementData,
    pub(crate) kind: StateKind,
    pub(crate) owner: DefinitionId,
    pub(crate) entry: Behavior,
    pub(crate) exit: Behavior,
    pub(crate) do_activity: Behavior,
    pub(crate) submachine: Option<DefinitionId>,
    pub(crate) incoming: Vec<TransitionId>,
    pub(crate) outgoing: Vec<TransitionId>,
    pub(crate) neighbours: OnceLock<Neighbours>,
}

impl StateDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: StateId::DETACHED,
            element: ElementData::new(name),
            kind: StateKind::Normal,
            owner: DefinitionId::DETACHED,
            entry: Behavior::None,
            exit: Behavior::None,
            do_activity: Behavior::None,
            submachine: None,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            neighbours: OnceLock::new(),
        }
    }

    pub fn with_entry(mut self, behavior: impl Into<Behavior>) -> Self {
        self.entry = behavior.into();
        self
    }

    pub fn with_exit(mut self, behavior: impl Into<Behavior>) -> Self {
        self.exit = behavior.into();
        self
    }

    pub fn with_do_activity(mut self, behavior: impl Into<Behavior>) -> Self {
        self.do_activity = behavior.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.element.metadata.insert(key.into(), value);
        self
    }

    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.element.name
    }

    pub fn kind(&self) -> StateKind {
        self.kind
    }

    pub fn is_start(&self) -> bool {
        self.kind == StateKind::Start
    }

    pub fn is_end(&self) -> bool {
        self.kind == StateKind::End
    }

    /// Definition this state belongs to.
    pub fn owner(&self) -> DefinitionId {
        self.owner
    }

    /// Nested definition of a composite state.
    pub fn submachine(&self) -> Option<DefinitionId> {
        self.submachine
    }

    pub fn is_composite(&self) -> bool {
        self.submachine.is_some()
    }

    /// A state is a submachine state exactly when it is composite.
    pub fn is_submachine_state(&self) -> bool {
        self.is_composite()
    }

    pub fn is_simple(&self) -> bool {
        !self.is_composite()
    }

    /// Orthogonal regions are not modelled.
    pub fn is_orthogonal(&self) -> Result<bool, MachineError> {
        Err(MachineError::NotImplemented {
            feature: "orthogonal regions",
        })
    }

    pub fn incoming(&self) -> &[TransitionId] {
        &self.incoming
    }

    pub fn outgoing(&self) -> &[TransitionId] {
        &self.outgoing
    }

    /// Behavior configured directly on this state for `action`.
    ///
    /// Guards and effects belong to transitions, so those slots are always
    /// empty here.
    pub fn behavior(&self, action: Action) -> &Behavior {
        match action {
            Action::Entry => &self.entry,
            Action::Exit => &self.exit,
            Action::DoActivity => &self.do_activity,
            Action::Guard | Action::Effect => &Behavior::None,
        }
    }

    pub(crate) fn set_behavior(&mut self, action: Action, behavior: Behavior) {
        match action {
            Action::Entry => self.entry = behavior,
            Action::Exit => self.exit = behavior,
            Action::DoActivity => self.do_activity = behavior,
            Action::Guard | Action::Effect => {}
        }
    }

    pub(crate) fn invalidate(&mut self) {
        self.neighbours = OnceLock::new();
    }
}

impl Named for StateDefinition {
    fn element(&self) -> &ElementData {
        &self.element
    }
}
