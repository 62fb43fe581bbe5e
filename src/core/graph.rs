//! Arena holding one root definition and everything nested inside it.
//!
//! Definitions, states and transitions refer to each other through handles.
//! Removing an element leaves a tombstone so that the handles of the
//! remaining elements stay valid.

use super::behavior::{Action, Behavior};
use super::definition::StateMachineDefinition;
use super::element::{join_path, split_path, DefinitionId, StateId, TransitionId};
use super::state::{Neighbours, StateDefinition, StateKind};
use super::transition::TransitionDefinition;
use crate::copier::{Copier, Structure};
use crate::error::GraphError;
use std::collections::HashMap;

/// Owner of a statechart: the root definition and all nested definitions,
/// states and transitions.
///
/// # Example
///
/// ```rust
/// use statewalk::core::{Graph, StateDefinition, TransitionDefinition};
///
/// let mut graph = Graph::new("turnstile");
/// let root = graph.root();
/// let locked = graph.add_state(root, StateDefinition::new("locked")).unwrap();
/// let unlocked = graph.add_state(root, StateDefinition::new("unlocked")).unwrap();
/// graph.set_start_state(root, Some(locked)).unwrap();
/// graph
///     .add_transition(root, TransitionDefinition::new("coin", locked, unlocked))
///     .unwrap();
///
/// assert_eq!(graph.state_by_path("unlocked").unwrap(), unlocked);
/// assert_eq!(graph.targets(locked), &[unlocked]);
/// assert_eq!(graph.sources(unlocked), &[locked]);
/// ```
#[derive(Debug, Clone)]
pub struct Graph {
    definitions: Vec<Option<StateMachineDefinition>>,
    states: Vec<Option<StateDefinition>>,
    transitions: Vec<Option<TransitionDefinition>>,
    root: DefinitionId,
}

impl Graph {
    /// Creates a graph with an empty root definition called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let mut graph = Self::empty();
        graph.root = graph.push_definition(StateMachineDefinition::new(name));
        graph
    }

    fn empty() -> Self {
        Self {
            definitions: Vec::new(),
            states: Vec::new(),
            transitions: Vec::new(),
            root: DefinitionId::DETACHED,
        }
    }

    fn push_definition(&mut self, mut definition: StateMachineDefinition) -> DefinitionId {
        let id = DefinitionId::from_index(self.definitions.len());
        definition.id = id;
        self.definitions.push(Some(definition));
        id
    }

    fn push_state(&mut self, mut state: StateDefinition) -> StateId {
        let id = StateId::from_index(self.states.len());
        state.id = id;
        self.states.push(Some(state));
        id
    }

    fn push_transition(&mut self, mut transition: TransitionDefinition) -> TransitionId {
        let id = TransitionId::from_index(self.transitions.len());
        transition.id = id;
        self.transitions.push(Some(transition));
        id
    }

    pub fn root(&self) -> DefinitionId {
        self.root
    }

    pub fn definition(&self, id: DefinitionId) -> Result<&StateMachineDefinition, GraphError> {
        self.definitions
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or_else(|| GraphError::UnknownDefinition {
                path: id.to_string(),
            })
    }

    pub fn state(&self, id: StateId) -> Result<&StateDefinition, GraphError> {
        self.states
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or_else(|| GraphError::UnknownState {
                path: id.to_string(),
            })
    }

    pub fn transition(&self, id: TransitionId) -> Result<&TransitionDefinition, GraphError> {
        self.transitions
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or_else(|| GraphError::UnknownTransition {
                path: id.to_string(),
            })
    }

    fn definition_mut(
        &mut self,
        id: DefinitionId,
    ) -> Result<&mut StateMachineDefinition, GraphError> {
        self.definitions
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| GraphError::UnknownDefinition {
                path: id.to_string(),
            })
    }

    fn state_mut(&mut self, id: StateId) -> Result<&mut StateDefinition, GraphError> {
        self.states
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| GraphError::UnknownState {
                path: id.to_string(),
            })
    }

    fn transition_mut(&mut self, id: TransitionId) -> Result<&mut TransitionDefinition, GraphError> {
        self.transitions
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| GraphError::UnknownTransition {
                path: id.to_string(),
            })
    }

    /// Live definitions, root first.
    pub fn definitions(&self) -> impl Iterator<Item = &StateMachineDefinition> {
        self.definitions.iter().flatten()
    }

    pub fn states(&self) -> impl Iterator<Item = &StateDefinition> {
        self.states.iter().flatten()
    }

    pub fn transitions(&self) -> impl Iterator<Item = &TransitionDefinition> {
        self.transitions.iter().flatten()
    }

    /// Adds a detached state to `definition`.
    ///
    /// Names are unique per definition.
    pub fn add_state(
        &mut self,
        definition: DefinitionId,
        mut state: StateDefinition,
    ) -> Result<StateId, GraphError> {
        self.definition(definition)?;
        if self.state_named(definition, state.name()).is_some() {
            return Err(GraphError::DuplicateName {
                kind: "state",
                name: state.name().to_string(),
                definition: self.definition_label(definition),
            });
        }

        state.owner = definition;
        state.kind = StateKind::Normal;
        state.submachine = None;
        state.incoming.clear();
        state.outgoing.clear();
        state.invalidate();

        let id = self.push_state(state);
        self.definition_mut(definition)?.states.push(id);
        Ok(id)
    }

    /// Adds a detached transition to `definition`.
    ///
    /// Both endpoints must belong to `definition` or to one of the
    /// definitions enclosing it.
    pub fn add_transition(
        &mut self,
        definition: DefinitionId,
        mut transition: TransitionDefinition,
    ) -> Result<TransitionId, GraphError> {
        self.definition(definition)?;
        if self.transition_named(definition, transition.name()).is_some() {
            return Err(GraphError::DuplicateName {
                kind: "transition",
                name: transition.name().to_string(),
                definition: self.definition_label(definition),
            });
        }

        let chain = self.definition_chain(definition);
        for endpoint in [transition.source, transition.target] {
            if !chain.contains(&self.state(endpoint)?.owner) {
                return Err(GraphError::ForeignState {
                    state: self.path_of_state(endpoint),
                    definition: self.definition_label(definition),
                });
            }
        }

        transition.owner = definition;
        let (source, target) = (transition.source, transition.target);
        let id = self.push_transition(transition);
        self.definition_mut(definition)?.transitions.push(id);

        let source = self.state_mut(source)?;
        source.outgoing.push(id);
        source.invalidate();
        let target = self.state_mut(target)?;
        target.incoming.push(id);
        target.invalidate();
        Ok(id)
    }

    /// Removes a transition and unlinks it from its endpoints.
    pub fn remove_transition(
        &mut self,
        id: TransitionId,
    ) -> Result<TransitionDefinition, GraphError> {
        let transition = self
            .transitions
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or_else(|| GraphError::UnknownTransition {
                path: id.to_string(),
            })?;

        if let Ok(owner) = self.definition_mut(transition.owner) {
            owner.transitions.retain(|t| *t != id);
        }
        if let Ok(source) = self.state_mut(transition.source) {
            source.outgoing.retain(|t| *t != id);
            source.invalidate();
        }
        if let Ok(target) = self.state_mut(transition.target) {
            target.incoming.retain(|t| *t != id);
            target.invalidate();
        }
        Ok(transition)
    }

    /// Removes a state, every transition touching it and its nested
    /// definition. Returns the transitions that touched the state.
    pub fn remove_state(&mut self, id: StateId) -> Result<Vec<TransitionDefinition>, GraphError> {
        let state = self.state(id)?;
        let mut incident: Vec<TransitionId> =
            state.incoming.iter().chain(&state.outgoing).copied().collect();
        incident.sort();
        incident.dedup();
        let (owner, submachine) = (state.owner, state.submachine);

        let mut removed = Vec::with_capacity(incident.len());
        for transition in incident {
            removed.push(self.remove_transition(transition)?);
        }
        if let Some(nested) = submachine {
            self.remove_definition(nested)?;
        }

        if let Ok(definition) = self.definition_mut(owner) {
            definition.states.retain(|s| *s != id);
            if definition.start_state == Some(id) {
                definition.start_state = None;
            }
            if definition.end_state == Some(id) {
                definition.end_state = None;
            }
        }
        if let Some(slot) = self.states.get_mut(id.index()) {
            *slot = None;
        }
        Ok(removed)
    }

    fn remove_definition(&mut self, id: DefinitionId) -> Result<(), GraphError> {
        let states = self.definition(id)?.states.clone();
        for state in states {
            self.remove_state(state)?;
        }
        if let Some(slot) = self.definitions.get_mut(id.index()) {
            *slot = None;
        }
        Ok(())
    }

    /// Makes `state` composite by giving it a nested definition.
    ///
    /// Returns the existing nested definition if there already is one.
    pub fn attach_submachine(
        &mut self,
        state: StateId,
        name: impl Into<String>,
    ) -> Result<DefinitionId, GraphError> {
        if let Some(existing) = self.state(state)?.submachine {
            return Ok(existing);
        }
        let mut definition = StateMachineDefinition::new(name);
        definition.submachine_state = Some(state);
        let id = self.push_definition(definition);
        self.state_mut(state)?.submachine = Some(id);
        Ok(id)
    }

    /// Marks `state` as the start state of `definition`, or clears it.
    pub fn set_start_state(
        &mut self,
        definition: DefinitionId,
        state: Option<StateId>,
    ) -> Result<(), GraphError> {
        self.mark(definition, state, StateKind::Start)
    }

    /// Marks `state` as the end state of `definition`, or clears it.
    pub fn set_end_state(
        &mut self,
        definition: DefinitionId,
        state: Option<StateId>,
    ) -> Result<(), GraphError> {
        self.mark(definition, state, StateKind::End)
    }

    fn mark(
        &mut self,
        definition: DefinitionId,
        state: Option<StateId>,
        kind: StateKind,
    ) -> Result<(), GraphError> {
        if let Some(state) = state {
            if self.state(state)?.owner != definition {
                return Err(GraphError::ForeignState {
                    state: self.path_of_state(state),
                    definition: self.definition_label(definition),
                });
            }
        }

        let def = self.definition(definition)?;
        let (previous, other) = match kind {
            StateKind::Start => (def.start_state, def.end_state),
            _ => (def.end_state, def.start_state),
        };
        if let Some(previous) = previous {
            let previous = self.state_mut(previous)?;
            if previous.kind == kind {
                previous.kind = StateKind::Normal;
            }
        }
        if let Some(state) = state {
            self.state_mut(state)?.kind = kind;
        }

        let def = self.definition_mut(definition)?;
        match kind {
            StateKind::Start => def.start_state = state,
            _ => def.end_state = state,
        }
        // one state cannot be both start and end
        if other.is_some() && other == state {
            match kind {
                StateKind::Start => def.end_state = None,
                _ => def.start_state = None,
            }
        }
        Ok(())
    }

    /// Sets the definition-wide fallback behavior for `action`.
    pub fn set_option(
        &mut self,
        definition: DefinitionId,
        action: Action,
        behavior: Behavior,
    ) -> Result<(), GraphError> {
        let def = self.definition_mut(definition)?;
        if behavior.is_none() {
            def.options.remove(&action);
        } else {
            def.options.insert(action, behavior);
        }
        Ok(())
    }

    pub fn set_state_behavior(
        &mut self,
        state: StateId,
        action: Action,
        behavior: Behavior,
    ) -> Result<(), GraphError> {
        self.state_mut(state)?.set_behavior(action, behavior);
        Ok(())
    }

    pub fn set_transition_guard(
        &mut self,
        transition: TransitionId,
        guard: Behavior,
    ) -> Result<(), GraphError> {
        self.transition_mut(transition)?.guard = guard;
        Ok(())
    }

    pub fn set_transition_effect(
        &mut self,
        transition: TransitionId,
        effect: Behavior,
    ) -> Result<(), GraphError> {
        self.transition_mut(transition)?.effect = effect;
        Ok(())
    }

    pub fn state_named(&self, definition: DefinitionId, name: &str) -> Option<StateId> {
        self.definition(definition)
            .ok()?
            .states
            .iter()
            .copied()
            .find(|s| self.state(*s).is_ok_and(|state| state.name() == name))
    }

    pub fn transition_named(&self, definition: DefinitionId, name: &str) -> Option<TransitionId> {
        self.definition(definition)
            .ok()?
            .transitions
            .iter()
            .copied()
            .find(|t| self.transition(*t).is_ok_and(|tr| tr.name() == name))
    }

    /// Composite state whose nested definition holds `state`.
    pub fn superstate(&self, state: StateId) -> Option<StateId> {
        let owner = self.state(state).ok()?.owner;
        self.definition(owner).ok()?.submachine_state
    }

    /// Definition enclosing `definition`, `None` for the root.
    pub fn superdefinition(&self, definition: DefinitionId) -> Option<DefinitionId> {
        let parent = self.definition(definition).ok()?.submachine_state?;
        self.state(parent).ok().map(|s| s.owner)
    }

    /// `definition` followed by every enclosing definition, outermost last.
    pub fn definition_chain(&self, definition: DefinitionId) -> Vec<DefinitionId> {
        let mut chain = vec![definition];
        let mut current = definition;
        while let Some(parent) = self.superdefinition(current) {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Outermost definition enclosing `definition`.
    pub fn root_definition(&self, definition: DefinitionId) -> DefinitionId {
        self.definition_chain(definition)
            .last()
            .copied()
            .unwrap_or(definition)
    }

    /// True when `definition` is `scope` or nested somewhere inside it.
    pub fn is_within(&self, definition: DefinitionId, scope: DefinitionId) -> bool {
        self.definition_chain(definition).contains(&scope)
    }

    /// `state` followed by its superstates, innermost first.
    pub fn ancestors(&self, state: StateId) -> Vec<StateId> {
        let mut ancestors = vec![state];
        let mut current = state;
        while let Some(parent) = self.superstate(current) {
            ancestors.push(parent);
            current = parent;
        }
        ancestors
    }

    /// True when `state` is nested (at any depth) inside `other`.
    pub fn is_substate_of(&self, state: StateId, other: StateId) -> bool {
        state != other && self.ancestors(state).contains(&other)
    }

    pub fn is_superstate_of(&self, state: StateId, other: StateId) -> bool {
        self.is_substate_of(other, state)
    }

    /// Follows composite states down to the start state they enter first.
    pub fn resolve_entry_target(&self, state: StateId) -> StateId {
        let mut current = state;
        while let Some(start) = self
            .state(current)
            .ok()
            .and_then(|s| s.submachine)
            .and_then(|d| self.definition(d).ok())
            .and_then(|d| d.start_state)
        {
            current = start;
        }
        current
    }

    /// Path of a definition: the path of its composite state, empty for the root.
    pub fn path_of_definition(&self, definition: DefinitionId) -> String {
        match self
            .definition(definition)
            .ok()
            .and_then(|d| d.submachine_state)
        {
            Some(state) => self.path_of_state(state),
            None => String::new(),
        }
    }

    pub fn path_of_state(&self, id: StateId) -> String {
        match self.state(id) {
            Ok(state) => join_path(&self.path_of_definition(state.owner), state.name()),
            Err(_) => id.to_string(),
        }
    }

    pub fn path_of_transition(&self, id: TransitionId) -> String {
        match self.transition(id) {
            Ok(t) => join_path(&self.path_of_definition(t.owner), t.name()),
            Err(_) => id.to_string(),
        }
    }

    /// Path of a definition, or its name for the root.
    pub fn definition_label(&self, definition: DefinitionId) -> String {
        let path = self.path_of_definition(definition);
        if path.is_empty() {
            self.definition(definition)
                .map(|d| d.name().to_string())
                .unwrap_or_else(|_| definition.to_string())
        } else {
            path
        }
    }

    /// Resolves `a::b::c` starting from the root definition.
    pub fn state_by_path(&self, path: &str) -> Result<StateId, GraphError> {
        let unknown = || GraphError::UnknownState {
            path: path.to_string(),
        };
        let segments = split_path(path);
        let (last, parents) = segments.split_last().ok_or_else(unknown)?;
        let definition = self.descend(parents).ok_or_else(unknown)?;
        self.state_named(definition, last).ok_or_else(unknown)
    }

    pub fn transition_by_path(&self, path: &str) -> Result<TransitionId, GraphError> {
        let unknown = || GraphError::UnknownTransition {
            path: path.to_string(),
        };
        let segments = split_path(path);
        let (last, parents) = segments.split_last().ok_or_else(unknown)?;
        let definition = self.descend(parents).ok_or_else(unknown)?;
        self.transition_named(definition, last).ok_or_else(unknown)
    }

    /// The empty path names the root definition.
    pub fn definition_by_path(&self, path: &str) -> Result<DefinitionId, GraphError> {
        self.descend(&split_path(path))
            .ok_or_else(|| GraphError::UnknownDefinition {
                path: path.to_string(),
            })
    }

    fn descend(&self, composites: &[&str]) -> Option<DefinitionId> {
        composites.iter().try_fold(self.root, |definition, name| {
            let state = self.state_named(definition, name)?;
            self.state(state).ok()?.submachine
        })
    }

    fn neighbours(&self, id: StateId) -> Option<&Neighbours> {
        let state = self.state(id).ok()?;
        Some(state.neighbours.get_or_init(|| self.compute_neighbours(state)))
    }

    fn compute_neighbours(&self, state: &StateDefinition) -> Neighbours {
        let mut neighbours = Neighbours::default();
        for t in &state.incoming {
            if let Ok(transition) = self.transition(*t) {
                if !neighbours.sources.contains(&transition.source) {
                    neighbours.sources.push(transition.source);
                }
            }
        }
        for t in &state.outgoing {
            if let Ok(transition) = self.transition(*t) {
                if !neighbours.targets.contains(&transition.target) {
                    neighbours.targets.push(transition.target);
                }
            }
        }
        for t in state.incoming.iter().chain(&state.outgoing) {
            if !neighbours.transitions.contains(t) {
                neighbours.transitions.push(*t);
            }
        }
        neighbours
    }

    /// States with a transition into `state`.
    pub fn sources(&self, state: StateId) -> &[StateId] {
        self.neighbours(state)
            .map(|n| n.sources.as_slice())
            .unwrap_or_default()
    }

    /// States reachable from `state` through one transition.
    pub fn targets(&self, state: StateId) -> &[StateId] {
        self.neighbours(state)
            .map(|n| n.targets.as_slice())
            .unwrap_or_default()
    }

    /// Transitions entering or leaving `state`.
    pub fn incident_transitions(&self, state: StateId) -> &[TransitionId] {
        self.neighbours(state)
            .map(|n| n.transitions.as_slice())
            .unwrap_or_default()
    }

    /// Depth-first walk: each state is followed by the states nested in it.
    pub fn walk_states(&self, definition: DefinitionId) -> Vec<StateId> {
        let mut out = Vec::new();
        self.walk_states_into(definition, &mut out);
        out
    }

    fn walk_states_into(&self, definition: DefinitionId, out: &mut Vec<StateId>) {
        let Ok(def) = self.definition(definition) else {
            return;
        };
        for state in &def.states {
            out.push(*state);
            if let Some(nested) = self.state(*state).ok().and_then(|s| s.submachine) {
                self.walk_states_into(nested, out);
            }
        }
    }

    /// Transitions of `definition`, then those of each nested definition.
    pub fn walk_transitions(&self, definition: DefinitionId) -> Vec<TransitionId> {
        let mut out = Vec::new();
        self.walk_transitions_into(definition, &mut out);
        out
    }

    fn walk_transitions_into(&self, definition: DefinitionId, out: &mut Vec<TransitionId>) {
        let Ok(def) = self.definition(definition) else {
            return;
        };
        out.extend_from_slice(&def.transitions);
        for state in &def.states {
            if let Some(nested) = self.state(*state).ok().and_then(|s| s.submachine) {
                self.walk_transitions_into(nested, out);
            }
        }
    }

    /// Deep-copies the subtree rooted at `definition` into a new graph whose
    /// root is the copy.
    ///
    /// Transitions leaving the subtree are not copied. The returned map
    /// translates handles of this graph into handles of the copy.
    pub fn copy_definition(
        &self,
        definition: DefinitionId,
    ) -> Result<(Graph, GraphCopy), GraphError> {
        self.definition(definition)?;
        let mut copier = Copier::new(self, Graph::empty());
        let root = copier
            .copy(NodeRef::Definition(definition))
            .and_then(NodeRef::definition);
        link_transitions(&mut copier);
        let (mut graph, map) = copier.finish();
        if let Some(root) = root {
            graph.root = root;
        }
        Ok((graph, GraphCopy { map }))
    }
}

/// Key of any node in a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Definition(DefinitionId),
    State(StateId),
    Transition(TransitionId),
}

impl NodeRef {
    pub fn definition(self) -> Option<DefinitionId> {
        match self {
            Self::Definition(id) => Some(id),
            _ => None,
        }
    }

    pub fn state(self) -> Option<StateId> {
        match self {
            Self::State(id) => Some(id),
            _ => None,
        }
    }

    pub fn transition(self) -> Option<TransitionId> {
        match self {
            Self::Transition(id) => Some(id),
            _ => None,
        }
    }
}

/// Handle translation produced by [`Graph::copy_definition`].
#[derive(Debug, Clone, Default)]
pub struct GraphCopy {
    map: HashMap<NodeRef, NodeRef>,
}

impl GraphCopy {
    pub fn definition(&self, id: DefinitionId) -> Option<DefinitionId> {
        self.map
            .get(&NodeRef::Definition(id))
            .and_then(|n| n.definition())
    }

    pub fn state(&self, id: StateId) -> Option<StateId> {
        self.map.get(&NodeRef::State(id)).and_then(|n| n.state())
    }

    pub fn transition(&self, id: TransitionId) -> Option<TransitionId> {
        self.map
            .get(&NodeRef::Transition(id))
            .and_then(|n| n.transition())
    }

    /// Number of copied nodes.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Structure for Graph {
    type Key = NodeRef;

    fn shallow_clone(&self, key: NodeRef, target: &mut Graph) -> Option<NodeRef> {
        match key {
            NodeRef::Definition(id) => {
                let definition = self.definition(id).ok()?.clone();
                Some(NodeRef::Definition(target.push_definition(definition)))
            }
            NodeRef::State(id) => {
                let mut state = self.state(id).ok()?.clone();
                // re-linked as the copied transitions are deepened
                state.incoming.clear();
                state.outgoing.clear();
                state.invalidate();
                Some(NodeRef::State(target.push_state(state)))
            }
            NodeRef::Transition(id) => {
                let transition = self.transition(id).ok()?.clone();
                Some(NodeRef::Transition(target.push_transition(transition)))
            }
        }
    }

    fn deepen(copier: &mut Copier<'_, Self>, key: NodeRef) {
        match key {
            NodeRef::Definition(id) => deepen_definition(copier, id),
            NodeRef::State(id) => deepen_state(copier, id),
            NodeRef::Transition(id) => deepen_transition(copier, id),
        }
    }
}

fn deepen_definition(copier: &mut Copier<'_, Graph>, id: DefinitionId) {
    let Ok(def) = copier.target().definition(id) else {
        return;
    };
    let states = def.states.clone();
    let (parent, start, end) = (def.submachine_state, def.start_state, def.end_state);

    // transitions still hold source handles; `link_transitions` maps them
    // once the whole subtree is copied
    let states: Vec<StateId> = states
        .into_iter()
        .filter_map(|s| copier.copy(NodeRef::State(s)).and_then(NodeRef::state))
        .collect();

    let lookup = |copier: &Copier<'_, Graph>, s: Option<StateId>| {
        s.and_then(|s| copier.get(NodeRef::State(s)))
            .and_then(NodeRef::state)
    };
    let parent = lookup(copier, parent);
    let start = lookup(copier, start);
    let end = lookup(copier, end);

    if let Ok(def) = copier.target_mut().definition_mut(id) {
        def.states = states;
        def.submachine_state = parent;
        def.start_state = start;
        def.end_state = end;
    }
}

/// Copies the transitions of every copied definition. Runs after all states
/// are mapped; an edge with an endpoint outside the subtree is dropped.
fn link_transitions(copier: &mut Copier<'_, Graph>) {
    let definitions: Vec<DefinitionId> = copier.target().definitions().map(|d| d.id()).collect();
    for id in definitions {
        let Ok(def) = copier.target().definition(id) else {
            continue;
        };
        let pending = def.transitions.clone();

        let source = copier.source();
        let inside: Vec<TransitionId> = pending
            .into_iter()
            .filter(|t| {
                source.transition(*t).is_ok_and(|t| {
                    copier.contains(NodeRef::State(t.source))
                        && copier.contains(NodeRef::State(t.target))
                })
            })
            .collect();
        let transitions: Vec<TransitionId> = inside
            .into_iter()
            .filter_map(|t| {
                copier
                    .copy(NodeRef::Transition(t))
                    .and_then(NodeRef::transition)
            })
            .collect();

        if let Ok(def) = copier.target_mut().definition_mut(id) {
            def.transitions = transitions;
        }
    }
}

fn deepen_state(copier: &mut Copier<'_, Graph>, id: StateId) {
    let Ok(state) = copier.target().state(id) else {
        return;
    };
    let (owner, submachine) = (state.owner, state.submachine);
    let owner = copier
        .copy(NodeRef::Definition(owner))
        .and_then(NodeRef::definition);
    let submachine = submachine
        .and_then(|d| copier.copy(NodeRef::Definition(d)))
        .and_then(NodeRef::definition);

    if let Ok(state) = copier.target_mut().state_mut(id) {
        if let Some(owner) = owner {
            state.owner = owner;
        }
        state.submachine = submachine;
    }
}

fn deepen_transition(copier: &mut Copier<'_, Graph>, id: TransitionId) {
    let Ok(transition) = copier.target().transition(id) else {
        return;
    };
    let (owner, source, target) = (transition.owner, transition.source, transition.target);
    let owner = copier
        .copy(NodeRef::Definition(owner))
        .and_then(NodeRef::definition);
    let source = copier.get(NodeRef::State(source)).and_then(NodeRef::state);
    let target = copier.get(NodeRef::State(target)).and_then(NodeRef::state);

    let (Some(owner), Some(source), Some(target)) = (owner, source, target) else {
        return;
    };
    let graph = copier.target_mut();
    if let Ok(transition) = graph.transition_mut(id) {
        transition.owner = owner;
        transition.source = source;
        transition.target = target;
    }
    if let Ok(state) = graph.state_mut(source) {
        state.outgoing.push(id);
    }
    if let Ok(state) = graph.state_mut(target) {
        state.incoming.push(id);
    }
}
