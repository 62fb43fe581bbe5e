//! Builder for constructing definition graphs.

use crate::builder::error::BuildError;
use crate::builder::state::StateBuilder;
use crate::builder::transition::{TransitionBuilder, TransitionPlan};
use crate::core::{
    Action, Behavior, DefinitionId, Graph, StateDefinition, StateId, TransitionDefinition,
};
use crate::error::GraphError;

/// Builder for a definition and everything nested in it.
///
/// # Example
///
/// ```rust
/// use statewalk::builder::{GraphBuilder, StateBuilder, TransitionBuilder};
///
/// let graph = GraphBuilder::new("door")
///     .initial("closed")
///     .final_state("removed")
///     .state(StateBuilder::new("open").entry("creak"))
///     .transition(TransitionBuilder::new().from("closed").to("open").trigger("push"))
///     .unwrap()
///     .transition(TransitionBuilder::new().from("open").to("closed").trigger("pull"))
///     .unwrap()
///     .transition(TransitionBuilder::new().from("open").to("removed"))
///     .unwrap()
///     .build()
///     .unwrap();
///
/// assert!(graph.state_by_path("open").is_ok());
/// assert!(graph.transition_by_path("closed->open").is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    name: String,
    initial: Option<String>,
    final_state: Option<String>,
    states: Vec<StateBuilder>,
    composites: Vec<(String, GraphBuilder)>,
    transitions: Vec<TransitionPlan>,
    options: Vec<(Action, Behavior)>,
}

impl GraphBuilder {
    /// Create a new builder for a definition called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            initial: None,
            final_state: None,
            states: Vec::new(),
            composites: Vec::new(),
            transitions: Vec::new(),
            options: Vec::new(),
        }
    }

    /// Set the start state.
    pub fn initial(mut self, state: impl Into<String>) -> Self {
        self.initial = Some(state.into());
        self
    }

    /// Set the end state.
    pub fn final_state(mut self, state: impl Into<String>) -> Self {
        self.final_state = Some(state.into());
        self
    }

    /// Declare a state with behaviors. A later declaration of the same name
    /// replaces the earlier one.
    pub fn state(mut self, state: StateBuilder) -> Self {
        match self.states.iter_mut().find(|s| s.name == state.name) {
            Some(existing) => *existing = state,
            None => self.states.push(state),
        }
        self
    }

    /// Nest a definition inside the state `state`, making it composite.
    pub fn composite(mut self, state: impl Into<String>, nested: GraphBuilder) -> Self {
        self.composites.push((state.into(), nested));
        self
    }

    /// Add a transition using a builder.
    /// Returns an error if the builder fails validation.
    pub fn transition(mut self, builder: TransitionBuilder) -> Result<Self, BuildError> {
        self.transitions.push(builder.build()?);
        Ok(self)
    }

    /// Fallback behavior for `action` on every element of this definition.
    pub fn option(mut self, action: Action, behavior: impl Into<Behavior>) -> Self {
        self.options.push((action, behavior.into()));
        self
    }

    /// Build a new graph whose root is this definition.
    pub fn build(self) -> Result<Graph, BuildError> {
        let mut graph = Graph::new(self.name.clone());
        let root = graph.root();
        self.install(&mut graph, root)?;
        Ok(graph)
    }

    /// Add this builder's contents to an existing definition.
    ///
    /// States that already exist keep their identity; declared behaviors are
    /// applied to them.
    pub fn extend(self, graph: &mut Graph, definition: DefinitionId) -> Result<(), BuildError> {
        graph.definition(definition)?;
        self.install(graph, definition)
    }

    fn install(self, graph: &mut Graph, definition: DefinitionId) -> Result<(), BuildError> {
        for state in self.states {
            declare(graph, definition, state)?;
        }
        let named = self
            .initial
            .iter()
            .chain(&self.final_state)
            .chain(self.composites.iter().map(|(name, _)| name));
        for name in named {
            local_state(graph, definition, name)?;
        }
        for plan in &self.transitions {
            for name in [&plan.from, &plan.to] {
                if resolve(graph, definition, name).is_none() {
                    graph.add_state(definition, StateDefinition::new(name.as_str()))?;
                }
            }
        }

        if let Some(name) = &self.initial {
            let state = local_state(graph, definition, name)?;
            graph.set_start_state(definition, Some(state))?;
        }
        if let Some(name) = &self.final_state {
            let state = local_state(graph, definition, name)?;
            graph.set_end_state(definition, Some(state))?;
        }
        for (action, behavior) in self.options {
            graph.set_option(definition, action, behavior)?;
        }

        for (name, nested) in self.composites {
            let state = local_state(graph, definition, &name)?;
            let nested_def = graph.attach_submachine(state, nested.name.clone())?;
            nested.install(graph, nested_def)?;
        }

        for plan in self.transitions {
            add_transition(graph, definition, plan)?;
        }
        Ok(())
    }
}

fn declare(graph: &mut Graph, definition: DefinitionId, state: StateBuilder) -> Result<(), BuildError> {
    match graph.state_named(definition, &state.name) {
        Some(existing) => {
            for (action, behavior) in state.behaviors() {
                graph.set_state_behavior(existing, action, behavior.clone())?;
            }
        }
        None => {
            graph.add_state(definition, state.into_definition())?;
        }
    }
    Ok(())
}

/// The state called `name` in `definition`, declared on first use.
fn local_state(graph: &mut Graph, definition: DefinitionId, name: &str) -> Result<StateId, BuildError> {
    match graph.state_named(definition, name) {
        Some(state) => Ok(state),
        None => Ok(graph.add_state(definition, StateDefinition::new(name))?),
    }
}

/// Looks `name` up in `definition`, then outward.
fn resolve(graph: &Graph, definition: DefinitionId, name: &str) -> Option<StateId> {
    graph
        .definition_chain(definition)
        .into_iter()
        .find_map(|d| graph.state_named(d, name))
}

fn add_transition(
    graph: &mut Graph,
    definition: DefinitionId,
    plan: TransitionPlan,
) -> Result<(), BuildError> {
    let unknown = |name: &str| GraphError::UnknownState {
        path: name.to_string(),
    };
    let source = resolve(graph, definition, &plan.from).ok_or_else(|| unknown(&plan.from))?;
    let target = resolve(graph, definition, &plan.to).ok_or_else(|| unknown(&plan.to))?;
    let name = match plan.name {
        Some(name) => name,
        None => unique_name(graph, definition, &format!("{}->{}", plan.from, plan.to)),
    };

    let mut transition = TransitionDefinition::new(name, source, target)
        .with_kind(plan.kind)
        .with_guard(plan.guard)
        .with_effect(plan.effect);
    for trigger in plan.triggers {
        transition = transition.with_trigger(trigger);
    }
    for (key, value) in plan.metadata {
        transition = transition.with_metadata(key, value);
    }
    graph.add_transition(definition, transition)?;
    Ok(())
}

/// `base`, or `base-2`, `base-3`... whichever is free first.
fn unique_name(graph: &Graph, definition: DefinitionId, base: &str) -> String {
    let mut candidate = base.to_string();
    let mut n = 2;
    while graph.transition_named(definition, &candidate).is_some() {
        candidate = format!("{base}-{n}");
        n += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StateKind;

    fn door() -> GraphBuilder {
        GraphBuilder::new("door")
            .initial("closed")
            .final_state("gone")
            .transition(TransitionBuilder::new().from("closed").to("open"))
            .unwrap()
            .transition(TransitionBuilder::new().from("open").to("gone"))
            .unwrap()
    }

    #[test]
    fn builder_declares_endpoints_and_marks_start_and_end() {
        let graph = door().build().unwrap();
        let root = graph.definition(graph.root()).unwrap();

        assert_eq!(root.name(), "door");
        assert_eq!(root.states().len(), 3);
        let closed = graph.state_by_path("closed").unwrap();
        let gone = graph.state_by_path("gone").unwrap();
        assert_eq!(root.start_state(), Some(closed));
        assert_eq!(root.end_state(), Some(gone));
        assert_eq!(graph.state(closed).unwrap().kind(), StateKind::Start);
        assert_eq!(graph.state(gone).unwrap().kind(), StateKind::End);
    }

    #[test]
    fn default_names_are_deduplicated() {
        let graph = door()
            .transition(TransitionBuilder::new().from("closed").to("open").trigger("kick"))
            .unwrap()
            .transition(TransitionBuilder::new().from("closed").to("open"))
            .unwrap()
            .build()
            .unwrap();

        assert!(graph.transition_by_path("closed->open").is_ok());
        assert!(graph.transition_by_path("closed->open-2").is_ok());
        assert!(graph.transition_by_path("closed->open-3").is_ok());
    }

    #[test]
    fn explicit_duplicate_names_are_rejected() {
        let result = door()
            .transition(TransitionBuilder::new().from("open").to("closed").name("closed->open"))
            .unwrap()
            .build();
        assert!(matches!(
            result,
            Err(BuildError::Graph(GraphError::DuplicateName { .. }))
        ));
    }

    #[test]
    fn nested_transitions_reach_outer_states() {
        let graph = GraphBuilder::new("job")
            .initial("queued")
            .final_state("done")
            .composite(
                "working",
                GraphBuilder::new("steps")
                    .initial("fetch")
                    .transition(TransitionBuilder::new().from("fetch").to("build"))
                    .unwrap()
                    .transition(TransitionBuilder::new().from("build").to("done"))
                    .unwrap(),
            )
            .transition(TransitionBuilder::new().from("queued").to("working"))
            .unwrap()
            .build()
            .unwrap();

        let done = graph.state_by_path("done").unwrap();
        let escape = graph.transition_by_path("working::build->done").unwrap();
        assert_eq!(graph.transition(escape).unwrap().target(), done);
        assert!(graph.state_by_path("working::done").is_err());

        let working = graph.state_by_path("working").unwrap();
        let fetch = graph.state_by_path("working::fetch").unwrap();
        assert_eq!(graph.resolve_entry_target(working), fetch);
        assert_eq!(
            graph
                .definition(graph.state(working).unwrap().submachine().unwrap())
                .unwrap()
                .name(),
            "steps"
        );
    }

    #[test]
    fn extend_adds_to_existing_definition() {
        let mut graph = door().build().unwrap();
        let root = graph.root();
        GraphBuilder::new("more")
            .state(StateBuilder::new("open").entry("creak"))
            .transition(TransitionBuilder::new().from("open").to("closed"))
            .unwrap()
            .extend(&mut graph, root)
            .unwrap();

        let open = graph.state_by_path("open").unwrap();
        assert!(!graph.state(open).unwrap().behavior(Action::Entry).is_none());
        assert!(graph.transition_by_path("open->closed").is_ok());
        assert_eq!(graph.definition(root).unwrap().states().len(), 3);
    }

    #[test]
    fn options_are_installed_on_the_definition() {
        let graph = door().option(Action::Guard, "allowed").build().unwrap();
        let root = graph.definition(graph.root()).unwrap();
        assert!(matches!(root.option(Action::Guard), Some(Behavior::Named(n)) if n == "allowed"));
    }
}
