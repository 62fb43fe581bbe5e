//! Structural checks over a definition and everything nested in it.
//!
//! Every check contributes a `Validation`, and the results are combined with
//! `Validation::all_vec` so one pass reports every defect.

use super::findings::{Finding, FindingKind};
use crate::core::{DefinitionId, Graph, StateId, StateKind};
use crate::error::MachineError;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Result of checking a definition.
pub type Checked = Validation<(), NonEmptyVec<Finding>>;

fn require(ok: bool, kind: FindingKind, element: impl FnOnce() -> String) -> Checked {
    if ok {
        Validation::success(())
    } else {
        Validation::fail(Finding::new(kind, element()))
    }
}

/// Checks `definition` and, recursively, each nested definition.
pub fn check(graph: &Graph, definition: DefinitionId) -> Checked {
    let mut checks = Vec::new();
    collect(graph, definition, &mut checks);
    Validation::all_vec(checks).map(|_| ())
}

fn collect(graph: &Graph, definition: DefinitionId, checks: &mut Vec<Checked>) {
    let Ok(def) = graph.definition(definition) else {
        return;
    };
    let label = || graph.definition_label(definition);
    checks.push(require(
        def.start_state().is_some(),
        FindingKind::NoStartState,
        label,
    ));
    checks.push(require(
        def.end_state().is_some(),
        FindingKind::NoEndState,
        label,
    ));

    for state in def.states() {
        checks.extend(check_state(graph, *state));
        if let Some(nested) = graph.state(*state).ok().and_then(|s| s.submachine()) {
            collect(graph, nested, checks);
        }
    }
}

fn check_state(graph: &Graph, id: StateId) -> Vec<Checked> {
    let Ok(state) = graph.state(id) else {
        return Vec::new();
    };
    let path = || graph.path_of_state(id);
    let has_other = |states: &[StateId]| states.iter().any(|s| *s != id);
    let sources = graph.sources(id);
    let targets = graph.targets(id);

    let mut checks = vec![require(
        !graph.incident_transitions(id).is_empty(),
        FindingKind::StateWithoutTransitions,
        path,
    )];
    match state.kind() {
        StateKind::End => {
            checks.push(require(
                has_other(sources),
                FindingKind::EndStateCannotBeReached,
                path,
            ));
            checks.push(require(
                targets.is_empty(),
                FindingKind::EndStateHasOutboundTransitions,
                path,
            ));
            checks.push(require(
                !state.is_composite(),
                FindingKind::EndStateHasSubstates,
                path,
            ));
        }
        StateKind::Start => checks.push(require(
            !targets.is_empty(),
            FindingKind::StartStateHasNoOutboundTransitions,
            path,
        )),
        StateKind::Normal => {
            checks.push(require(
                has_other(sources),
                FindingKind::StateHasNoInboundTransitions,
                path,
            ));
            checks.push(require(
                has_other(targets),
                FindingKind::StateHasNoOutboundTransitions,
                path,
            ));
        }
    }
    checks
}

/// Every finding for `definition`, in discovery order.
pub fn validate(graph: &Graph, definition: DefinitionId) -> Vec<Finding> {
    match check(graph, definition) {
        Validation::Success(()) => Vec::new(),
        Validation::Failure(findings) => findings.iter().cloned().collect(),
    }
}

pub fn is_valid(graph: &Graph, definition: DefinitionId) -> bool {
    matches!(check(graph, definition), Validation::Success(()))
}

/// Fails with [`MachineError::ObjectInvalid`] unless the definition is clean.
pub fn validate_strict(graph: &Graph, definition: DefinitionId) -> Result<(), MachineError> {
    let findings = validate(graph, definition);
    if findings.is_empty() {
        Ok(())
    } else {
        Err(MachineError::ObjectInvalid { findings })
    }
}
