//! Structural defects reported by validation.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    NoStartState,
    NoEndState,
    StateWithoutTransitions,
    EndStateCannotBeReached,
    EndStateHasOutboundTransitions,
    StartStateHasNoOutboundTransitions,
    StateHasNoInboundTransitions,
    StateHasNoOutboundTransitions,
    EndStateHasSubstates,
}

impl FindingKind {
    /// Stable snake_case identifier.
    pub fn code(self) -> &'static str {
        match self {
            Self::NoStartState => "no_start_state",
            Self::NoEndState => "no_end_state",
            Self::StateWithoutTransitions => "state_without_transitions",
            Self::EndStateCannotBeReached => "end_state_cannot_be_reached",
            Self::EndStateHasOutboundTransitions => "end_state_has_outbound_transitions",
            Self::StartStateHasNoOutboundTransitions => "start_state_has_no_outbound_transitions",
            Self::StateHasNoInboundTransitions => "state_has_no_inbound_transitions",
            Self::StateHasNoOutboundTransitions => "state_has_no_outbound_transitions",
            Self::EndStateHasSubstates => "end_state_has_substates",
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One defect and the path of the definition or state it was found on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
#[error("{kind} at '{element}'")]
pub struct Finding {
    pub kind: FindingKind,
    pub element: String,
}

impl Finding {
    pub fn new(kind: FindingKind, element: impl Into<String>) -> Self {
        Self {
            kind,
            element: element.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_kind_and_element() {
        let finding = Finding::new(FindingKind::EndStateHasSubstates, "done");
        assert_eq!(finding.to_string(), "end_state_has_substates at 'done'");
    }

    #[test]
    fn kind_serializes_as_code() {
        let json = serde_json::to_string(&FindingKind::NoStartState).unwrap();
        assert_eq!(json, "\"no_start_state\"");
    }
}
