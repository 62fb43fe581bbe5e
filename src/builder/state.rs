//! Builder for states.

use crate::core::{Action, Behavior, StateDefinition};
use serde_json::Value;

/// Behaviors and metadata for one state.
#[derive(Debug, Clone)]
pub struct StateBuilder {
    pub(crate) name: String,
    entry: Behavior,
    exit: Behavior,
    do_activity: Behavior,
    metadata: Vec<(String, Value)>,
}

impl StateBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entry: Behavior::None,
            exit: Behavior::None,
            do_activity: Behavior::None,
            metadata: Vec::new(),
        }
    }

    /// Behavior run when the state is entered.
    pub fn entry(mut self, behavior: impl Into<Behavior>) -> Self {
        self.entry = behavior.into();
        self
    }

    pub fn exit(mut self, behavior: impl Into<Behavior>) -> Self {
        self.exit = behavior.into();
        self
    }

    /// Behavior run after entry completes, once the state is active.
    pub fn do_activity(mut self, behavior: impl Into<Behavior>) -> Self {
        self.do_activity = behavior.into();
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.push((key.into(), value));
        self
    }

    /// Non-empty behavior slots.
    pub(crate) fn behaviors(&self) -> impl Iterator<Item = (Action, &Behavior)> {
        [
            (Action::Entry, &self.entry),
            (Action::Exit, &self.exit),
            (Action::DoActivity, &self.do_activity),
        ]
        .into_iter()
        .filter(|(_, b)| !b.is_none())
    }

    pub(crate) fn into_definition(self) -> StateDefinition {
        let mut state = StateDefinition::new(self.name)
            .with_entry(self.entry)
            .with_exit(self.exit)
            .with_do_activity(self.do_activity);
        for (key, value) in self.metadata {
            state = state.with_metadata(key, value);
        }
        state
    }
}
