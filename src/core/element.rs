//! Handles, names and paths shared by every graph element.
//!
//! States, transitions and definitions live in a [`Graph`](super::Graph)
//! arena and refer to each other through the copyable handles defined here.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Separator between the segments of a state or transition path.
pub const SEP: &str = "::";

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub(crate) const DETACHED: Self = Self(u32::MAX);

            pub(crate) fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            /// Position of the element inside its arena.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

handle!(
    /// Handle of a [`StateDefinition`](super::StateDefinition).
    StateId,
    "state"
);
handle!(
    /// Handle of a [`TransitionDefinition`](super::TransitionDefinition).
    TransitionId,
    "transition"
);
handle!(
    /// Handle of a [`StateMachineDefinition`](super::StateMachineDefinition).
    DefinitionId,
    "definition"
);

/// Name and free-form metadata carried by states, transitions and definitions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementData {
    pub name: String,
    pub metadata: BTreeMap<String, Value>,
}

impl ElementData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: BTreeMap::new(),
        }
    }
}

/// Anything with an [`ElementData`] block.
pub trait Named {
    fn element(&self) -> &ElementData;

    fn name(&self) -> &str {
        &self.element().name
    }

    fn metadata(&self, key: &str) -> Option<&Value> {
        self.element().metadata.get(key)
    }
}

/// Joins path segments with [`SEP`], skipping empty prefixes.
pub fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}{SEP}{name}")
    }
}

/// Splits a path into its segments. An empty path has no segments.
pub fn split_path(path: &str) -> Vec<&str> {
    if path.is_empty() {
        Vec::new()
    } else {
        path.split(SEP).collect()
    }
}
