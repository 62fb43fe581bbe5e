//! Events fed to a machine and the triggers that select transitions for them.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A named occurrence with optional arguments.
///
/// Events are queued on a machine and matched against the triggers of the
/// transitions leaving the active state (and its superstates).
///
/// # Example
///
/// ```rust
/// use statewalk::core::Event;
/// use serde_json::json;
///
/// let event = Event::new("deposit").with_arg(json!(25));
/// assert_eq!(event.name, "deposit");
/// assert_eq!(event.args.len(), 1);
///
/// let bare: Event = "tick".into();
/// assert!(bare.args.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: Value) -> Self {
        self.args.push(arg);
        self
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = Value>) -> Self {
        self.args.extend(args);
        self
    }
}

impl From<&str> for Event {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Event {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Predicate form of a trigger.
pub type EventPredicate = dyn Fn(&Event) -> bool + Send + Sync;

/// Condition under which a transition reacts to an event.
#[derive(Clone)]
pub enum Trigger {
    /// Matches an event whose name equals the tag.
    Tag(String),
    /// Matches an event whose name matches the pattern.
    Pattern(Regex),
    /// Matches whenever the predicate accepts the event.
    Predicate {
        label: String,
        test: Arc<EventPredicate>,
    },
}

impl Trigger {
    pub fn tag(name: impl Into<String>) -> Self {
        Self::Tag(name.into())
    }

    /// Compiles `pattern` into a [`Trigger::Pattern`].
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self::Pattern)
    }

    pub fn predicate<F>(label: impl Into<String>, test: F) -> Self
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        Self::Predicate {
            label: label.into(),
            test: Arc::new(test),
        }
    }

    pub fn matches(&self, event: &Event) -> bool {
        match self {
            Self::Tag(tag) => *tag == event.name,
            Self::Pattern(re) => re.is_match(&event.name),
            Self::Predicate { test, .. } => test(event),
        }
    }

    /// Text recorded in history when this trigger fires a transition.
    pub fn label(&self) -> &str {
        match self {
            Self::Tag(tag) => tag,
            Self::Pattern(re) => re.as_str(),
            Self::Predicate { label, .. } => label,
        }
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(tag) => f.debug_tuple("Tag").field(tag).finish(),
            Self::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Self::Predicate { label, .. } => f.debug_tuple("Predicate").field(label).finish(),
        }
    }
}

impl From<&str> for Trigger {
    fn from(tag: &str) -> Self {
        Self::tag(tag)
    }
}

impl From<Regex> for Trigger {
    fn from(re: Regex) -> Self {
        Self::Pattern(re)
    }
}
