//! Snapshot and restore functionality for machines.
//!
//! A [`Snapshot`] captures where a machine is, by path name rather than by
//! handle, so it can be restored into any machine bound to an equivalent
//! definition, including one built in another process. Behaviors are not
//! part of a snapshot.
//!
//! # Example
//!
//! ```rust
//! use statewalk::builder::{GraphBuilder, TransitionBuilder};
//! use statewalk::checkpoint::Snapshot;
//! use statewalk::engine::Machine;
//! use std::sync::Arc;
//!
//! let graph = Arc::new(
//!     GraphBuilder::new("job")
//!         .initial("queued")
//!         .final_state("done")
//!         .transition(TransitionBuilder::new().from("queued").to("done"))
//!         .unwrap()
//!         .build()
//!         .unwrap(),
//! );
//!
//! let mut machine = Machine::new(Arc::clone(&graph));
//! machine.start(&mut (), &[]).unwrap();
//! let json = machine.to_snapshot().to_json().unwrap();
//!
//! let mut resumed = Machine::new(graph);
//! resumed.restore(&Snapshot::from_json(&json).unwrap()).unwrap();
//! assert_eq!(resumed.active_path().as_deref(), Some("queued"));
//! ```

use crate::core::{Event, HistoryRecord, StateId, TransitionId};
use crate::engine::{Machine, PendingTransition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub mod error;

pub use error::CheckpointError;

/// Version identifier for snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// A queued transition and its arguments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueuedTransition {
    /// Path of the transition
    pub transition: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// History record with handles replaced by paths.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub time: DateTime<Utc>,
    pub previous_state: Option<String>,
    pub transition: Option<String>,
    pub new_state: String,
    pub event: Option<Event>,
    pub trigger: Option<String>,
    pub data: Option<Value>,
}

/// Serializable snapshot of a machine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot format version
    pub version: u32,

    /// Unique snapshot identifier
    pub id: Uuid,

    /// Machine the snapshot was taken from
    pub machine: Uuid,

    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,

    /// Path of the definition the machine runs, its name for a root
    pub definition: String,

    pub active_state: Option<String>,

    #[serde(default)]
    pub transition_queue: Vec<QueuedTransition>,

    #[serde(default)]
    pub event_queue: Vec<Event>,

    /// Carried for inspection; restoring leaves the target's history alone.
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl Snapshot {
    pub fn capture(machine: &Machine) -> Self {
        let graph = machine.graph();
        let state_path = |s: StateId| graph.path_of_state(s);
        let transition_path = |t: TransitionId| graph.path_of_transition(t);

        let history = machine
            .history()
            .records()
            .into_iter()
            .map(|r: HistoryRecord| HistoryEntry {
                time: r.time,
                previous_state: r.previous_state.map(state_path),
                transition: r.transition.map(transition_path),
                new_state: state_path(r.new_state),
                event: r.event,
                trigger: r.trigger,
                data: r.data,
            })
            .collect();

        Self {
            version: SNAPSHOT_VERSION,
            id: Uuid::new_v4(),
            machine: machine.id(),
            taken_at: Utc::now(),
            definition: graph.definition_label(machine.definition()),
            active_state: machine.active_state().map(state_path),
            transition_queue: machine
                .pending_transition()
                .map(|p| QueuedTransition {
                    transition: transition_path(p.transition),
                    args: p.args.clone(),
                })
                .into_iter()
                .collect(),
            event_queue: machine.event_queue().iter().cloned().collect(),
            history,
        }
    }

    pub fn to_json(&self) -> Result<String, CheckpointError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        let snapshot: Self = serde_json::from_str(json)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    /// Compact binary form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CheckpointError> {
        let packed = PackedSnapshot::pack(self)?;
        bincode::serialize(&packed).map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CheckpointError> {
        let packed: PackedSnapshot = bincode::deserialize(bytes)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
        let snapshot = packed.unpack()?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    fn check_version(&self) -> Result<(), CheckpointError> {
        if self.version == SNAPSHOT_VERSION {
            Ok(())
        } else {
            Err(CheckpointError::UnsupportedVersion {
                found: self.version,
                supported: SNAPSHOT_VERSION,
            })
        }
    }

    /// Puts `machine` where the snapshot says, after resolving every path.
    ///
    /// Nothing changes unless every path resolves.
    pub fn restore_into(&self, machine: &mut Machine) -> Result<(), CheckpointError> {
        self.check_version()?;
        if machine.is_running() {
            return Err(CheckpointError::ValidationFailed(
                "cannot restore into a running machine".to_string(),
            ));
        }

        let graph = machine.graph();
        let expected = graph.definition_label(machine.definition());
        if expected != self.definition {
            return Err(CheckpointError::DefinitionMismatch {
                expected,
                found: self.definition.clone(),
            });
        }

        let active = match &self.active_state {
            Some(path) => {
                let state = graph
                    .state_by_path(path)
                    .map_err(|_| CheckpointError::UnknownState(path.clone()))?;
                let inside = graph
                    .state(state)
                    .is_ok_and(|s| graph.is_within(s.owner(), machine.definition()));
                if !inside {
                    return Err(CheckpointError::UnknownState(path.clone()));
                }
                Some(state)
            }
            None => None,
        };

        let pending = match self.transition_queue.as_slice() {
            [] => None,
            [queued] => Some(PendingTransition {
                transition: graph
                    .transition_by_path(&queued.transition)
                    .map_err(|_| CheckpointError::UnknownTransition(queued.transition.clone()))?,
                args: queued.args.clone(),
            }),
            many => {
                return Err(CheckpointError::ValidationFailed(format!(
                    "transition queue holds {} entries, at most one is allowed",
                    many.len()
                )))
            }
        };
        if pending.is_some() && active.is_none() {
            return Err(CheckpointError::ValidationFailed(
                "queued transition without an active state".to_string(),
            ));
        }
        if let (Some(state), Some(queued)) = (active, &pending) {
            let leaves = machine
                .candidates_from(state)
                .is_ok_and(|c| c.contains(&queued.transition));
            if !leaves {
                return Err(CheckpointError::ValidationFailed(format!(
                    "queued transition '{}' does not leave '{}'",
                    graph.path_of_transition(queued.transition),
                    graph.path_of_state(state)
                )));
            }
        }

        machine.restore_parts(active, pending, self.event_queue.iter().cloned().collect());
        tracing::debug!(
            machine = %machine.id(),
            snapshot = %self.id,
            state = ?self.active_state,
            "snapshot restored"
        );
        Ok(())
    }
}

impl Machine {
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot::capture(self)
    }

    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<(), CheckpointError> {
        snapshot.restore_into(self)
    }
}

// bincode cannot carry `serde_json::Value`, so values travel as JSON text.

#[derive(Serialize, Deserialize)]
struct PackedEvent {
    name: String,
    args: String,
}

#[derive(Serialize, Deserialize)]
struct PackedEntry {
    time: DateTime<Utc>,
    previous_state: Option<String>,
    transition: Option<String>,
    new_state: String,
    event: Option<PackedEvent>,
    trigger: Option<String>,
    data: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct PackedSnapshot {
    version: u32,
    id: Uuid,
    machine: Uuid,
    taken_at: DateTime<Utc>,
    definition: String,
    active_state: Option<String>,
    transition_queue: Vec<(String, String)>,
    event_queue: Vec<PackedEvent>,
    history: Vec<PackedEntry>,
}

fn to_text<T: Serialize>(value: &T) -> Result<String, CheckpointError> {
    serde_json::to_string(value).map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
}

fn from_text<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, CheckpointError> {
    serde_json::from_str(text).map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))
}

impl PackedEvent {
    fn pack(event: &Event) -> Result<Self, CheckpointError> {
        Ok(Self {
            name: event.name.clone(),
            args: to_text(&event.args)?,
        })
    }

    fn unpack(self) -> Result<Event, CheckpointError> {
        Ok(Event::new(self.name).with_args(from_text::<Vec<Value>>(&self.args)?))
    }
}

impl PackedSnapshot {
    fn pack(snapshot: &Snapshot) -> Result<Self, CheckpointError> {
        Ok(Self {
            version: snapshot.version,
            id: snapshot.id,
            machine: snapshot.machine,
            taken_at: snapshot.taken_at,
            definition: snapshot.definition.clone(),
            active_state: snapshot.active_state.clone(),
            transition_queue: snapshot
                .transition_queue
                .iter()
                .map(|q| Ok((q.transition.clone(), to_text(&q.args)?)))
                .collect::<Result<_, CheckpointError>>()?,
            event_queue: snapshot
                .event_queue
                .iter()
                .map(PackedEvent::pack)
                .collect::<Result<_, _>>()?,
            history: snapshot
                .history
                .iter()
                .map(|h| {
                    Ok(PackedEntry {
                        time: h.time,
                        previous_state: h.previous_state.clone(),
                        transition: h.transition.clone(),
                        new_state: h.new_state.clone(),
                        event: h.event.as_ref().map(PackedEvent::pack).transpose()?,
                        trigger: h.trigger.clone(),
                        data: h.data.as_ref().map(to_text).transpose()?,
                    })
                })
                .collect::<Result<_, CheckpointError>>()?,
        })
    }

    fn unpack(self) -> Result<Snapshot, CheckpointError> {
        Ok(Snapshot {
            version: self.version,
            id: self.id,
            machine: self.machine,
            taken_at: self.taken_at,
            definition: self.definition,
            active_state: self.active_state,
            transition_queue: self
                .transition_queue
                .into_iter()
                .map(|(transition, args)| {
                    Ok(QueuedTransition {
                        transition,
                        args: from_text(&args)?,
                    })
                })
                .collect::<Result<_, CheckpointError>>()?,
            event_queue: self
                .event_queue
                .into_iter()
                .map(PackedEvent::unpack)
                .collect::<Result<_, _>>()?,
            history: self
                .history
                .into_iter()
                .map(|h| {
                    Ok(HistoryEntry {
                        time: h.time,
                        previous_state: h.previous_state,
                        transition: h.transition,
                        new_state: h.new_state,
                        event: h.event.map(PackedEvent::unpack).transpose()?,
                        trigger: h.trigger,
                        data: h.data.as_deref().map(from_text).transpose()?,
                    })
                })
                .collect::<Result<_, CheckpointError>>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{GraphBuilder, TransitionBuilder};
    use crate::core::Graph;
    use crate::engine::RunMode;
    use serde_json::json;
    use std::sync::Arc;

    fn graph() -> Arc<Graph> {
        Arc::new(
            GraphBuilder::new("order")
                .initial("cart")
                .final_state("shipped")
                .composite(
                    "paying",
                    GraphBuilder::new("payment")
                        .initial("card")
                        .transition(TransitionBuilder::new().from("card").to("shipped"))
                        .unwrap(),
                )
                .transition(TransitionBuilder::new().from("cart").to("paying").trigger("pay"))
                .unwrap()
                .build()
                .unwrap(),
        )
    }

    fn advanced() -> Machine {
        let mut machine = Machine::new(graph());
        machine.start(&mut (), &[]).unwrap();
        machine.transition(&mut (), "cart->paying", vec![json!(42)]).unwrap();
        machine.run(&mut (), RunMode::Single).unwrap();
        machine
            .transition(&mut (), "card->shipped", vec![json!({"carrier": "post"})])
            .unwrap();
        machine.event(Event::new("late").with_arg(json!(true)));
        machine
    }

    #[test]
    fn capture_uses_paths() {
        let snapshot = advanced().to_snapshot();

        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.definition, "order");
        assert_eq!(snapshot.active_state.as_deref(), Some("paying::card"));
        assert_eq!(
            snapshot.transition_queue,
            vec![QueuedTransition {
                transition: "paying::card->shipped".into(),
                args: vec![json!({"carrier": "post"})],
            }]
        );
        assert_eq!(snapshot.history.len(), 2);
        assert_eq!(snapshot.history[1].transition.as_deref(), Some("cart->paying"));
    }

    #[test]
    fn json_round_trip_restores_position() {
        let original = advanced();
        let json = original.to_snapshot().to_json().unwrap();

        let mut restored = Machine::new(Arc::clone(original.graph()));
        restored.restore(&Snapshot::from_json(&json).unwrap()).unwrap();

        assert_eq!(restored.active_state(), original.active_state());
        assert_eq!(restored.pending_transition(), original.pending_transition());
        assert_eq!(restored.event_queue(), original.event_queue());
        assert!(restored.history().is_empty());

        restored.run(&mut (), RunMode::Continuous).unwrap();
        assert!(restored.at_end());
    }

    #[test]
    fn binary_round_trip_keeps_values() {
        let snapshot = advanced().to_snapshot();
        let bytes = snapshot.to_bytes().unwrap();
        assert_eq!(Snapshot::from_bytes(&bytes).unwrap(), snapshot);
    }

    #[test]
    fn restore_into_other_graph_resolves_by_name() {
        let snapshot = advanced().to_snapshot();
        let mut machine = Machine::new(graph());
        machine.restore(&snapshot).unwrap();
        assert_eq!(machine.active_path().as_deref(), Some("paying::card"));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut snapshot = advanced().to_snapshot();
        snapshot.version = 99;
        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(
            Snapshot::from_json(&json),
            Err(CheckpointError::UnsupportedVersion {
                found: 99,
                supported: SNAPSHOT_VERSION
            })
        );
    }

    #[test]
    fn unknown_paths_leave_machine_untouched() {
        let mut snapshot = advanced().to_snapshot();
        snapshot.transition_queue[0].transition = "nowhere".into();

        let mut machine = Machine::new(graph());
        machine.start(&mut (), &[]).unwrap();
        assert_eq!(
            machine.restore(&snapshot),
            Err(CheckpointError::UnknownTransition("nowhere".into()))
        );
        assert_eq!(machine.active_path().as_deref(), Some("cart"));
        assert!(machine.pending_transition().is_none());
    }

    #[test]
    fn queued_transition_must_leave_restored_state() {
        let mut snapshot = advanced().to_snapshot();
        snapshot.transition_queue[0].transition = "cart->paying".into();

        let mut machine = Machine::new(graph());
        assert!(matches!(
            machine.restore(&snapshot),
            Err(CheckpointError::ValidationFailed(_))
        ));
        assert!(!machine.started());
        assert!(machine.pending_transition().is_none());
    }

    #[test]
    fn definition_mismatch_is_rejected() {
        let snapshot = advanced().to_snapshot();
        let other = Arc::new(GraphBuilder::new("other").initial("x").build().unwrap());
        let mut machine = Machine::new(other);
        assert!(matches!(
            machine.restore(&snapshot),
            Err(CheckpointError::DefinitionMismatch { .. })
        ));
    }
}
