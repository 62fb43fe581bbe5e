//! Results of driving a machine.

use crate::core::TransitionId;
use serde::{Deserialize, Serialize};

/// How far [`Machine::run`](super::Machine::run) goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Keep firing queued transitions until the queue drains.
    #[default]
    Continuous,
    /// Fire at most one transition.
    Single,
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    QueueEmpty,
    SingleStep,
    Paused,
    AtEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The machine was already running; nothing happened.
    AlreadyRunning,
    Completed { fired: usize, stop: StopReason },
}

impl RunOutcome {
    pub fn fired(&self) -> usize {
        match self {
            Self::AlreadyRunning => 0,
            Self::Completed { fired, .. } => *fired,
        }
    }

    pub fn stop(&self) -> Option<StopReason> {
        match self {
            Self::AlreadyRunning => None,
            Self::Completed { stop, .. } => Some(*stop),
        }
    }
}

/// Result of [`Machine::dispatch`](super::Machine::dispatch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    Fired(TransitionId),
    /// Queued but not fired because the machine is already running.
    Queued(TransitionId),
    Ambiguous(Vec<TransitionId>),
    Unhandled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineStatus {
    Idle,
    Running,
    Paused,
}
