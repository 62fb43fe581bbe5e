//! Step notifications.
//!
//! A machine reports each step of its cascade to an [`Observer`]. The
//! default [`TracingObserver`] turns them into `tracing` events.

use crate::core::{StateId, TransitionId};
use parking_lot::Mutex;
use uuid::Uuid;

/// One engine step.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Started { state: StateId },
    EventDequeued { event: String },
    TransitionQueued { transition: TransitionId },
    GuardEvaluated { transition: TransitionId, passed: bool },
    EffectInvoked { transition: TransitionId },
    StateExited { state: StateId },
    StateEntered { state: StateId },
    ActivityInvoked { state: StateId },
    TransitionFired {
        transition: TransitionId,
        from: Option<StateId>,
        to: StateId,
    },
    RolledBack { state: Option<StateId> },
    Paused,
    Resumed,
}

pub trait Observer: Send + Sync {
    fn notify(&self, machine: Uuid, notice: &Notice);
}

/// Emits each notice as a `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn notify(&self, machine: Uuid, notice: &Notice) {
        match notice {
            Notice::Started { state } => {
                tracing::debug!(machine = %machine, state = %state, "machine started")
            }
            Notice::EventDequeued { event } => {
                tracing::debug!(machine = %machine, event = %event, "event dequeued")
            }
            Notice::TransitionQueued { transition } => {
                tracing::trace!(machine = %machine, transition = %transition, "transition queued")
            }
            Notice::GuardEvaluated { transition, passed } => {
                tracing::trace!(machine = %machine, transition = %transition, passed, "guard evaluated")
            }
            Notice::EffectInvoked { transition } => {
                tracing::trace!(machine = %machine, transition = %transition, "effect")
            }
            Notice::StateExited { state } => {
                tracing::trace!(machine = %machine, state = %state, "exit")
            }
            Notice::StateEntered { state } => {
                tracing::trace!(machine = %machine, state = %state, "entry")
            }
            Notice::ActivityInvoked { state } => {
                tracing::trace!(machine = %machine, state = %state, "doActivity")
            }
            Notice::TransitionFired {
                transition,
                from,
                to,
            } => tracing::debug!(
                machine = %machine,
                transition = %transition,
                from = ?from,
                to = %to,
                "transition fired"
            ),
            Notice::RolledBack { state } => {
                tracing::warn!(machine = %machine, state = ?state, "cascade failed, state rolled back")
            }
            Notice::Paused => tracing::debug!(machine = %machine, "paused"),
            Notice::Resumed => tracing::debug!(machine = %machine, "resumed"),
        }
    }
}

/// Discards every notice.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl Observer for NullObserver {
    fn notify(&self, _machine: Uuid, _notice: &Notice) {}
}

/// Keeps every notice in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn clear(&self) {
        self.notices.lock().clear();
    }
}

impl Observer for RecordingObserver {
    fn notify(&self, _machine: Uuid, notice: &Notice) {
        self.notices.lock().push(notice.clone());
    }
}
