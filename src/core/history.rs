//! Transition history of a machine.
//!
//! Every committed state change appends a [`HistoryRecord`]. A log may
//! forward its records to an upstream log, which is how a submachine's
//! changes show up in the history of the machine that spawned it.

use super::element::{StateId, TransitionId};
use super::event::Event;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Record of a single state change.
///
/// `previous_state` and `transition` are `None` for the record written when
/// a machine is started or forced into a state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub time: DateTime<Utc>,
    pub previous_state: Option<StateId>,
    pub transition: Option<TransitionId>,
    pub new_state: StateId,
    pub event: Option<Event>,
    pub trigger: Option<String>,
    pub data: Option<Value>,
}

impl HistoryRecord {
    pub fn new(
        previous_state: Option<StateId>,
        transition: Option<TransitionId>,
        new_state: StateId,
    ) -> Self {
        Self {
            time: Utc::now(),
            previous_state,
            transition,
            new_state,
            event: None,
            trigger: None,
            data: None,
        }
    }

    pub fn is_seed(&self) -> bool {
        self.transition.is_none()
    }
}

type Sink = Arc<Mutex<Vec<HistoryRecord>>>;

/// Append-only log of [`HistoryRecord`]s.
///
/// # Example
///
/// ```rust
/// use statewalk::core::{HistoryLog, HistoryRecord, StateId};
/// # fn ids() -> (StateId, StateId) {
/// #     let mut g = statewalk::core::Graph::new("g");
/// #     let r = g.root();
/// #     let a = g.add_state(r, statewalk::core::StateDefinition::new("a")).unwrap();
/// #     let b = g.add_state(r, statewalk::core::StateDefinition::new("b")).unwrap();
/// #     (a, b)
/// # }
/// let (a, b) = ids();
/// let log = HistoryLog::new();
/// log.append(HistoryRecord::new(None, None, a));
/// log.append(HistoryRecord::new(Some(a), None, b));
///
/// assert_eq!(log.len(), 2);
/// assert_eq!(log.path(), vec![a, b]);
/// ```
#[derive(Debug, Default)]
pub struct HistoryLog {
    records: Sink,
    upstream: Option<Sink>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log that also appends every record to `parent`.
    pub fn forwarding_to(parent: &HistoryLog) -> Self {
        Self {
            records: Sink::default(),
            upstream: Some(Arc::clone(&parent.records)),
        }
    }

    pub fn append(&self, record: HistoryRecord) {
        if let Some(upstream) = &self.upstream {
            upstream.lock().push(record.clone());
        }
        self.records.lock().push(record);
    }

    /// Clears this log. Records already forwarded upstream stay there.
    pub fn clear(&self) {
        self.records.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Snapshot of the records in order.
    pub fn records(&self) -> Vec<HistoryRecord> {
        self.records.lock().clone()
    }

    pub fn last(&self) -> Option<HistoryRecord> {
        self.records.lock().last().cloned()
    }

    /// States visited, in order.
    pub fn path(&self) -> Vec<StateId> {
        self.records.lock().iter().map(|r| r.new_state).collect()
    }

    /// Time between the first and last record.
    pub fn duration(&self) -> Option<Duration> {
        let records = self.records.lock();
        let (first, last) = (records.first()?, records.last()?);
        last.time.signed_duration_since(first.time).to_std().ok()
    }

    /// Independent log with the same records and the same upstream.
    pub fn detached_copy(&self) -> Self {
        Self {
            records: Arc::new(Mutex::new(self.records())),
            upstream: self.upstream.clone(),
        }
    }

    /// Rewrites the records in place, dropping those `f` rejects.
    pub(crate) fn remap(&self, mut f: impl FnMut(HistoryRecord) -> Option<HistoryRecord>) {
        let mut records = self.records.lock();
        let remapped: Vec<HistoryRecord> = records.drain(..).filter_map(&mut f).collect();
        *records = remapped;
    }
}
