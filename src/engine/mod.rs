//! Executing definitions.
//!
//! A [`Machine`] drives one definition of a shared [`Graph`](crate::core::Graph):
//! it queues transitions, fires them with run-to-completion semantics and
//! records every committed state change.
//!
//! Behaviors are either closures stored on the definition or names resolved
//! against the [`Context`] passed into each call.

mod context;
mod machine;
mod observer;
mod outcome;

pub use context::{Context, Handler, Handlers};
pub use machine::{Machine, PendingTransition, RunHook};
pub use observer::{Notice, NullObserver, Observer, RecordingObserver, TracingObserver};
pub use outcome::{EngineStatus, RunMode, RunOutcome, StopReason, TransitionOutcome};
