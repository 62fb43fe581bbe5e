//! Statechart model.
//!
//! This module holds the definition side of the crate:
//! - [`Graph`] arena with definitions, states and transitions
//! - [`Behavior`]s attached to states, transitions and definitions
//! - [`Event`]s and the [`Trigger`]s that react to them
//! - [`HistoryLog`] of committed state changes
//!
//! Definitions are shared, read-only data once a [`Machine`](crate::engine::Machine)
//! runs against them.

mod behavior;
mod definition;
mod element;
mod event;
mod graph;
mod history;
mod state;
mod transition;

pub use behavior::{Action, Behavior, BehaviorFn, BehaviorResult, Element};
pub use definition::StateMachineDefinition;
pub use element::{join_path, split_path, DefinitionId, ElementData, Named, StateId, TransitionId, SEP};
pub use event::{Event, EventPredicate, Trigger};
pub use graph::{Graph, GraphCopy, NodeRef};
pub use history::{HistoryLog, HistoryRecord};
pub use state::{StateDefinition, StateKind};
pub use transition::{TransitionDefinition, TransitionKind};
