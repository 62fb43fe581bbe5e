//! Statewalk: hierarchical statecharts with run-to-completion execution
//!
//! A statechart is described once, as a [`Graph`](core::Graph) of definitions,
//! states and transitions, and executed by any number of independent
//! [`Machine`](engine::Machine)s that share it.
//!
//! # Core Concepts
//!
//! - **Definition**: states and transitions; a composite state nests another definition
//! - **Behaviors**: `entry`, `exit`, `doActivity` on states, `guard` and `effect` on transitions
//! - **Machine**: one execution with its own active state, queues and history
//! - **Events**: queued by name and matched against transition triggers
//!
//! Behaviors are closures stored in the graph or names resolved against a
//! [`Context`](engine::Context) that the caller passes into each operation.
//!
//! # Example
//!
//! ```rust
//! use statewalk::builder::{GraphBuilder, StateBuilder, TransitionBuilder};
//! use statewalk::engine::{Handlers, Machine};
//! use std::sync::Arc;
//!
//! let graph = GraphBuilder::new("kettle")
//!     .initial("cold")
//!     .final_state("boiled")
//!     .state(StateBuilder::new("heating").entry("switch_on"))
//!     .transition(TransitionBuilder::new().from("cold").to("heating").trigger("press"))
//!     .unwrap()
//!     .transition(TransitionBuilder::new().from("heating").to("boiled").trigger("click"))
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! let mut ctx = Handlers::new(0u32).on("switch_on", |cx, _machine, _state, _args| {
//!     cx.state += 1;
//!     Ok(None)
//! });
//!
//! let mut machine = Machine::new(Arc::new(graph));
//! machine.start(&mut ctx, &[]).unwrap();
//! machine.event("press").event("click");
//! machine.run_events(&mut ctx).unwrap();
//!
//! assert!(machine.at_end());
//! assert_eq!(ctx.state, 1);
//! assert_eq!(machine.history().len(), 3);
//! ```

pub mod builder;
pub mod checkpoint;
pub mod config;
pub mod copier;
pub mod core;
pub mod engine;
pub mod error;
pub mod validation;

// Re-export commonly used types
pub use crate::config::MachineOptions;
pub use crate::core::{Behavior, Event, Graph, StateId, Trigger, TransitionId};
pub use crate::engine::{Context, Handlers, Machine, RunMode};
pub use crate::error::{GraphError, MachineError};
