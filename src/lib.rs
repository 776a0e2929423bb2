//! Stepwise: a queued-input finite state machine
//!
//! Stepwise sequences multi-phase operations (plugin loading, multi-step
//! I/O, check/download/install workflows) as an explicit state machine.
//! Each step is a [`State`] that consumes one input and hands back a freshly
//! constructed successor; the [`StateMachine`] owns the current step, a
//! fixed input alphabet and a FIFO queue of pending inputs.
//!
//! # Core Concepts
//!
//! - **State**: one step of the process, implemented by the caller
//! - **Input alphabet**: the inputs the machine accepts from outside
//! - **Draining**: queued inputs are delivered until the queue is empty or a
//!   final state is reached
//! - **Notifications**: synchronous "new state" and "progress" callbacks
//! - **Executor**: optional worker thread that drives a machine off the
//!   caller's thread
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use stepwise::{Context, MachineError, State, StateBase, StateMachine, StateRef};
//!
//! struct Ready {
//!     base: StateBase,
//! }
//!
//! struct Done {
//!     base: StateBase,
//! }
//!
//! impl State<&'static str> for Ready {
//!     fn base(&self) -> &StateBase {
//!         &self.base
//!     }
//!
//!     fn name(&self) -> &str {
//!         "Ready"
//!     }
//!
//!     fn process_input(
//!         self: Arc<Self>,
//!         input: &'static str,
//!         _ctx: &mut Context<'_, &'static str>,
//!     ) -> Result<StateRef<&'static str>, MachineError> {
//!         match input {
//!             "go" => Ok(Arc::new(Done { base: StateBase::terminal() })),
//!             other => Err(MachineError::unexpected_input(self.name(), &other)),
//!         }
//!     }
//! }
//!
//! impl State<&'static str> for Done {
//!     fn base(&self) -> &StateBase {
//!         &self.base
//!     }
//!
//!     fn name(&self) -> &str {
//!         "Done"
//!     }
//!
//!     fn process_input(
//!         self: Arc<Self>,
//!         input: &'static str,
//!         _ctx: &mut Context<'_, &'static str>,
//!     ) -> Result<StateRef<&'static str>, MachineError> {
//!         Err(MachineError::unexpected_input(self.name(), &input))
//!     }
//! }
//!
//! let mut machine = StateMachine::new(Arc::new(Ready { base: StateBase::new() }), ["go", "stop"]);
//! machine.start().unwrap();
//! assert_eq!(machine.current_state().unwrap().name(), "Ready");
//!
//! machine.process_input("go").unwrap();
//! assert!(machine.is_in_final_state());
//! assert!(machine.process_input("go").is_err());
//! ```

pub mod builder;
pub mod core;
pub mod executor;
pub mod machine;
pub mod snapshot;

// Re-export commonly used types
pub use builder::{BuildError, StateMachineBuilder};
pub use crate::core::{State, StateBase, StateEntry, StateHistory, StateRef};
pub use executor::{ExecutorConfig, ExecutorError, ExecutorEvent, StateMachineExecutor};
pub use machine::{Context, MachineError, MachineId, StateMachine};
pub use snapshot::{MachineSnapshot, SnapshotError};
