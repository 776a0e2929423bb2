//! The state machine driver.
//!
//! A [`StateMachine`] owns the current state, a fixed input alphabet and a
//! FIFO queue of pending inputs. Inputs are delivered one at a time; each
//! delivery replaces the current state with the one the state returned and
//! fires the registered notifications.
//!
//! # Key Concepts
//!
//! - **Alphabet**: only [`StateMachine::process_input`] validates inputs;
//!   [`StateMachine::queue_input`] and [`Context::queue_input`] bypass it
//! - **Draining**: queued inputs, including ones queued by states during the
//!   drain, are delivered before control returns to the caller
//! - **Final states**: reaching one ends the drain and discards what is left

mod context;
mod error;
mod events;
mod id;
mod state_machine;

pub use context::Context;
pub use error::MachineError;
pub(crate) use events::ProgressChannel;
pub use events::{NewStateListener, ProgressListener};
pub use id::MachineId;
pub use state_machine::StateMachine;
