//! Builder API for ergonomic state machine construction.
//!
//! The builder gathers the initial state, the input alphabet and any
//! listeners, validating them before a [`StateMachine`](crate::machine::StateMachine)
//! is created.

pub mod error;
pub mod machine;

pub use error::BuildError;
pub use machine::StateMachineBuilder;
