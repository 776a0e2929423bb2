//! Core state types.
//!
//! This module contains the pieces a caller implements or inspects:
//! - The `State` trait and its embedded `StateBase`
//! - Immutable history of entered states
//!
//! The driver that moves between states lives in [`crate::machine`].

mod history;
mod state;

pub use history::{StateEntry, StateHistory};
pub use state::{State, StateBase, StateRef};
