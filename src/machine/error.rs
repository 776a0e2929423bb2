//! Machine error types.

use std::fmt::Debug;
use thiserror::Error;

/// Contract violations raised by a machine or by the states it drives.
///
/// All of these surface synchronously to the caller of the operation that
/// triggered them. The machine never retries.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MachineError {
    #[error("start() may only be called once per machine")]
    AlreadyStarted,

    #[error("machine has not been started")]
    NotStarted,

    #[error("machine is already processing input")]
    AlreadyProcessing,

    #[error("machine is already in final state '{state}'")]
    AlreadyFinal { state: String },

    #[error("input {input} is not contained in the input alphabet")]
    InputNotInAlphabet { input: String },

    #[error("state '{state}' returned itself; a freshly constructed state is required")]
    StaleTransition { state: String },

    #[error("state '{state}' cannot handle input {input}")]
    UnexpectedInput { state: String, input: String },

    #[error("state '{state}' failed: {message}")]
    StateFailed { state: String, message: String },
}

impl MachineError {
    pub fn unexpected_input(state: &str, input: &dyn Debug) -> Self {
        Self::UnexpectedInput {
            state: state.to_string(),
            input: format!("{input:?}"),
        }
    }

    pub fn state_failed(state: &str, message: impl Into<String>) -> Self {
        Self::StateFailed {
            state: state.to_string(),
            message: message.into(),
        }
    }
}
