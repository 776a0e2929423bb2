//! Executor error types.

use crate::machine::MachineError;
use thiserror::Error;

/// Errors surfaced by [`StateMachineExecutor`](super::StateMachineExecutor).
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("executor has not been started")]
    NotStarted,

    #[error("executor is already running its state machine")]
    AlreadyStarted,

    #[error("state machine has finished and accepts no more input")]
    Finished,

    #[error("state machine failed on the worker thread: {0}")]
    Machine(#[from] MachineError),

    #[error("worker thread panicked")]
    WorkerPanicked,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
