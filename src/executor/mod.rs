//! Run a state machine on a dedicated worker thread.
//!
//! The executor moves a [`StateMachine`] onto its own thread, forwards
//! inputs to it in send order, and reports lifecycle events back over a
//! channel. States whose entry hooks do long blocking work (downloads,
//! extraction, installs) run there without stalling the caller.
//!
//! The channels are `tokio::sync::mpsc`, used with `blocking_recv` on plain
//! threads. [`StateMachineExecutor::start`] blocks the calling thread and
//! must not be called from inside an async runtime; the event receiver may
//! be consumed either way.

mod error;

pub use error::ExecutorError;

use crate::core::StateRef;
use crate::machine::{MachineError, StateMachine};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Lifecycle notifications sent by the worker, in the order they happen.
#[derive(Debug)]
pub enum ExecutorEvent<I> {
    /// The worker thread is up and about to start the machine
    MachineBegin,
    /// A state became current
    StateBegin(StateRef<I>),
    /// A state reported progress
    Progress(f64),
    /// The machine drained its queue and is waiting for the next input
    WaitingForInput(StateRef<I>),
    /// The worker is exiting
    MachineFinished,
}

#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    /// Name given to the worker thread
    pub thread_name: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            thread_name: "stepwise-executor".to_string(),
        }
    }
}

enum Command<I> {
    Input(I),
    Abort,
}

struct Shared<I> {
    current: Mutex<Option<StateRef<I>>>,
    abort_requested: AtomicBool,
    finished: AtomicBool,
}

/// Owns a machine and the worker thread that drives it.
///
/// Dropping a running executor aborts it and waits for the worker.
pub struct StateMachineExecutor<I> {
    config: ExecutorConfig,
    machine: Option<StateMachine<I>>,
    shared: Arc<Shared<I>>,
    commands: Option<mpsc::UnboundedSender<Command<I>>>,
    // Handed to the worker by `start`, so the receiver closes when it exits.
    events_tx: Option<mpsc::UnboundedSender<ExecutorEvent<I>>>,
    events_rx: Option<mpsc::UnboundedReceiver<ExecutorEvent<I>>>,
    worker: Option<JoinHandle<Result<(), MachineError>>>,
}

impl<I: Eq + Hash + Debug + Send + 'static> StateMachineExecutor<I> {
    pub fn new(machine: StateMachine<I>) -> Self {
        Self::with_config(machine, ExecutorConfig::default())
    }

    pub fn with_config(machine: StateMachine<I>, config: ExecutorConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            config,
            machine: Some(machine),
            shared: Arc::new(Shared {
                current: Mutex::new(None),
                abort_requested: AtomicBool::new(false),
                finished: AtomicBool::new(false),
            }),
            commands: None,
            events_tx: Some(events_tx),
            events_rx: Some(events_rx),
            worker: None,
        }
    }

    /// Spawn the worker and start the machine on it.
    ///
    /// Returns once the initial state has been entered, or once the worker
    /// has exited if starting failed.
    pub fn start(&mut self) -> Result<(), ExecutorError> {
        let mut machine = self.machine.take().ok_or(ExecutorError::AlreadyStarted)?;
        let events_tx = self.events_tx.take().ok_or(ExecutorError::AlreadyStarted)?;

        let (ready_tx, ready_rx) = oneshot::channel::<()>();
        let ready = Mutex::new(Some(ready_tx));
        let shared = Arc::clone(&self.shared);
        let events = events_tx.clone();
        machine.on_new_state(move |state| {
            *shared
                .current
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(state));
            if let Some(tx) = ready.lock().unwrap_or_else(PoisonError::into_inner).take() {
                let _ = tx.send(());
            }
            let _ = events.send(ExecutorEvent::StateBegin(Arc::clone(state)));
        });

        let events = events_tx.clone();
        machine.on_progress(move |percent| {
            let _ = events.send(ExecutorEvent::Progress(percent));
        });

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let shared = Arc::clone(&self.shared);
        let worker = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || run_worker(machine, commands_rx, shared, events_tx))?;

        debug!(thread = %self.config.thread_name, "executor worker spawned");
        self.commands = Some(commands_tx);
        self.worker = Some(worker);

        // Err means the worker exited before entering any state.
        let _ = ready_rx.blocking_recv();
        Ok(())
    }

    /// Hand an input to the worker.
    ///
    /// Inputs are processed in the order they are sent. Validation happens
    /// on the worker; a rejected input ends the run and the error is
    /// reported by [`abort`](Self::abort) or [`finish`](Self::finish).
    pub fn process_input(&self, input: I) -> Result<(), ExecutorError> {
        if self.machine.is_some() {
            return Err(ExecutorError::NotStarted);
        }
        if self.shared.finished.load(Ordering::Acquire) {
            return Err(ExecutorError::Finished);
        }
        let commands = self.commands.as_ref().ok_or(ExecutorError::Finished)?;
        commands
            .send(Command::Input(input))
            .map_err(|_| ExecutorError::Finished)
    }
}

impl<I> StateMachineExecutor<I> {
    /// Take the event receiver. Returns `None` after the first call.
    pub fn events(&mut self) -> Option<mpsc::UnboundedReceiver<ExecutorEvent<I>>> {
        self.events_rx.take()
    }

    pub fn is_started(&self) -> bool {
        self.machine.is_none()
    }

    /// Whether the worker has exited.
    pub fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::Acquire)
    }

    pub fn current_state(&self) -> Option<StateRef<I>> {
        self.shared
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_in_final_state(&self) -> bool {
        self.current_state().is_some_and(|s| s.is_final())
    }

    /// Ask the machine to stop and wait for the worker to exit.
    ///
    /// The current state is asked to abort if it supports it. Inputs not
    /// yet delivered are dropped. A no-op once the worker has been joined.
    pub fn abort(&mut self) -> Result<(), ExecutorError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        self.shared.abort_requested.store(true, Ordering::Release);
        if let Some(state) = self.current_state() {
            if state.can_abort() {
                debug!(state = state.name(), "aborting current state");
                state.abort();
            }
        }

        if let Some(commands) = self.commands.take() {
            let _ = commands.send(Command::Abort);
        }

        join_worker(worker)
    }

    /// Stop accepting input and wait for the worker to process what was
    /// already sent and exit.
    pub fn finish(&mut self) -> Result<(), ExecutorError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        self.commands.take();
        join_worker(worker)
    }
}

impl<I> Drop for StateMachineExecutor<I> {
    fn drop(&mut self) {
        if let Err(err) = self.abort() {
            warn!(error = %err, "state machine executor failed during drop");
        }
    }
}

fn join_worker(worker: JoinHandle<Result<(), MachineError>>) -> Result<(), ExecutorError> {
    match worker.join() {
        Ok(result) => result.map_err(ExecutorError::from),
        Err(_) => Err(ExecutorError::WorkerPanicked),
    }
}

/// Marks the worker finished and sends `MachineFinished` when dropped, so
/// both happen even if a state panics.
struct FinishOnDrop<I> {
    shared: Arc<Shared<I>>,
    events: mpsc::UnboundedSender<ExecutorEvent<I>>,
}

impl<I> Drop for FinishOnDrop<I> {
    fn drop(&mut self) {
        self.shared.finished.store(true, Ordering::Release);
        if thread::panicking() {
            warn!("executor worker panicked");
        }
        let _ = self.events.send(ExecutorEvent::MachineFinished);
    }
}

fn run_worker<I: Eq + Hash + Debug>(
    mut machine: StateMachine<I>,
    mut commands: mpsc::UnboundedReceiver<Command<I>>,
    shared: Arc<Shared<I>>,
    events: mpsc::UnboundedSender<ExecutorEvent<I>>,
) -> Result<(), MachineError> {
    let _finish = FinishOnDrop {
        shared: Arc::clone(&shared),
        events: events.clone(),
    };
    let _ = events.send(ExecutorEvent::MachineBegin);

    let result = drive(&mut machine, &mut commands, &shared, &events);

    match &result {
        Ok(()) => debug!(machine = %machine.id(), "executor worker finished"),
        Err(err) => warn!(machine = %machine.id(), error = %err, "executor worker failed"),
    }

    result
}

fn drive<I: Eq + Hash + Debug>(
    machine: &mut StateMachine<I>,
    commands: &mut mpsc::UnboundedReceiver<Command<I>>,
    shared: &Shared<I>,
    events: &mpsc::UnboundedSender<ExecutorEvent<I>>,
) -> Result<(), MachineError> {
    machine.start()?;

    while !machine.is_in_final_state() {
        if shared.abort_requested.load(Ordering::Acquire) {
            break;
        }

        if let Some(state) = machine.current_state() {
            let _ = events.send(ExecutorEvent::WaitingForInput(Arc::clone(state)));
        }

        match commands.blocking_recv() {
            Some(Command::Input(input)) => {
                if shared.abort_requested.load(Ordering::Acquire) {
                    break;
                }
                machine.process_input(input)?;
            }
            Some(Command::Abort) | None => break,
        }
    }

    Ok(())
}
