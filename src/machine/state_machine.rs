//! The queued-input driver.

use crate::core::{StateEntry, StateHistory, StateRef};
use crate::machine::{Context, MachineError, MachineId, NewStateListener, ProgressChannel};
use chrono::Utc;
use std::collections::{HashSet, VecDeque};
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{debug, trace, warn};

/// Drives a set of caller-defined states through a fixed input alphabet.
///
/// The machine is synchronous: every transition, entry hook and listener
/// runs on the thread that called [`start`](Self::start) or
/// [`process_input`](Self::process_input). It does no locking of its own and
/// is meant to be used from a single thread; debug builds assert that
/// input arrives on the thread that started it. Use
/// [`StateMachineExecutor`](crate::executor::StateMachineExecutor) to run a
/// machine on a worker thread.
pub struct StateMachine<I> {
    id: MachineId,
    input_alphabet: HashSet<I>,
    initial_state: Option<StateRef<I>>,
    current_state: Option<StateRef<I>>,
    input_queue: VecDeque<I>,
    processing_input: bool,
    new_state_listeners: Vec<NewStateListener<I>>,
    progress: Arc<ProgressChannel>,
    history: Option<StateHistory>,
    owner: Option<ThreadId>,
}

impl<I: Eq + Hash + Debug> StateMachine<I> {
    /// Create a machine that will start in `initial_state`.
    ///
    /// The alphabet is copied; the initial state is not entered until
    /// [`start`](Self::start).
    pub fn new(initial_state: StateRef<I>, input_alphabet: impl IntoIterator<Item = I>) -> Self {
        Self {
            id: MachineId::new(),
            input_alphabet: input_alphabet.into_iter().collect(),
            initial_state: Some(initial_state),
            current_state: None,
            input_queue: VecDeque::new(),
            processing_input: false,
            new_state_listeners: Vec::new(),
            progress: Arc::new(ProgressChannel::default()),
            history: None,
            owner: None,
        }
    }

    /// Enable or disable recording of entered states. Off by default.
    ///
    /// Enabling starts an empty history; disabling discards it.
    pub fn record_history(&mut self, enabled: bool) {
        match (enabled, self.history.is_some()) {
            (true, false) => self.history = Some(StateHistory::new()),
            (false, true) => self.history = None,
            _ => {}
        }
    }

    pub fn on_new_state<F>(&mut self, listener: F)
    where
        F: Fn(&StateRef<I>) + Send + 'static,
    {
        self.new_state_listeners.push(Box::new(listener));
    }

    pub fn on_progress<F>(&mut self, listener: F)
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        self.progress.subscribe(Arc::new(listener));
    }

    /// Enter the initial state.
    ///
    /// Fires the new-state notification, runs the entry hook, then drains
    /// anything the hook queued.
    pub fn start(&mut self) -> Result<(), MachineError> {
        let Some(initial) = self.initial_state.take() else {
            return Err(MachineError::AlreadyStarted);
        };

        self.owner = Some(thread::current().id());
        debug!(machine = %self.id, initial = initial.name(), "starting state machine");

        self.with_guard(|machine| {
            machine.set_current_state(initial)?;
            machine.drain_queue()
        })
    }

    /// Append an input without validating it or processing anything.
    ///
    /// Queued inputs are delivered, in order, by the next drain.
    pub fn queue_input(&mut self, input: I) {
        self.debug_assert_owner();
        trace!(machine = %self.id, ?input, "input queued");
        self.input_queue.push_back(input);
    }

    /// Validate `input`, queue it and drain the queue.
    pub fn process_input(&mut self, input: I) -> Result<(), MachineError> {
        if self.processing_input {
            return Err(MachineError::AlreadyProcessing);
        }

        let current = self.current_state.as_ref().ok_or(MachineError::NotStarted)?;
        if current.is_final() {
            return Err(MachineError::AlreadyFinal {
                state: current.name().to_string(),
            });
        }

        if !self.input_alphabet.contains(&input) {
            debug!(machine = %self.id, ?input, "input rejected by alphabet");
            return Err(MachineError::InputNotInAlphabet {
                input: format!("{input:?}"),
            });
        }

        self.debug_assert_owner();
        self.input_queue.push_back(input);
        self.with_guard(Self::drain_queue)
    }

    /// Forward [`abort`](crate::core::State::abort) to the current state.
    ///
    /// Returns whether the current state accepted the request.
    pub fn abort_current(&self) -> bool {
        match &self.current_state {
            Some(state) if state.can_abort() => {
                debug!(machine = %self.id, state = state.name(), "abort requested");
                state.abort();
                true
            }
            _ => false,
        }
    }

    fn with_guard(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<(), MachineError>,
    ) -> Result<(), MachineError> {
        self.processing_input = true;
        let result = body(self);
        // Left set if a state panics: the machine refuses further input.
        self.processing_input = false;

        if let Err(err) = &result {
            let dropped = self.input_queue.len();
            self.input_queue.clear();
            warn!(machine = %self.id, error = %err, dropped, "drain aborted");
        }
        result
    }

    fn drain_queue(&mut self) -> Result<(), MachineError> {
        loop {
            let current = Arc::clone(self.current_state.as_ref().ok_or(MachineError::NotStarted)?);
            if current.is_final() {
                if !self.input_queue.is_empty() {
                    debug!(
                        machine = %self.id,
                        state = current.name(),
                        discarded = self.input_queue.len(),
                        "final state reached with inputs still queued"
                    );
                    self.input_queue.clear();
                }
                return Ok(());
            }

            let Some(input) = self.input_queue.pop_front() else {
                return Ok(());
            };
            trace!(machine = %self.id, state = current.name(), ?input, "processing input");

            let mut ctx = Context::new(&mut self.input_queue, &self.progress, self.id);
            let next = Arc::clone(&current).process_input(input, &mut ctx)?;

            if Arc::ptr_eq(&current, &next) {
                warn!(machine = %self.id, state = current.name(), "state returned itself");
                return Err(MachineError::StaleTransition {
                    state: current.name().to_string(),
                });
            }

            self.set_current_state(next)?;
        }
    }

    fn set_current_state(&mut self, state: StateRef<I>) -> Result<(), MachineError> {
        if let Some(outgoing) = &self.current_state {
            if outgoing.is_final() {
                return Err(MachineError::AlreadyFinal {
                    state: outgoing.name().to_string(),
                });
            }
        }

        state.base().attach(&self.progress);
        self.current_state = Some(Arc::clone(&state));

        if let Some(history) = &mut self.history {
            let sequence = history.len();
            history.push(StateEntry {
                sequence,
                state: state.name().to_string(),
                is_final: state.is_final(),
                timestamp: Utc::now(),
            });
        }

        debug!(
            machine = %self.id,
            state = state.name(),
            is_final = state.is_final(),
            "entered state"
        );

        for listener in &self.new_state_listeners {
            listener(&state);
        }

        let mut ctx = Context::new(&mut self.input_queue, &self.progress, self.id);
        state.on_entered_state(&mut ctx)
    }

    fn debug_assert_owner(&self) {
        if let Some(owner) = self.owner {
            debug_assert_eq!(
                owner,
                thread::current().id(),
                "state machine used from a thread other than the one that started it"
            );
        }
    }
}

impl<I> StateMachine<I> {
    pub fn id(&self) -> MachineId {
        self.id
    }

    /// The active state, or `None` before [`start`](Self::start).
    pub fn current_state(&self) -> Option<&StateRef<I>> {
        self.current_state.as_ref()
    }

    pub fn is_in_final_state(&self) -> bool {
        self.current_state.as_ref().is_some_and(|s| s.is_final())
    }

    pub fn is_started(&self) -> bool {
        self.current_state.is_some()
    }

    pub fn is_processing_input(&self) -> bool {
        self.processing_input
    }

    pub fn queued_inputs(&self) -> usize {
        self.input_queue.len()
    }

    pub fn alphabet(&self) -> &HashSet<I> {
        &self.input_alphabet
    }

    /// Entered states, unless recording was disabled.
    pub fn history(&self) -> Option<&StateHistory> {
        self.history.as_ref()
    }
}

impl<I: Debug> Debug for StateMachine<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("id", &self.id)
            .field("current_state", &self.current_state)
            .field("input_queue", &self.input_queue)
            .field("processing_input", &self.processing_input)
            .finish_non_exhaustive()
    }
}
