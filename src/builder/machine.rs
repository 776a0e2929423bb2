//! Builder for constructing state machines.

use crate::builder::error::BuildError;
use crate::core::{State, StateRef};
use crate::machine::{NewStateListener, StateMachine};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

/// Builder for constructing state machines with a fluent API.
pub struct StateMachineBuilder<I> {
    initial: Option<StateRef<I>>,
    alphabet: Vec<I>,
    new_state_listeners: Vec<NewStateListener<I>>,
    progress_listeners: Vec<Box<dyn Fn(f64) + Send + Sync>>,
    record_history: bool,
}

impl<I: Eq + Hash + Debug + 'static> StateMachineBuilder<I> {
    pub fn new() -> Self {
        Self {
            initial: None,
            alphabet: Vec::new(),
            new_state_listeners: Vec::new(),
            progress_listeners: Vec::new(),
            record_history: false,
        }
    }

    /// Set the initial state (required).
    pub fn initial<S: State<I> + 'static>(self, state: S) -> Self {
        self.initial_ref(Arc::new(state))
    }

    /// Set the initial state from an existing handle.
    pub fn initial_ref(mut self, state: StateRef<I>) -> Self {
        self.initial = Some(state);
        self
    }

    /// Add one legal input.
    pub fn input(mut self, input: I) -> Self {
        self.alphabet.push(input);
        self
    }

    /// Add several legal inputs at once.
    pub fn alphabet(mut self, inputs: impl IntoIterator<Item = I>) -> Self {
        self.alphabet.extend(inputs);
        self
    }

    pub fn on_new_state<F>(mut self, listener: F) -> Self
    where
        F: Fn(&StateRef<I>) + Send + 'static,
    {
        self.new_state_listeners.push(Box::new(listener));
        self
    }

    pub fn on_progress<F>(mut self, listener: F) -> Self
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        self.progress_listeners.push(Box::new(listener));
        self
    }

    /// Record entered states (off by default).
    pub fn record_history(mut self, enabled: bool) -> Self {
        self.record_history = enabled;
        self
    }

    /// Build the state machine.
    /// Returns an error if the initial state or alphabet is missing.
    pub fn build(self) -> Result<StateMachine<I>, BuildError> {
        let initial = self.initial.ok_or(BuildError::MissingInitialState)?;

        if self.alphabet.is_empty() {
            return Err(BuildError::EmptyAlphabet);
        }

        let mut machine = StateMachine::new(initial, self.alphabet);
        machine.record_history(self.record_history);
        for listener in self.new_state_listeners {
            machine.on_new_state(listener);
        }
        for listener in self.progress_listeners {
            machine.on_progress(listener);
        }

        Ok(machine)
    }
}

impl<I: Eq + Hash + Debug + 'static> Default for StateMachineBuilder<I> {
    fn default() -> Self {
        Self::new()
    }
}
