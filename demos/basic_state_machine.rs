//! Basic State Machine
//!
//! This example walks a connection through three states driven by inputs.
//!
//! Key concepts:
//! - Each state consumes one input and returns a fresh successor
//! - Inputs outside the alphabet are rejected before any state sees them
//! - States may queue follow-up inputs for themselves
//! - Once a final state is reached, further input is refused
//! - History of entered states is recorded when enabled on the builder
//!
//! Run with: cargo run --example basic_state_machine

use std::sync::Arc;
use stepwise::{Context, MachineError, State, StateBase, StateMachineBuilder, StateRef};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum Signal {
    Dial,
    Answer,
    HangUp,
}

struct Disconnected {
    base: StateBase,
}

struct Connecting {
    base: StateBase,
    attempts: u32,
}

struct Connected {
    base: StateBase,
}

impl State<Signal> for Disconnected {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn name(&self) -> &str {
        "Disconnected"
    }

    fn process_input(
        self: Arc<Self>,
        input: Signal,
        _ctx: &mut Context<'_, Signal>,
    ) -> Result<StateRef<Signal>, MachineError> {
        match input {
            Signal::Dial => Ok(Arc::new(Connecting {
                base: StateBase::new(),
                attempts: 1,
            })),
            other => Err(MachineError::unexpected_input(self.name(), &other)),
        }
    }
}

impl State<Signal> for Connecting {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn name(&self) -> &str {
        "Connecting"
    }

    fn process_input(
        self: Arc<Self>,
        input: Signal,
        ctx: &mut Context<'_, Signal>,
    ) -> Result<StateRef<Signal>, MachineError> {
        match input {
            // The remote side picks up on the second ring.
            Signal::Dial if self.attempts < 2 => {
                ctx.queue_input(Signal::Answer);
                Ok(Arc::new(Connecting {
                    base: StateBase::new(),
                    attempts: self.attempts + 1,
                }))
            }
            Signal::Dial => Ok(Arc::new(Connecting {
                base: StateBase::new(),
                attempts: self.attempts,
            })),
            Signal::Answer => Ok(Arc::new(Connected {
                base: StateBase::terminal(),
            })),
            Signal::HangUp => Ok(Arc::new(Disconnected {
                base: StateBase::new(),
            })),
        }
    }
}

impl State<Signal> for Connected {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn name(&self) -> &str {
        "Connected"
    }

    fn process_input(
        self: Arc<Self>,
        input: Signal,
        _ctx: &mut Context<'_, Signal>,
    ) -> Result<StateRef<Signal>, MachineError> {
        Err(MachineError::unexpected_input(self.name(), &input))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Basic State Machine Example ===\n");

    let mut machine = StateMachineBuilder::<Signal>::new()
        .initial(Disconnected {
            base: StateBase::new(),
        })
        .alphabet([Signal::Dial, Signal::HangUp])
        .on_new_state(|state| println!("  -> {}", state.name()))
        .record_history(true)
        .build()?;

    println!("Machine {} created", machine.id());
    machine.start()?;

    // Answer is internal: only states may queue it.
    match machine.process_input(Signal::Answer) {
        Err(err) => println!("Rejected from outside: {err}"),
        Ok(()) => println!("Unexpectedly accepted Answer"),
    }

    machine.process_input(Signal::Dial)?;
    machine.process_input(Signal::Dial)?;

    println!("\nFinal state: {:?}", machine.current_state().map(|s| s.name()));
    println!("Is in final state: {}", machine.is_in_final_state());

    if let Err(err) = machine.process_input(Signal::HangUp) {
        println!("After finishing: {err}");
    }

    if let Some(history) = machine.history() {
        println!("Path: {}", history.get_path().join(" -> "));
    }

    println!("\n=== Example Complete ===");
    Ok(())
}
