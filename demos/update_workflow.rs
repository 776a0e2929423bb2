//! Update Workflow
//!
//! This example runs a check/download/install workflow on a worker thread.
//!
//! Key concepts:
//! - Entry hooks do the slow work and queue private inputs to move on
//! - Progress is reported from inside a state and arrives as executor events
//! - The download is abortable; aborting unblocks it and lands in `Aborted`
//! - The caller only ever sends the public inputs of the alphabet
//!
//! Run with: cargo run --example update_workflow
//! Pass `abort` as an argument to cancel the download halfway through, or
//! `dismiss` to decline the update.

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use stepwise::{
    Context, ExecutorEvent, MachineError, State, StateBase, StateMachineBuilder,
    StateMachineExecutor, StateRef,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum UpdateInput {
    // Sent by the user.
    Install,
    Dismiss,
    // Queued by states.
    UpdateAvailable,
    Downloaded,
    Installed,
    Canceled,
}

const CHUNKS: u32 = 10;

struct Checking {
    base: StateBase,
}

impl State<UpdateInput> for Checking {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn name(&self) -> &str {
        "Checking"
    }

    fn on_entered_state(&self, ctx: &mut Context<'_, UpdateInput>) -> Result<(), MachineError> {
        thread::sleep(Duration::from_millis(100));
        ctx.queue_input(UpdateInput::UpdateAvailable);
        Ok(())
    }

    fn process_input(
        self: Arc<Self>,
        input: UpdateInput,
        _ctx: &mut Context<'_, UpdateInput>,
    ) -> Result<StateRef<UpdateInput>, MachineError> {
        match input {
            UpdateInput::UpdateAvailable => Ok(Arc::new(UpdateAvailable {
                base: StateBase::new(),
                version: "2.1.0",
            })),
            other => Err(MachineError::unexpected_input(self.name(), &other)),
        }
    }
}

/// Waits for the user to decide.
struct UpdateAvailable {
    base: StateBase,
    version: &'static str,
}

impl State<UpdateInput> for UpdateAvailable {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn name(&self) -> &str {
        "UpdateAvailable"
    }

    fn on_entered_state(&self, _ctx: &mut Context<'_, UpdateInput>) -> Result<(), MachineError> {
        info!(version = self.version, "update available");
        Ok(())
    }

    fn process_input(
        self: Arc<Self>,
        input: UpdateInput,
        _ctx: &mut Context<'_, UpdateInput>,
    ) -> Result<StateRef<UpdateInput>, MachineError> {
        match input {
            UpdateInput::Install => Ok(Arc::new(Downloading {
                base: StateBase::new(),
                version: self.version,
            })),
            UpdateInput::Dismiss => Ok(Arc::new(Done::new("Dismissed"))),
            other => Err(MachineError::unexpected_input(self.name(), &other)),
        }
    }
}

struct Downloading {
    base: StateBase,
    version: &'static str,
}

impl State<UpdateInput> for Downloading {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn name(&self) -> &str {
        "Downloading"
    }

    fn can_abort(&self) -> bool {
        true
    }

    fn on_entered_state(&self, ctx: &mut Context<'_, UpdateInput>) -> Result<(), MachineError> {
        for chunk in 0..=CHUNKS {
            if self.abort_requested() {
                ctx.queue_input(UpdateInput::Canceled);
                return Ok(());
            }
            self.report_progress(f64::from(chunk) * 100.0 / f64::from(CHUNKS));
            thread::sleep(Duration::from_millis(50));
        }
        ctx.queue_input(UpdateInput::Downloaded);
        Ok(())
    }

    fn process_input(
        self: Arc<Self>,
        input: UpdateInput,
        _ctx: &mut Context<'_, UpdateInput>,
    ) -> Result<StateRef<UpdateInput>, MachineError> {
        match input {
            UpdateInput::Downloaded => Ok(Arc::new(Installing {
                base: StateBase::new(),
                version: self.version,
            })),
            UpdateInput::Canceled => Ok(Arc::new(Done::new("Aborted"))),
            other => Err(MachineError::unexpected_input(self.name(), &other)),
        }
    }
}

struct Installing {
    base: StateBase,
    version: &'static str,
}

impl State<UpdateInput> for Installing {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn name(&self) -> &str {
        "Installing"
    }

    fn on_entered_state(&self, ctx: &mut Context<'_, UpdateInput>) -> Result<(), MachineError> {
        info!(version = self.version, "installing update");
        ctx.queue_input(UpdateInput::Installed);
        Ok(())
    }

    fn process_input(
        self: Arc<Self>,
        input: UpdateInput,
        _ctx: &mut Context<'_, UpdateInput>,
    ) -> Result<StateRef<UpdateInput>, MachineError> {
        match input {
            UpdateInput::Installed => Ok(Arc::new(Done::new("Done"))),
            other => Err(MachineError::unexpected_input(self.name(), &other)),
        }
    }
}

/// Any of the workflow's end states.
struct Done {
    base: StateBase,
    name: &'static str,
}

impl Done {
    fn new(name: &'static str) -> Self {
        Self {
            base: StateBase::terminal(),
            name,
        }
    }
}

impl State<UpdateInput> for Done {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn name(&self) -> &str {
        self.name
    }

    fn process_input(
        self: Arc<Self>,
        input: UpdateInput,
        _ctx: &mut Context<'_, UpdateInput>,
    ) -> Result<StateRef<UpdateInput>, MachineError> {
        Err(MachineError::unexpected_input(self.name(), &input))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let abort_download = std::env::args().any(|arg| arg == "abort");
    let answer = if std::env::args().any(|arg| arg == "dismiss") {
        UpdateInput::Dismiss
    } else {
        UpdateInput::Install
    };

    println!("=== Update Workflow Example ===\n");

    let machine = StateMachineBuilder::<UpdateInput>::new()
        .initial(Checking {
            base: StateBase::new(),
        })
        .alphabet([UpdateInput::Install, UpdateInput::Dismiss])
        .build()?;

    let mut executor = StateMachineExecutor::new(machine);
    let mut events = executor.events().ok_or("event receiver already taken")?;

    let printer = thread::spawn(move || {
        while let Some(event) = events.blocking_recv() {
            match event {
                ExecutorEvent::MachineBegin => println!("[machine begin]"),
                ExecutorEvent::StateBegin(state) => println!("[state] {}", state.name()),
                ExecutorEvent::Progress(percent) => println!("  {percent:>5.1}%"),
                ExecutorEvent::WaitingForInput(state) => {
                    println!("[waiting] {} needs input", state.name())
                }
                ExecutorEvent::MachineFinished => {
                    println!("[machine finished]");
                    break;
                }
            }
        }
    });

    executor.start()?;

    // Wait for the check to complete before answering the prompt.
    while executor.current_state().map(|s| s.name().to_string()).as_deref()
        != Some("UpdateAvailable")
    {
        thread::sleep(Duration::from_millis(10));
    }
    executor.process_input(answer)?;

    if abort_download {
        thread::sleep(Duration::from_millis(250));
        executor.abort()?;
    } else {
        executor.finish()?;
    }

    printer.join().map_err(|_| "event printer panicked")?;

    println!(
        "\nEnded in: {}",
        executor
            .current_state()
            .map(|s| s.name().to_string())
            .unwrap_or_default()
    );
    println!("\n=== Example Complete ===");
    Ok(())
}
