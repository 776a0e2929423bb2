//! End-to-end scenarios for the state machine driver.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use stepwise::{Context, MachineError, State, StateBase, StateMachine, StateRef};

type Log = Arc<Mutex<Vec<String>>>;

fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Terminal state that refuses every input.
struct Terminal {
    base: StateBase,
    name: &'static str,
}

impl Terminal {
    fn new(name: &'static str) -> Self {
        Self {
            base: StateBase::terminal(),
            name,
        }
    }
}

impl State<&'static str> for Terminal {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn name(&self) -> &str {
        self.name
    }

    fn process_input(
        self: Arc<Self>,
        input: &'static str,
        _ctx: &mut Context<'_, &'static str>,
    ) -> Result<StateRef<&'static str>, MachineError> {
        Err(MachineError::unexpected_input(self.name(), &input))
    }
}

/// `go` moves to the terminal state B.
struct A {
    base: StateBase,
    requeue: bool,
}

impl State<&'static str> for A {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn name(&self) -> &str {
        "A"
    }

    fn process_input(
        self: Arc<Self>,
        input: &'static str,
        ctx: &mut Context<'_, &'static str>,
    ) -> Result<StateRef<&'static str>, MachineError> {
        match input {
            "go" if self.requeue => {
                ctx.queue_input("go");
                Ok(Arc::new(B {
                    base: StateBase::new(),
                }))
            }
            "go" => Ok(Arc::new(Terminal::new("B"))),
            other => Err(MachineError::unexpected_input(self.name(), &other)),
        }
    }
}

/// `go` moves to the terminal state C.
struct B {
    base: StateBase,
}

impl State<&'static str> for B {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn name(&self) -> &str {
        "B"
    }

    fn process_input(
        self: Arc<Self>,
        input: &'static str,
        _ctx: &mut Context<'_, &'static str>,
    ) -> Result<StateRef<&'static str>, MachineError> {
        match input {
            "go" => Ok(Arc::new(Terminal::new("C"))),
            other => Err(MachineError::unexpected_input(self.name(), &other)),
        }
    }
}

fn go_stop_machine(requeue: bool) -> StateMachine<&'static str> {
    let mut machine = StateMachine::new(
        Arc::new(A {
            base: StateBase::new(),
            requeue,
        }),
        ["go", "stop"],
    );
    machine.record_history(true);
    machine
}

#[test]
fn go_moves_a_to_final_b() {
    let mut machine = go_stop_machine(false);

    machine.start().unwrap();
    assert_eq!(machine.current_state().unwrap().name(), "A");
    assert!(!machine.is_in_final_state());

    machine.process_input("go").unwrap();
    assert_eq!(machine.current_state().unwrap().name(), "B");
    assert!(machine.is_in_final_state());

    assert_eq!(
        machine.process_input("go"),
        Err(MachineError::AlreadyFinal {
            state: "B".to_string()
        })
    );
    assert_eq!(machine.current_state().unwrap().name(), "B");
}

#[test]
fn self_queued_input_drains_through_to_c() {
    let mut machine = go_stop_machine(true);
    machine.start().unwrap();

    machine.process_input("go").unwrap();

    assert_eq!(machine.current_state().unwrap().name(), "C");
    assert!(machine.is_in_final_state());
    assert_eq!(
        machine.history().unwrap().get_path(),
        vec!["A", "B", "C"]
    );
}

#[test]
fn second_start_fails() {
    let mut machine = go_stop_machine(false);
    machine.start().unwrap();
    assert_eq!(machine.start(), Err(MachineError::AlreadyStarted));
}

#[test]
fn unknown_input_is_rejected_before_queueing() {
    let mut machine = go_stop_machine(false);
    machine.start().unwrap();

    assert_eq!(
        machine.process_input("jump"),
        Err(MachineError::InputNotInAlphabet {
            input: "\"jump\"".to_string()
        })
    );
    assert_eq!(machine.current_state().unwrap().name(), "A");
    assert_eq!(machine.queued_inputs(), 0);
}

#[test]
fn alphabet_member_the_state_does_not_understand_surfaces_state_error() {
    let mut machine = go_stop_machine(false);
    machine.start().unwrap();

    assert_eq!(
        machine.process_input("stop"),
        Err(MachineError::UnexpectedInput {
            state: "A".to_string(),
            input: "\"stop\"".to_string(),
        })
    );
    assert_eq!(machine.current_state().unwrap().name(), "A");
}

/// Returns itself for every input.
struct Loop {
    base: StateBase,
}

impl State<&'static str> for Loop {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn name(&self) -> &str {
        "Loop"
    }

    fn process_input(
        self: Arc<Self>,
        _input: &'static str,
        _ctx: &mut Context<'_, &'static str>,
    ) -> Result<StateRef<&'static str>, MachineError> {
        Ok(self)
    }
}

/// Returns a new instance carrying identical data.
struct Twin {
    base: StateBase,
    generation: usize,
}

impl State<&'static str> for Twin {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn name(&self) -> &str {
        "Twin"
    }

    fn process_input(
        self: Arc<Self>,
        _input: &'static str,
        _ctx: &mut Context<'_, &'static str>,
    ) -> Result<StateRef<&'static str>, MachineError> {
        Ok(Arc::new(Twin {
            base: StateBase::new(),
            generation: self.generation,
        }))
    }
}

#[test]
fn returning_the_same_instance_fails() {
    let mut machine = StateMachine::new(
        Arc::new(Loop {
            base: StateBase::new(),
        }),
        ["tick"],
    );
    machine.start().unwrap();

    assert_eq!(
        machine.process_input("tick"),
        Err(MachineError::StaleTransition {
            state: "Loop".to_string()
        })
    );
}

#[test]
fn equal_but_distinct_successor_is_a_valid_transition() {
    let mut machine = StateMachine::new(
        Arc::new(Twin {
            base: StateBase::new(),
            generation: 7,
        }),
        ["tick"],
    );
    machine.record_history(true);
    machine.start().unwrap();
    let before = Arc::clone(machine.current_state().unwrap());

    machine.process_input("tick").unwrap();
    machine.process_input("tick").unwrap();

    assert!(!Arc::ptr_eq(&before, machine.current_state().unwrap()));
    assert_eq!(machine.history().unwrap().get_path(), vec!["Twin"; 3]);
}

/// Reports a fixed series of progress values, then finishes.
struct Working {
    base: StateBase,
    steps: Vec<f64>,
    log: Log,
}

impl State<&'static str> for Working {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn name(&self) -> &str {
        "Working"
    }

    fn on_entered_state(&self, ctx: &mut Context<'_, &'static str>) -> Result<(), MachineError> {
        self.log.lock().unwrap().push("entered Working".to_string());
        for step in &self.steps {
            self.report_progress(*step);
        }
        ctx.queue_input("done");
        Ok(())
    }

    fn process_input(
        self: Arc<Self>,
        input: &'static str,
        ctx: &mut Context<'_, &'static str>,
    ) -> Result<StateRef<&'static str>, MachineError> {
        match input {
            "done" => {
                ctx.report_progress(100.0);
                Ok(Arc::new(Terminal::new("Finished")))
            }
            other => Err(MachineError::unexpected_input(self.name(), &other)),
        }
    }
}

#[test]
fn progress_is_observed_in_order_before_the_transition_completes() {
    let events = log();
    let mut machine = StateMachine::new(
        Arc::new(Working {
            base: StateBase::new(),
            steps: vec![0.0, 25.0, 50.0],
            log: Arc::clone(&events),
        }),
        ["done"],
    );

    let progress = Arc::clone(&events);
    machine.on_progress(move |p| progress.lock().unwrap().push(format!("progress {p}")));
    let states = Arc::clone(&events);
    machine.on_new_state(move |s| states.lock().unwrap().push(format!("new state {}", s.name())));

    machine.start().unwrap();

    assert_eq!(
        entries(&events),
        vec![
            "new state Working",
            "entered Working",
            "progress 0",
            "progress 25",
            "progress 50",
            "progress 100",
            "new state Finished",
        ]
    );
    assert!(machine.is_in_final_state());
}

#[test]
fn progress_after_machine_dropped_is_ignored() {
    let events = log();
    let state = Arc::new(Working {
        base: StateBase::new(),
        steps: vec![],
        log: Arc::clone(&events),
    });

    {
        let mut machine = StateMachine::new(Arc::clone(&state) as StateRef<&'static str>, ["done"]);
        let progress = Arc::clone(&events);
        machine.on_progress(move |p| progress.lock().unwrap().push(format!("progress {p}")));
        machine.start().unwrap();
        assert!(state.base().is_attached());
    }
    events.lock().unwrap().clear();

    state.report_progress(10.0);
    assert!(entries(&events).is_empty());
}

/// Aborts cooperatively: `cancel` or a pending abort leads to `Aborted`.
struct Downloading {
    base: StateBase,
    aborted: Log,
}

impl State<&'static str> for Downloading {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn name(&self) -> &str {
        "Downloading"
    }

    fn can_abort(&self) -> bool {
        true
    }

    fn on_abort(&self) {
        self.aborted.lock().unwrap().push("on_abort".to_string());
    }

    fn process_input(
        self: Arc<Self>,
        input: &'static str,
        _ctx: &mut Context<'_, &'static str>,
    ) -> Result<StateRef<&'static str>, MachineError> {
        if self.abort_requested() {
            return Ok(Arc::new(Terminal::new("Aborted")));
        }
        match input {
            "complete" => Ok(Arc::new(Terminal::new("Installed"))),
            other => Err(MachineError::unexpected_input(self.name(), &other)),
        }
    }
}

#[test]
fn abort_is_cooperative_and_does_not_transition() {
    let calls = log();
    let mut machine = StateMachine::new(
        Arc::new(Downloading {
            base: StateBase::new(),
            aborted: Arc::clone(&calls),
        }),
        ["complete"],
    );
    machine.start().unwrap();

    assert!(machine.abort_current());
    assert_eq!(machine.current_state().unwrap().name(), "Downloading");
    assert!(machine.current_state().unwrap().abort_requested());
    assert_eq!(entries(&calls), vec!["on_abort"]);

    machine.process_input("complete").unwrap();
    assert_eq!(machine.current_state().unwrap().name(), "Aborted");
}

/// Panics on any input.
struct Exploding {
    base: StateBase,
}

impl State<&'static str> for Exploding {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn name(&self) -> &str {
        "Exploding"
    }

    fn process_input(
        self: Arc<Self>,
        _input: &'static str,
        _ctx: &mut Context<'_, &'static str>,
    ) -> Result<StateRef<&'static str>, MachineError> {
        panic!("state blew up");
    }
}

#[test]
fn panic_mid_drain_leaves_machine_refusing_input() {
    let mut machine = StateMachine::new(
        Arc::new(Exploding {
            base: StateBase::new(),
        }),
        ["boom"],
    );
    machine.start().unwrap();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| machine.process_input("boom")));
    assert!(outcome.is_err());

    assert!(machine.is_processing_input());
    assert_eq!(
        machine.process_input("boom"),
        Err(MachineError::AlreadyProcessing)
    );
}

/// Hands control to a state whose entry hook fails, leaving inputs queued.
struct Launcher {
    base: StateBase,
}

impl State<&'static str> for Launcher {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn name(&self) -> &str {
        "Launcher"
    }

    fn process_input(
        self: Arc<Self>,
        input: &'static str,
        ctx: &mut Context<'_, &'static str>,
    ) -> Result<StateRef<&'static str>, MachineError> {
        match input {
            "go" => {
                ctx.queue_input("go");
                ctx.queue_input("stop");
                Ok(Arc::new(Unpacking {
                    base: StateBase::new(),
                }))
            }
            other => Err(MachineError::unexpected_input(self.name(), &other)),
        }
    }
}

/// Entry hook always fails; `go` still moves on afterwards.
struct Unpacking {
    base: StateBase,
}

impl State<&'static str> for Unpacking {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn name(&self) -> &str {
        "Unpacking"
    }

    fn on_entered_state(&self, _ctx: &mut Context<'_, &'static str>) -> Result<(), MachineError> {
        Err(MachineError::state_failed(self.name(), "disk full"))
    }

    fn process_input(
        self: Arc<Self>,
        input: &'static str,
        _ctx: &mut Context<'_, &'static str>,
    ) -> Result<StateRef<&'static str>, MachineError> {
        match input {
            "go" => Ok(Arc::new(Terminal::new("Unpacked"))),
            other => Err(MachineError::unexpected_input(self.name(), &other)),
        }
    }
}

#[test]
fn failing_entry_hook_keeps_new_state_and_clears_queue() {
    let mut machine = StateMachine::new(
        Arc::new(Launcher {
            base: StateBase::new(),
        }),
        ["go", "stop"],
    );
    machine.start().unwrap();

    assert_eq!(
        machine.process_input("go"),
        Err(MachineError::StateFailed {
            state: "Unpacking".to_string(),
            message: "disk full".to_string(),
        })
    );
    assert_eq!(machine.current_state().unwrap().name(), "Unpacking");
    assert_eq!(machine.queued_inputs(), 0);
    assert!(!machine.is_processing_input());

    machine.process_input("go").unwrap();
    assert_eq!(machine.current_state().unwrap().name(), "Unpacked");
    assert!(machine.is_in_final_state());
}

/// Moves to a fresh copy of itself on every input.
struct Ticker {
    base: StateBase,
}

impl State<&'static str> for Ticker {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn name(&self) -> &str {
        "Ticker"
    }

    fn process_input(
        self: Arc<Self>,
        _input: &'static str,
        _ctx: &mut Context<'_, &'static str>,
    ) -> Result<StateRef<&'static str>, MachineError> {
        Ok(Arc::new(Ticker {
            base: StateBase::new(),
        }))
    }
}

fn time_ticks(ticks: usize) -> Duration {
    let mut machine = StateMachine::new(
        Arc::new(Ticker {
            base: StateBase::new(),
        }),
        ["tick"],
    );
    machine.record_history(true);
    machine.start().unwrap();

    let started = Instant::now();
    for _ in 0..ticks {
        machine.process_input("tick").unwrap();
    }
    let elapsed = started.elapsed();

    assert_eq!(machine.history().unwrap().len(), ticks + 1);
    elapsed
}

#[test]
fn recording_history_keeps_transition_cost_flat() {
    let small = time_ticks(2_000).max(Duration::from_millis(1));
    let large = time_ticks(16_000);

    // Eight times the transitions; copying the history on each one would
    // cost roughly sixty-four times as much.
    assert!(
        large < small * 24,
        "16000 transitions took {large:?}, 2000 took {small:?}"
    );
}

#[test]
fn history_is_not_recorded_by_default() {
    let mut machine = StateMachine::new(
        Arc::new(Ticker {
            base: StateBase::new(),
        }),
        ["tick"],
    );
    machine.start().unwrap();
    machine.process_input("tick").unwrap();

    assert!(machine.history().is_none());
}
