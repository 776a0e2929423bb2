//! The `State` trait and the per-state bookkeeping every state embeds.
//!
//! A state is one step of a sequential process. It consumes one input at a
//! time and decides which freshly constructed state comes next. States are
//! handed around as [`StateRef`] (an `Arc<dyn State<I>>`) so the machine can
//! tell a genuine successor apart from a state that returned itself.

use crate::machine::{Context, MachineError, ProgressChannel};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

/// Shared handle to a state held by a machine.
pub type StateRef<I> = Arc<dyn State<I>>;

/// Bookkeeping shared by every state implementation.
///
/// Concrete states embed one `StateBase` and return it from
/// [`State::base`]. It carries the final-state flag (fixed at construction),
/// the cooperative abort flag, and the attachment to the owning machine's
/// progress channel.
pub struct StateBase {
    is_final: bool,
    abort_requested: AtomicBool,
    progress: OnceLock<Weak<ProgressChannel>>,
}

impl StateBase {
    /// Base for an intermediate (non-final) state.
    pub fn new() -> Self {
        Self::with_final(false)
    }

    /// Base for a terminal state.
    pub fn terminal() -> Self {
        Self::with_final(true)
    }

    pub fn with_final(is_final: bool) -> Self {
        Self {
            is_final,
            abort_requested: AtomicBool::new(false),
            progress: OnceLock::new(),
        }
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn abort_requested(&self) -> bool {
        self.abort_requested.load(Ordering::Acquire)
    }

    /// Whether this state has been installed into a machine.
    pub fn is_attached(&self) -> bool {
        self.progress.get().is_some()
    }

    /// Publish progress through the owning machine.
    ///
    /// Does nothing if the state was never installed, or if the machine has
    /// since been dropped. Safe to call from helper threads.
    pub fn report_progress(&self, percent: f64) {
        if let Some(channel) = self.progress.get().and_then(Weak::upgrade) {
            channel.emit(percent);
        }
    }

    pub(crate) fn request_abort(&self) {
        self.abort_requested.store(true, Ordering::Release);
    }

    /// Set once, when the state first becomes current.
    pub(crate) fn attach(&self, channel: &Arc<ProgressChannel>) {
        let _ = self.progress.set(Arc::downgrade(channel));
    }
}

impl Default for StateBase {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StateBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateBase")
            .field("is_final", &self.is_final)
            .field("abort_requested", &self.abort_requested())
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// One step of a machine-driven process.
///
/// Implementors provide [`base`](State::base), [`name`](State::name) and
/// [`process_input`](State::process_input); everything else has a default.
/// The provided `is_final`, `abort`, `abort_requested` and `report_progress`
/// read and write the embedded [`StateBase`] and are not meant to be
/// overridden.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use stepwise::core::{State, StateBase, StateRef};
/// use stepwise::machine::{Context, MachineError};
///
/// struct Idle {
///     base: StateBase,
/// }
///
/// struct Done {
///     base: StateBase,
/// }
///
/// impl State<&'static str> for Idle {
///     fn base(&self) -> &StateBase {
///         &self.base
///     }
///
///     fn name(&self) -> &str {
///         "Idle"
///     }
///
///     fn process_input(
///         self: Arc<Self>,
///         input: &'static str,
///         _ctx: &mut Context<'_, &'static str>,
///     ) -> Result<StateRef<&'static str>, MachineError> {
///         match input {
///             "go" => Ok(Arc::new(Done { base: StateBase::terminal() })),
///             other => Err(MachineError::unexpected_input(self.name(), &other)),
///         }
///     }
/// }
///
/// impl State<&'static str> for Done {
///     fn base(&self) -> &StateBase {
///         &self.base
///     }
///
///     fn name(&self) -> &str {
///         "Done"
///     }
///
///     fn process_input(
///         self: Arc<Self>,
///         input: &'static str,
///         _ctx: &mut Context<'_, &'static str>,
///     ) -> Result<StateRef<&'static str>, MachineError> {
///         Err(MachineError::unexpected_input(self.name(), &input))
///     }
/// }
///
/// let idle = Idle { base: StateBase::new() };
/// assert!(!idle.is_final());
/// ```
pub trait State<I>: Send + Sync {
    /// The embedded bookkeeping for this state.
    fn base(&self) -> &StateBase;

    /// Display name used for logging, history and snapshots.
    fn name(&self) -> &str;

    /// Consume one input and produce the next state.
    ///
    /// The result must be a newly constructed state. Returning `self` is a
    /// stale transition and the machine fails with
    /// [`MachineError::StaleTransition`].
    fn process_input(
        self: Arc<Self>,
        input: I,
        ctx: &mut Context<'_, I>,
    ) -> Result<StateRef<I>, MachineError>;

    /// Called exactly once, right after this state becomes current and
    /// before any queued input is delivered to it.
    fn on_entered_state(&self, _ctx: &mut Context<'_, I>) -> Result<(), MachineError> {
        Ok(())
    }

    fn can_abort(&self) -> bool {
        false
    }

    /// Hook run by [`abort`](State::abort) once the abort flag is set.
    fn on_abort(&self) {}

    fn is_final(&self) -> bool {
        self.base().is_final()
    }

    /// Request cooperative cancellation.
    ///
    /// A no-op unless [`can_abort`](State::can_abort) returns true. The
    /// state is still responsible for producing its successor (typically a
    /// terminal "aborted" state) through the normal transition path.
    fn abort(&self) {
        if self.can_abort() {
            self.base().request_abort();
            self.on_abort();
        }
    }

    fn abort_requested(&self) -> bool {
        self.base().abort_requested()
    }

    fn report_progress(&self, percent: f64) {
        self.base().report_progress(percent);
    }
}

impl<I> fmt::Debug for dyn State<I> + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("name", &self.name())
            .field("is_final", &self.is_final())
            .field("abort_requested", &self.abort_requested())
            .finish()
    }
}
