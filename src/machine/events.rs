//! Listener plumbing for "new state" and "progress" notifications.
//!
//! Listeners run synchronously on whichever thread fires the event, in
//! registration order. The progress channel is shared with every attached
//! state so that work running on helper threads can publish progress too.

use crate::core::StateRef;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Callback fired after a state becomes current and before its entry hook.
pub type NewStateListener<I> = Box<dyn Fn(&StateRef<I>) + Send>;

/// Callback fired for each progress report. The payload is a percentage.
pub type ProgressListener = Arc<dyn Fn(f64) + Send + Sync>;

/// Fan-out for progress reports.
#[derive(Default)]
pub(crate) struct ProgressChannel {
    listeners: RwLock<Vec<ProgressListener>>,
}

impl ProgressChannel {
    pub(crate) fn subscribe(&self, listener: ProgressListener) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    pub(crate) fn emit(&self, percent: f64) {
        // Snapshot first so a listener may subscribe without deadlocking.
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in &listeners {
            listener(percent);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl fmt::Debug for ProgressChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressChannel")
            .field("listeners", &self.len())
            .finish()
    }
}
