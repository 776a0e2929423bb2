//! State entry history tracking.
//!
//! Records every state a machine enters, in order, with a timestamp.
//! States themselves are behavior and are not serializable, so the
//! history keeps their names and finality only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single state becoming current.
///
/// # Example
///
/// ```rust
/// use stepwise::core::StateEntry;
/// use chrono::Utc;
///
/// let entry = StateEntry {
///     sequence: 0,
///     state: "Startup".to_string(),
///     is_final: false,
///     timestamp: Utc::now(),
/// };
/// assert_eq!(entry.state, "Startup");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateEntry {
    /// Position of this entry, starting at 0 for the initial state
    pub sequence: usize,
    /// Name of the state that was entered
    pub state: String,
    /// Whether the entered state was terminal
    pub is_final: bool,
    /// When the state was entered
    pub timestamp: DateTime<Utc>,
}

/// Ordered history of entered states.
///
/// History is immutable - `record` returns a new history with the entry
/// appended.
///
/// # Example
///
/// ```rust
/// use stepwise::core::{StateEntry, StateHistory};
/// use chrono::Utc;
///
/// let history = StateHistory::new()
///     .record(StateEntry {
///         sequence: 0,
///         state: "Checking".to_string(),
///         is_final: false,
///         timestamp: Utc::now(),
///     })
///     .record(StateEntry {
///         sequence: 1,
///         state: "Done".to_string(),
///         is_final: true,
///         timestamp: Utc::now(),
///     });
///
/// assert_eq!(history.get_path(), vec!["Checking", "Done"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateHistory {
    entries: Vec<StateEntry>,
}

impl StateHistory {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Record an entry, returning a new history.
    ///
    /// The existing history is left untouched.
    pub fn record(&self, entry: StateEntry) -> Self {
        let mut entries = self.entries.clone();
        entries.push(entry);
        Self { entries }
    }

    /// Append an entry in place.
    pub(crate) fn push(&mut self, entry: StateEntry) {
        self.entries.push(entry);
    }

    /// Names of the states entered, in order.
    pub fn get_path(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.state.as_str()).collect()
    }

    /// Time elapsed between the first and last entry.
    ///
    /// Returns `None` for an empty history.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.entries.first(), self.entries.last()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    pub fn last(&self) -> Option<&StateEntry> {
        self.entries.last()
    }

    pub fn entries(&self) -> &[StateEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
