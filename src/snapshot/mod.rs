//! Diagnostic snapshots of a running state machine.
//!
//! States carry behavior and cannot be serialized, so a snapshot records
//! what an observer needs to report on a machine: which state it is in,
//! whether it has finished, how much input is pending, and the path it
//! took to get there.

use crate::core::StateHistory;
use crate::machine::{MachineId, StateMachine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod error;

pub use error::SnapshotError;

/// Version identifier for snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable view of a machine at one point in time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MachineSnapshot {
    /// Snapshot format version
    pub version: u32,

    /// Machine the snapshot was taken from
    pub machine_id: MachineId,

    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,

    /// Name of the current state, `None` before the machine was started
    pub current_state: Option<String>,

    /// Whether the current state is terminal
    pub is_final: bool,

    /// Inputs waiting in the queue
    pub queued_inputs: usize,

    /// Entered states, when the machine records them
    pub history: Option<StateHistory>,
}

impl MachineSnapshot {
    pub fn capture<I>(machine: &StateMachine<I>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            machine_id: machine.id(),
            timestamp: Utc::now(),
            current_state: machine.current_state().map(|s| s.name().to_string()),
            is_final: machine.is_in_final_state(),
            queued_inputs: machine.queued_inputs(),
            history: machine.history().cloned(),
        }
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        bincode::serialize(self).map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = bincode::deserialize(bytes)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Check the version and internal consistency of a decoded snapshot.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.version,
                supported: SNAPSHOT_VERSION,
            });
        }

        if self.current_state.is_none() && self.is_final {
            return Err(SnapshotError::ValidationFailed(
                "unstarted machine cannot be final".to_string(),
            ));
        }

        if let (Some(current), Some(last)) = (
            &self.current_state,
            self.history.as_ref().and_then(StateHistory::last),
        ) {
            if &last.state != current {
                return Err(SnapshotError::ValidationFailed(format!(
                    "history ends in '{}' but current state is '{}'",
                    last.state, current
                )));
            }
        }

        Ok(())
    }
}

impl<I> StateMachine<I> {
    /// Capture a [`MachineSnapshot`] of this machine.
    pub fn snapshot(&self) -> MachineSnapshot {
        MachineSnapshot::capture(self)
    }
}
