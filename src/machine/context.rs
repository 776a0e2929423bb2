//! Handle passed to states while they run inside a machine.

use crate::machine::{MachineId, ProgressChannel};
use std::collections::VecDeque;
use std::sync::Arc;

/// What a state may touch on its owning machine during
/// [`State::process_input`](crate::core::State::process_input) and
/// [`State::on_entered_state`](crate::core::State::on_entered_state).
pub struct Context<'a, I> {
    queue: &'a mut VecDeque<I>,
    progress: &'a Arc<ProgressChannel>,
    machine_id: MachineId,
}

impl<'a, I> Context<'a, I> {
    pub(crate) fn new(
        queue: &'a mut VecDeque<I>,
        progress: &'a Arc<ProgressChannel>,
        machine_id: MachineId,
    ) -> Self {
        Self {
            queue,
            progress,
            machine_id,
        }
    }

    /// Append an input to the machine's queue.
    ///
    /// The input skips alphabet validation, so states can schedule private
    /// continuation inputs. It is delivered within the current drain.
    pub fn queue_input(&mut self, input: I) {
        self.queue.push_back(input);
    }

    pub fn report_progress(&self, percent: f64) {
        self.progress.emit(percent);
    }

    pub fn queued_inputs(&self) -> usize {
        self.queue.len()
    }

    pub fn machine_id(&self) -> MachineId {
        self.machine_id
    }
}
