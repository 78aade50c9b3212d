use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::operation::Operation;
use weft_config::DEFAULT_MAX_UNDOS;

/// Operations saved together and undone together
pub type Batch = Vec<Operation>;

/// Undo and redo stacks of operation batches.
///
/// The undo stack is bounded; saving past the bound discards the oldest
/// batch. Saving anything new clears the redo stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    undos: VecDeque<Batch>,
    redos: Vec<Batch>,
    max_undos: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UNDOS)
    }
}

impl History {
    pub fn new(max_undos: usize) -> Self {
        Self {
            undos: VecDeque::new(),
            redos: Vec::new(),
            max_undos,
        }
    }

    /// Saved batches, oldest first
    pub fn undos(&self) -> &VecDeque<Batch> {
        &self.undos
    }

    /// Undone batches, most recently undone last
    pub fn redos(&self) -> &[Batch] {
        &self.redos
    }

    pub fn max_undos(&self) -> usize {
        self.max_undos
    }

    pub fn can_undo(&self) -> bool {
        !self.undos.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redos.is_empty()
    }

    /// Push `batch` as a new undo entry, or append it to the latest entry when
    /// `merge` is set. Empty batches are ignored.
    pub(crate) fn save(&mut self, batch: Batch, merge: bool) {
        if batch.is_empty() {
            return;
        }
        self.redos.clear();

        if merge && let Some(previous) = self.undos.back_mut() {
            debug!("Merging {} operations into previous batch", batch.len());
            previous.extend(batch);
        } else {
            debug!("Saving batch of {} operations", batch.len());
            self.undos.push_back(batch);
        }
        self.enforce_limit();
    }

    pub(crate) fn pop_undo(&mut self) -> Option<Batch> {
        self.undos.pop_back()
    }

    pub(crate) fn push_undo(&mut self, batch: Batch) {
        self.undos.push_back(batch);
        self.enforce_limit();
    }

    pub(crate) fn pop_redo(&mut self) -> Option<Batch> {
        self.redos.pop()
    }

    pub(crate) fn push_redo(&mut self, batch: Batch) {
        self.redos.push(batch);
    }

    fn enforce_limit(&mut self) {
        while self.undos.len() > self.max_undos {
            if let Some(dropped) = self.undos.pop_front() {
                warn!(
                    "Undo history is full ({} batches); discarding oldest batch of {} operations",
                    self.max_undos,
                    dropped.len()
                );
            }
        }
    }
}
