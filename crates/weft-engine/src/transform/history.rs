use log::debug;

use super::Transform;
use crate::error::Result;

impl Transform {
    /// Push the operations recorded since the last save onto the undo stack
    /// as one batch, or onto the previous batch when `merge` is set.
    /// Does nothing when there is nothing new to save.
    pub fn save(&mut self, merge: bool) -> &mut Self {
        let pending = self.operations[self.unsaved..].to_vec();
        self.unsaved = self.operations.len();
        self.history.save(pending, merge);
        self
    }

    /// Undo the most recent saved batch by replaying each operation's inverse
    /// in reverse order. Does nothing when there is nothing to undo.
    pub fn undo(&mut self) -> Result<&mut Self> {
        let Some(batch) = self.history.pop_undo() else {
            return Ok(self);
        };
        debug!("Undoing batch of {} operations", batch.len());

        let inverse = batch
            .iter()
            .rev()
            .flat_map(|operation| operation.inverse.iter());
        if let Err(err) = self.replay(inverse) {
            self.history.push_undo(batch);
            return Err(err);
        }
        self.history.push_redo(batch);
        Ok(self)
    }

    /// Reapply the most recently undone batch. Does nothing when there is
    /// nothing to redo.
    pub fn redo(&mut self) -> Result<&mut Self> {
        let Some(batch) = self.history.pop_redo() else {
            return Ok(self);
        };
        debug!("Redoing batch of {} operations", batch.len());

        if let Err(err) = self.replay(batch.iter().map(|operation| &operation.apply)) {
            self.history.push_redo(batch);
            return Err(err);
        }
        self.history.push_undo(batch);
        Ok(self)
    }
}
