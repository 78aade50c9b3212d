//! Working sessions that edit a state and produce the next one.
//!
//! Every edit goes through [`Transform::record`], which applies an
//! [`Operation`] to the working document straight away and keeps it for the
//! history. Higher level transforms only ever compose recorded operations.

mod at_range;
mod at_selection;
mod by_key;
mod history;
mod normalize;
mod selection;

pub use at_range::{Boundary, Direction};

use log::{debug, trace};

use crate::error::Result;
use crate::models::{History, Node, Selection};
use crate::operation::{Edit, Operation};
use crate::state::{EngineOptions, State};

/// An open editing session against a [`State`].
///
/// Calls mutate the transform's own copy of the document; nothing is visible
/// to the originating state. [`Transform::apply`] consumes the session, so a
/// finished transform cannot be edited further. Dropping a transform discards
/// its edits.
#[derive(Debug)]
pub struct Transform {
    document: Node,
    selection: Selection,
    history: History,
    options: EngineOptions,
    version: u64,
    operations: Vec<Operation>,
    /// Index of the first operation not yet saved to history
    unsaved: usize,
}

impl Transform {
    pub(crate) fn new(state: State) -> Self {
        let (document, selection, history, options, version) = state.into_parts();
        Self {
            document,
            selection,
            history,
            options,
            version,
            operations: Vec::new(),
            unsaved: 0,
        }
    }

    pub fn document(&self) -> &Node {
        &self.document
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Every operation recorded so far, oldest first
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub(crate) fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Finish the session and produce the next state.
    ///
    /// Unsaved operations are not added to the history; call
    /// [`Transform::save`] first to make them undoable.
    pub fn apply(self) -> State {
        debug!(
            "Applying transform with {} operations ({} unsaved)",
            self.operations.len(),
            self.operations.len() - self.unsaved
        );
        State::from_parts(
            self.document,
            self.selection,
            self.history,
            self.options,
            self.version + 1,
        )
    }

    /// Apply `operation` to the working document and record it
    pub(crate) fn record(&mut self, operation: Operation) -> Result<()> {
        trace!("Recording {}", operation.apply.name());
        self.run(&operation.apply)?;
        self.operations.push(operation);
        Ok(())
    }

    fn run(&mut self, edit: &Edit) -> Result<()> {
        let (document, selection) = edit.apply(&self.document, &self.selection)?;
        self.document = document;
        self.selection = selection;
        Ok(())
    }

    /// Replay edits without recording them, leaving the working copy
    /// untouched if any of them fails
    fn replay<'a>(&mut self, edits: impl IntoIterator<Item = &'a Edit>) -> Result<()> {
        let mut document = self.document.clone();
        let mut selection = self.selection.clone();
        for edit in edits {
            trace!("Replaying {}", edit.name());
            (document, selection) = edit.apply(&document, &selection)?;
        }
        self.document = document;
        self.selection = selection;
        Ok(())
    }
}
