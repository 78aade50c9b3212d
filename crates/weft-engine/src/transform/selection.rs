use super::Transform;
use crate::error::Result;
use crate::models::Selection;
use crate::operation::Operation;

impl Transform {
    /// Move the selection to `selection`, normalized against the working
    /// document. Recording is skipped when nothing changes.
    pub fn select(&mut self, selection: Selection) -> Result<()> {
        let selection = selection.normalize(&self.document)?;
        if selection == self.selection {
            return Ok(());
        }
        let previous = self.selection.clone();
        self.record(Operation::set_selection(selection, previous))
    }

    pub fn select_all(&mut self) -> Result<()> {
        let all = Selection::covering(&self.document);
        self.select(Selection {
            is_focused: self.selection.is_focused,
            ..all
        })
    }

    pub fn deselect(&mut self) -> Result<()> {
        self.select(Selection::default())
    }

    pub fn collapse_to_start(&mut self) -> Result<()> {
        let selection = self.selection.collapse_to_start();
        self.select(selection)
    }

    pub fn collapse_to_end(&mut self) -> Result<()> {
        let selection = self.selection.collapse_to_end();
        self.select(selection)
    }

    pub fn collapse_to_anchor(&mut self) -> Result<()> {
        let selection = self.selection.collapse_to_anchor();
        self.select(selection)
    }

    pub fn collapse_to_focus(&mut self) -> Result<()> {
        let selection = self.selection.collapse_to_focus();
        self.select(selection)
    }

    /// Collapse the selection to the start of the text `key`
    pub fn collapse_to_start_of(&mut self, key: &str) -> Result<()> {
        let selection = self.selection.collapse_to_start_of(self.text_node(key)?);
        self.select(selection)
    }

    /// Collapse the selection to the end of the text `key`
    pub fn collapse_to_end_of(&mut self, key: &str) -> Result<()> {
        let selection = self.selection.collapse_to_end_of(self.text_node(key)?);
        self.select(selection)
    }

    /// Shift both points by `n` characters within their texts
    pub fn move_by(&mut self, n: isize) -> Result<()> {
        let selection = self.selection.move_by(n);
        self.select(selection)
    }

    /// Shift the focus by `n` characters within its text
    pub fn extend_by(&mut self, n: isize) -> Result<()> {
        let selection = self.selection.extend_by(n);
        self.select(selection)
    }

    pub fn flip(&mut self) -> Result<()> {
        let selection = self.selection.flip();
        self.select(selection)
    }

    pub fn focus(&mut self) -> Result<()> {
        let selection = self.selection.focus();
        self.select(selection)
    }

    pub fn blur(&mut self) -> Result<()> {
        let selection = self.selection.blur();
        self.select(selection)
    }

    /// Record the current selection unchanged, so undoing the next saved
    /// batch puts the cursor back where it is now
    pub fn snapshot_selection(&mut self) -> Result<()> {
        let selection = self.selection.clone();
        self.record(Operation::set_selection(selection.clone(), selection))
    }
}
