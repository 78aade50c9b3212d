use super::{Boundary, Direction, Transform};
use crate::error::{Error, Result};
use crate::models::{Mark, MarkSet, Node, Properties, Selection};

impl Transform {
    /// Type `text` at the selection, replacing it when expanded. Pending
    /// selection marks win over the marks at the cursor.
    pub fn insert_text(&mut self, text: &str) -> Result<()> {
        let selection = self.current_range()?;
        let marks = selection.marks.clone();
        self.insert_text_at_range(&selection, text, marks.as_ref())
    }

    /// Delete the selected content and collapse to where it started
    pub fn delete(&mut self) -> Result<()> {
        let selection = self.current_range()?;
        if selection.is_collapsed() {
            return Ok(());
        }
        let start = selection.collapse_to_start();
        self.delete_at_range(&selection)?;
        self.select(start)
    }

    pub fn delete_backward(&mut self, boundary: Boundary) -> Result<()> {
        let selection = self.current_range()?;
        self.delete_at_range_by(&selection, boundary, Direction::Backward)
    }

    pub fn delete_forward(&mut self, boundary: Boundary) -> Result<()> {
        let selection = self.current_range()?;
        self.delete_at_range_by(&selection, boundary, Direction::Forward)
    }

    /// Split the blocks at the selection `depth` levels up and move the
    /// cursor to the start of the new second half
    pub fn split_block(&mut self, depth: usize) -> Result<()> {
        let selection = self.current_range()?;
        let second = self.split_block_at_range(&selection, depth)?;
        let node = self.document.assert_descendant(&second)?;
        let text = node
            .as_text()
            .or_else(|| node.first_text())
            .ok_or_else(|| Error::InvalidOperation(format!("\"{second}\" holds no text")))?;
        let cursor = self.selection.collapse_to_start_of(text);
        self.select(cursor)
    }

    /// Add `mark` to the selected text. On a collapsed selection the mark is
    /// stored on the selection and applied to the next insert.
    pub fn add_mark(&mut self, mark: &Mark) -> Result<()> {
        let selection = self.current_range()?;
        if selection.is_expanded() {
            return self.add_mark_at_range(&selection, mark);
        }
        let mut marks = self.pending_marks(&selection)?;
        marks.insert(mark.clone());
        self.select(selection.with_marks(Some(marks)))
    }

    pub fn remove_mark(&mut self, mark: &Mark) -> Result<()> {
        let selection = self.current_range()?;
        if selection.is_expanded() {
            return self.remove_mark_at_range(&selection, mark);
        }
        let mut marks = self.pending_marks(&selection)?;
        marks.remove(mark);
        self.select(selection.with_marks(Some(marks)))
    }

    /// Remove `mark` when the selection already carries it, add it otherwise
    pub fn toggle_mark(&mut self, mark: &Mark) -> Result<()> {
        let selection = self.current_range()?;
        let present = if selection.is_expanded() {
            self.document.marks_at_range(&selection)?.contains(mark)
        } else {
            self.pending_marks(&selection)?.contains(mark)
        };
        if present {
            self.remove_mark(mark)
        } else {
            self.add_mark(mark)
        }
    }

    pub fn set_block(&mut self, properties: Properties) -> Result<()> {
        let selection = self.current_range()?;
        self.set_block_at_range(&selection, properties)
    }

    /// Insert `block` at the selection and put the cursor at its end
    pub fn insert_block(&mut self, block: Node) -> Result<()> {
        let selection = self.current_range()?;
        let key = self.insert_block_at_range(&selection, block)?;
        let Some(text) = self.document.assert_descendant(&key)?.last_text() else {
            return Ok(());
        };
        let cursor = self.selection.collapse_to_end_of(text);
        self.select(cursor)
    }

    pub fn insert_fragment(&mut self, fragment: &Node) -> Result<()> {
        let selection = self.current_range()?;
        self.insert_fragment_at_range(&selection, fragment)
    }

    fn current_range(&self) -> Result<Selection> {
        if self.selection.is_unset() {
            return Err(Error::InvalidRange("there is no selection".to_string()));
        }
        self.selection.normalize(&self.document)
    }

    /// Marks the next typed character would get
    fn pending_marks(&self, selection: &Selection) -> Result<MarkSet> {
        match &selection.marks {
            Some(marks) => Ok(marks.clone()),
            None => self.document.marks_at_range(selection),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{Mark, Node, Properties, Selection, marks};
    use crate::state::State;
    use crate::transform::{Boundary, Transform};
    use crate::tree::format_tree;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    fn transform() -> Transform {
        State::new(
            Node::document(vec![
                Node::block("paragraph", vec![Node::text("hello").with_key("t1")]).with_key("b1"),
                Node::block("paragraph", vec![Node::text("world").with_key("t2")]).with_key("b2"),
            ])
            .with_key("doc"),
        )
        .transform()
    }

    #[test]
    fn test_typing_moves_the_cursor() {
        let mut tx = transform();
        tx.insert_text("ab").unwrap();
        tx.insert_text("c").unwrap();

        assert_eq!(tx.document().nodes()[0].text_content(), "abchello");
        assert_eq!(tx.selection(), &Selection::collapsed("t1", 3));
    }

    #[test]
    fn test_typing_over_a_selection() {
        let mut tx = transform();
        tx.select(Selection::new("t1", 3, "t2", 2)).unwrap();
        tx.insert_text("p").unwrap();

        assert_eq!(tx.document().text_content(), "helprld");
        assert_eq!(tx.selection(), &Selection::collapsed("t1", 4));
    }

    #[test]
    fn test_delete_collapses_to_start() {
        let mut tx = transform();
        tx.select(Selection::new("t2", 2, "t1", 3)).unwrap();
        tx.delete().unwrap();

        assert_eq!(tx.document().text_content(), "helrld");
        assert_eq!(tx.selection(), &Selection::collapsed("t1", 3));
    }

    #[test]
    fn test_backspace_at_block_start_joins() {
        let mut tx = transform();
        tx.collapse_to_start_of("t2").unwrap();
        tx.delete_backward(Boundary::Char).unwrap();

        assert_snapshot!(format_tree(tx.document()), @r#"
        document
          block "paragraph"
            text "helloworld"
        "#);
        assert_eq!(tx.selection(), &Selection::collapsed("t1", 5));
    }

    #[test]
    fn test_delete_forward_by_word() {
        let mut tx = transform();
        tx.delete_forward(Boundary::Word).unwrap();

        assert_eq!(tx.document().nodes()[0].text_content(), "");
    }

    #[test]
    fn test_split_block_moves_cursor_into_second_half() {
        let mut tx = transform();
        tx.select(Selection::collapsed("t1", 2)).unwrap();
        tx.split_block(1).unwrap();
        tx.insert_text("X").unwrap();

        let texts: Vec<String> = tx.document().nodes().iter().map(Node::text_content).collect();
        assert_eq!(texts, vec!["he", "Xllo", "world"]);
    }

    #[test]
    fn test_pending_marks_apply_to_next_insert() {
        let mut tx = transform();
        let bold = Mark::new("bold");
        tx.add_mark(&bold).unwrap();
        assert_eq!(tx.selection().marks, Some(marks(["bold"])));

        tx.insert_text("B").unwrap();
        let text = tx.text_node("t1").unwrap();
        assert_eq!(text.characters()[0].marks, marks(["bold"]));
        assert!(text.characters()[1].marks.is_empty());
    }

    #[test]
    fn test_toggle_mark_on_range() {
        let mut tx = transform();
        let italic = Mark::new("italic");
        tx.select(Selection::new("t1", 0, "t1", 5)).unwrap();

        tx.toggle_mark(&italic).unwrap();
        assert_eq!(tx.document().marks(), marks(["italic"]));

        tx.toggle_mark(&italic).unwrap();
        assert!(tx.document().marks().is_empty());
    }

    #[test]
    fn test_set_block_and_insert_block() {
        let mut tx = transform();
        tx.set_block(Properties::with_type("heading")).unwrap();
        assert_eq!(tx.document().nodes()[0].node_type(), Some("heading"));

        tx.collapse_to_end_of("t1").unwrap();
        tx.insert_block(Node::block("paragraph", vec![Node::text("new")])).unwrap();

        let texts: Vec<String> = tx.document().nodes().iter().map(Node::text_content).collect();
        assert_eq!(texts, vec!["hello", "new", "world"]);
        assert_eq!(tx.selection().focus_offset, 3);
    }

    #[test]
    fn test_insert_fragment_at_cursor() {
        let mut tx = transform();
        tx.collapse_to_end_of("t2").unwrap();
        tx.insert_fragment(&Node::document(vec![Node::block(
            "paragraph",
            vec![Node::text("!")],
        )]))
        .unwrap();

        assert_eq!(tx.document().text_content(), "helloworld!");
        assert_eq!(tx.selection(), &Selection::collapsed("t2", 6));
    }

    #[test]
    fn test_editing_without_a_selection_fails() {
        let mut tx = transform();
        tx.deselect().unwrap();
        assert!(tx.insert_text("x").is_err());
    }
}
