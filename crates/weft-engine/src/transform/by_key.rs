use super::Transform;
use crate::error::{Error, Result};
use crate::models::{Character, Key, Mark, MarkSet, Node, Path, Properties, Text};
use crate::operation::Operation;

impl Transform {
    /// Insert `node` as child `index` of `parent`, returning the key it ends
    /// up with. Keys already used anywhere in the document are regenerated.
    pub fn insert_node_by_key(&mut self, parent: &str, index: usize, node: Node) -> Result<Key> {
        let mut path = self.document.path(parent)?;
        let parent_node = self.document.assert_path(&path)?;
        if parent_node.is_text() || index > parent_node.nodes().len() {
            return Err(Error::InvalidOperation(format!(
                "cannot insert at index {index} of \"{parent}\""
            )));
        }

        let mut taken = self.document.keys();
        taken.insert(self.document.key().clone());
        let node = node.regenerate_colliding_keys(&taken);
        let key = node.key().clone();

        path.push(index);
        self.record(Operation::insert_node(path, node))?;
        Ok(key)
    }

    pub fn remove_node_by_key(&mut self, key: &str) -> Result<()> {
        let path = self.document.path(key)?;
        if path.is_empty() {
            return Err(Error::InvalidOperation(
                "cannot remove the document itself".to_string(),
            ));
        }
        let node = self.document.assert_path(&path)?.clone();
        self.record(Operation::remove_node(path, node))
    }

    /// Insert `text` into the text `key`. Without explicit `marks` the new
    /// characters take the marks of the character before `offset`.
    pub fn insert_text_by_key(
        &mut self,
        key: &str,
        offset: usize,
        text: &str,
        marks: Option<&MarkSet>,
    ) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let target = self.text_node(key)?;
        if offset > target.len() {
            return Err(Error::InvalidRange(format!(
                "offset {offset} is past the end of \"{key}\""
            )));
        }
        let marks = marks
            .cloned()
            .unwrap_or_else(|| target.marks_before(offset));
        let characters = Character::from_str_with_marks(text, &marks);
        let operation = Operation::insert_text(target.key().clone(), offset, characters);
        self.record(operation)
    }

    pub fn remove_text_by_key(&mut self, key: &str, offset: usize, length: usize) -> Result<()> {
        if length == 0 {
            return Ok(());
        }
        let target = self.text_node(key)?;
        let characters = target
            .characters()
            .get(offset..offset + length)
            .ok_or_else(|| {
                Error::InvalidRange(format!(
                    "cannot remove {length} characters at {offset} from \"{key}\""
                ))
            })?
            .to_vec();
        let operation = Operation::remove_text(target.key().clone(), offset, characters);
        self.record(operation)
    }

    pub fn add_mark_by_key(
        &mut self,
        key: &str,
        offset: usize,
        length: usize,
        mark: &Mark,
    ) -> Result<()> {
        self.update_marks(key, offset, length, |marks| {
            marks.insert(mark.clone());
        })
    }

    pub fn remove_mark_by_key(
        &mut self,
        key: &str,
        offset: usize,
        length: usize,
        mark: &Mark,
    ) -> Result<()> {
        self.update_marks(key, offset, length, |marks| {
            marks.remove(mark);
        })
    }

    fn update_marks<F>(&mut self, key: &str, offset: usize, length: usize, f: F) -> Result<()>
    where
        F: Fn(&mut MarkSet),
    {
        let target = self.text_node(key)?;
        let before: Vec<MarkSet> = target
            .characters()
            .get(offset..offset + length)
            .ok_or_else(|| {
                Error::InvalidRange(format!(
                    "cannot mark {length} characters at {offset} in \"{key}\""
                ))
            })?
            .iter()
            .map(|c| c.marks.clone())
            .collect();
        let after: Vec<MarkSet> = before
            .iter()
            .map(|marks| {
                let mut marks = marks.clone();
                f(&mut marks);
                marks
            })
            .collect();
        if before == after {
            return Ok(());
        }
        let operation = Operation::set_marks(target.key().clone(), offset, before, after);
        self.record(operation)
    }

    /// Change the type or void flag of a block or inline
    pub fn set_node_by_key(&mut self, key: &str, properties: Properties) -> Result<()> {
        if properties.is_empty() {
            return Ok(());
        }
        let node = self.document.assert_node(key)?;
        let container = node.container().ok_or_else(|| {
            Error::InvalidOperation(format!("text node \"{key}\" has no properties"))
        })?;
        let previous = container.properties_for(&properties);
        let operation = Operation::set_node(node.key().clone(), properties, previous);
        self.record(operation)
    }

    /// Split the node `key` at `offset`, returning the key of the new second half
    pub fn split_node_by_key(&mut self, key: &str, offset: usize) -> Result<Key> {
        let path = self.document.path(key)?;
        self.split_node_at_path(path, offset)
    }

    pub(crate) fn split_node_at_path(&mut self, path: Path, offset: usize) -> Result<Key> {
        let (_, keys) = self.document.split_node_recording(&path, offset)?;
        let second = keys
            .last()
            .cloned()
            .ok_or_else(|| Error::InvalidOperation("split created no node".to_string()))?;
        self.record(Operation::split_node(path, offset, keys))?;
        Ok(second)
    }

    /// Join `second` into `first`. `second` must be the next sibling of `first`.
    pub fn join_node_by_key(&mut self, first: &str, second: &str, deep: bool) -> Result<()> {
        let path = self.document.path(first)?;
        let second_node = match self.document.next_sibling(first)? {
            Some(node) if node.key().as_str() == second => node.clone(),
            _ => {
                return Err(Error::InvalidOperation(format!(
                    "\"{second}\" is not the next sibling of \"{first}\""
                )));
            }
        };
        let first_node = self.document.assert_path(&path)?.clone();
        let merged = self
            .document
            .join_node(first, second, deep)?
            .assert_path(&path)?
            .clone();
        self.record(Operation::join_node(
            path,
            deep,
            first_node,
            second_node,
            merged,
        ))
    }

    pub(crate) fn text_node(&self, key: &str) -> Result<&Text> {
        self.document
            .assert_descendant(key)?
            .as_text()
            .ok_or_else(|| Error::InvalidOperation(format!("\"{key}\" is not a text node")))
    }
}
