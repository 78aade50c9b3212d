use super::Transform;
use crate::error::{Error, Result};
use crate::models::{Key, Mark, MarkSet, Node, Properties, Selection};

/// How far a boundary deletion reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Boundary {
    Char,
    Word,
    Line,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
}

impl Transform {
    /// Insert `text` at the start of `range`, replacing whatever it covers.
    /// Text inside a void node is ignored.
    pub fn insert_text_at_range(
        &mut self,
        range: &Selection,
        text: &str,
        marks: Option<&MarkSet>,
    ) -> Result<()> {
        let range = self.collapse_range(range)?;
        let (key, offset, _, _) = range.points()?;
        if self.document.has_void_parent(key)? {
            return Ok(());
        }
        let key = key.clone();
        self.insert_text_by_key(&key, offset, text, marks)
    }

    /// Remove everything covered by `range`.
    ///
    /// Both ends are split up to their common ancestor, the pieces in between
    /// are removed and the two remaining halves joined back together when
    /// they are of the same kind.
    pub fn delete_at_range(&mut self, range: &Selection) -> Result<()> {
        let range = range.normalize(&self.document)?;
        if range.is_unset() || range.is_collapsed() {
            return Ok(());
        }
        let (start_key, start_offset, end_key, end_offset) = range.points()?;
        let (start_key, end_key) = (start_key.clone(), end_key.clone());

        if start_key == end_key {
            return self.remove_text_by_key(&start_key, start_offset, end_offset - start_offset);
        }

        let ancestor = self.document.common_ancestor(&start_key, &end_key)?;
        let ancestor_key = ancestor.key().clone();
        let start_child = ancestor
            .furthest_ancestor(&start_key)
            .ok_or_else(|| Error::not_found(&start_key))?;
        let end_child = ancestor
            .furthest_ancestor(&end_key)
            .ok_or_else(|| Error::not_found(&end_key))?;
        let start_child_key = start_child.key().clone();
        let end_child_key = end_child.key().clone();
        let start_split = start_child.offset(&start_key)? + start_offset;
        let end_split = end_child.offset(&end_key)? + end_offset;

        // The end goes first so the start split cannot shift it.
        let end_rest = self.split_node_by_key(&end_child_key, end_split)?;
        let start_rest = self.split_node_by_key(&start_child_key, start_split)?;

        let children = self.document.assert_node(&ancestor_key)?.nodes();
        let position = |key: &Key| children.iter().position(|n| n.key() == key);
        let (Some(from), Some(to)) = (position(&start_rest), position(&end_child_key)) else {
            return Err(Error::InvalidOperation(format!(
                "split halves went missing under \"{ancestor_key}\""
            )));
        };
        let doomed: Vec<Key> = children[from..=to].iter().map(|n| n.key().clone()).collect();
        for key in doomed {
            self.remove_node_by_key(&key)?;
        }

        if self.can_join(&start_child_key, &end_rest) {
            self.join_node_by_key(&start_child_key, &end_rest, true)?;
        }
        Ok(())
    }

    /// Delete from a collapsed `range` to the next `boundary` in `direction`.
    ///
    /// An expanded range is deleted as a whole. At the edge of a block a
    /// character deletion reaches into the neighbouring text, joining the
    /// blocks. Inside a void node the whole void node goes.
    pub fn delete_at_range_by(
        &mut self,
        range: &Selection,
        boundary: Boundary,
        direction: Direction,
    ) -> Result<()> {
        let range = range.normalize(&self.document)?;
        if range.is_expanded() {
            return self.delete_at_range(&range);
        }
        let (key, offset, _, _) = range.points()?;
        let key = key.clone();

        if let Some(void) = self.document.closest_void(&key)? {
            let void = void.key().clone();
            return self.remove_node_by_key(&void);
        }

        let Some((target_key, target_offset)) =
            self.boundary_point(&key, offset, boundary, direction)?
        else {
            return Ok(());
        };
        let span = match direction {
            Direction::Backward => Selection::new(target_key, target_offset, key, offset),
            Direction::Forward => Selection::new(key, offset, target_key, target_offset),
        };
        self.delete_at_range(&span)
    }

    /// Split the closest blocks at the start of `range`, `height` levels up,
    /// after deleting what the range covers. Returns the key of the new
    /// second half.
    pub fn split_block_at_range(&mut self, range: &Selection, height: usize) -> Result<Key> {
        let range = self.collapse_range(range)?;
        let (key, offset) = self.document.split_target_at_range(&range, height)?;
        let path = self.document.path(&key)?;
        self.split_node_at_path(path, offset)
    }

    pub fn add_mark_at_range(&mut self, range: &Selection, mark: &Mark) -> Result<()> {
        self.for_each_span(range, |tx, key, offset, length| {
            tx.add_mark_by_key(key, offset, length, mark)
        })
    }

    pub fn remove_mark_at_range(&mut self, range: &Selection, mark: &Mark) -> Result<()> {
        self.for_each_span(range, |tx, key, offset, length| {
            tx.remove_mark_by_key(key, offset, length, mark)
        })
    }

    /// Set `properties` on the closest block of every text in `range`
    pub fn set_block_at_range(&mut self, range: &Selection, properties: Properties) -> Result<()> {
        let range = range.normalize(&self.document)?;
        let keys: Vec<Key> = self
            .document
            .blocks_at_range(&range)?
            .iter()
            .map(|block| block.key().clone())
            .collect();
        for key in keys {
            self.set_node_by_key(&key, properties.clone())?;
        }
        Ok(())
    }

    /// Insert `block` next to the block at the start of `range`.
    ///
    /// At the start of that block the new one goes before it, at the end or
    /// inside a void block it goes after, and anywhere else the block is split
    /// and the new one placed between the halves. Returns the inserted key.
    pub fn insert_block_at_range(&mut self, range: &Selection, block: Node) -> Result<Key> {
        let range = self.collapse_range(range)?;
        let (key, offset, _, _) = range.points()?;
        let key = key.clone();

        let current = match self.document.closest_block(&key)? {
            Some(block) => block,
            None => self
                .document
                .furthest_ancestor(&key)
                .ok_or_else(|| Error::not_found(&key))?,
        };
        let current_key = current.key().clone();
        let at = current.offset(&key)? + offset;
        let length = current.len();
        let is_void = current.is_void();

        let parent = self
            .document
            .parent(&current_key)
            .ok_or_else(|| Error::not_found(&current_key))?;
        let parent_key = parent.key().clone();
        let index = parent
            .nodes()
            .iter()
            .position(|n| n.key() == &current_key)
            .ok_or_else(|| Error::not_found(&current_key))?;

        let index = if is_void || at == length && length > 0 {
            index + 1
        } else if at == 0 {
            index
        } else {
            self.split_node_by_key(&current_key, at)?;
            index + 1
        };
        self.insert_node_by_key(&parent_key, index, block)
    }

    /// Paste the top-level nodes of `fragment` at the start of `range`.
    ///
    /// The top-level node at the insertion point is split in two and the
    /// fragment placed between the halves. The fragment's first node is joined
    /// onto the first half and its last onto the second half where their
    /// kinds match. The selection ends up collapsed after the pasted content.
    pub fn insert_fragment_at_range(&mut self, range: &Selection, fragment: &Node) -> Result<()> {
        if fragment.nodes().is_empty() {
            return Ok(());
        }
        let range = self.collapse_range(range)?;
        let (key, offset, _, _) = range.points()?;
        let key = key.clone();
        let document_key = self.document.key().clone();
        let pasted_end = self.document.offset(&key)? + offset + fragment.len();

        let top = self
            .document
            .furthest_ancestor(&key)
            .ok_or_else(|| Error::not_found(&key))?;
        let top_key = top.key().clone();
        let split_at = top.offset(&key)? + offset;
        let index = self
            .document
            .nodes()
            .iter()
            .position(|n| n.key() == &top_key)
            .ok_or_else(|| Error::not_found(&top_key))?;
        let rest = self.split_node_at_path(vec![index], split_at)?;

        let mut inserted = Vec::with_capacity(fragment.nodes().len());
        for (i, node) in fragment.nodes().iter().enumerate() {
            inserted.push(self.insert_node_by_key(&document_key, index + 1 + i, node.clone())?);
        }

        let mut last = inserted.last().cloned().unwrap_or_else(|| top_key.clone());
        if let Some(first) = inserted.first()
            && self.can_join(&top_key, first)
        {
            self.join_node_by_key(&top_key, first, true)?;
            if inserted.len() == 1 {
                last = top_key.clone();
            }
        }
        if self.can_join(&last, &rest) {
            self.join_node_by_key(&last, &rest, true)?;
        }

        match self.document.point_at_offset(pasted_end) {
            Some((key, offset)) => self.select(Selection::collapsed(key, offset)),
            None => Ok(()),
        }
    }

    /// Normalize `range`, deleting its contents first when it is expanded,
    /// and return the collapsed start
    fn collapse_range(&mut self, range: &Selection) -> Result<Selection> {
        let range = range.normalize(&self.document)?;
        if range.is_expanded() {
            self.delete_at_range(&range)?;
            return range.collapse_to_start().normalize(&self.document);
        }
        Ok(range)
    }

    /// Call `f` with `(text key, offset, length)` for the part of every text
    /// the range covers
    fn for_each_span<F>(&mut self, range: &Selection, mut f: F) -> Result<()>
    where
        F: FnMut(&mut Self, &str, usize, usize) -> Result<()>,
    {
        let range = range.normalize(&self.document)?;
        if range.is_collapsed() {
            return Ok(());
        }
        let (start_key, start_offset, end_key, end_offset) = range.points()?;
        let spans: Vec<(Key, usize, usize)> = self
            .document
            .texts_at_range(&range)?
            .into_iter()
            .map(|text| {
                let from = if text.key() == start_key { start_offset } else { 0 };
                let to = if text.key() == end_key {
                    end_offset
                } else {
                    text.len()
                };
                (text.key().clone(), from, to.saturating_sub(from))
            })
            .collect();
        for (key, offset, length) in spans {
            if length > 0 {
                f(self, &key, offset, length)?;
            }
        }
        Ok(())
    }

    fn can_join(&self, first: &str, second: &str) -> bool {
        match (self.document.descendant(first), self.document.descendant(second)) {
            (Some(first), Some(second)) => {
                first.is_joinable_with(second) && !first.is_void() && !second.is_void()
            }
            _ => false,
        }
    }

    /// The far end of a boundary deletion starting at `(key, offset)`
    fn boundary_point(
        &self,
        key: &str,
        offset: usize,
        boundary: Boundary,
        direction: Direction,
    ) -> Result<Option<(Key, usize)>> {
        let document = &self.document;
        let block = document.closest_block(key)?.unwrap_or(document);
        let at = block.offset(key)? + offset;
        let length = block.len();
        let chars: Vec<char> = block.text_content().chars().collect();

        let target = match direction {
            Direction::Backward if at == 0 => {
                return Ok(document
                    .previous_text(key)
                    .map(|text| (text.key().clone(), text.len())));
            }
            Direction::Forward if at == length => {
                return Ok(document
                    .next_text(key)
                    .map(|text| (text.key().clone(), 0)));
            }
            Direction::Backward => match boundary {
                Boundary::Char => at - 1,
                Boundary::Word => word_start(&chars, at),
                Boundary::Line => 0,
            },
            Direction::Forward => match boundary {
                Boundary::Char => at + 1,
                Boundary::Word => word_end(&chars, at),
                Boundary::Line => length,
            },
        };
        Ok(block.point_at_offset(target))
    }
}

/// Start of the word before `from`, skipping whitespace first
fn word_start(chars: &[char], from: usize) -> usize {
    let mut i = from;
    while i > 0 && chars[i - 1].is_whitespace() {
        i -= 1;
    }
    while i > 0 && !chars[i - 1].is_whitespace() {
        i -= 1;
    }
    i
}

/// End of the word after `from`, skipping whitespace first
fn word_end(chars: &[char], from: usize) -> usize {
    let mut i = from;
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    while i < chars.len() && !chars[i].is_whitespace() {
        i += 1;
    }
    i
}
