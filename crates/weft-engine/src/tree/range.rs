//! Mapping between character offsets, keyed points and selections.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::models::{Character, Key, MarkSet, Node, Selection, Text};

impl Node {
    /// Character offset of `key` from the start of this node
    pub fn offset(&self, key: &str) -> Result<usize> {
        if self.key().as_str() == key {
            return Ok(0);
        }
        let mut offset = 0;
        for child in self.nodes() {
            if child.key().as_str() == key {
                return Ok(offset);
            }
            if child.has_descendant(key) {
                return Ok(offset + child.offset(key)?);
            }
            offset += child.len();
        }
        Err(Error::not_found(key))
    }

    /// The text holding character `offset` of this node.
    ///
    /// Offset 0 is the first text and `len()` the last text. Anywhere between,
    /// the first text whose cumulative length exceeds `offset` wins, so a
    /// boundary between two texts resolves to the later one. Past the end is `None`.
    pub fn text_at_offset(&self, offset: usize) -> Option<&Text> {
        if offset == 0 {
            return self.first_text();
        }
        let length = self.len();
        if offset == length {
            return self.last_text();
        }
        if offset > length {
            return None;
        }
        let mut consumed = 0;
        self.texts().into_iter().find(|text| {
            consumed += text.len();
            consumed > offset
        })
    }

    /// The `(text key, offset within that text)` point for character `offset`
    pub fn point_at_offset(&self, offset: usize) -> Option<(Key, usize)> {
        let text = self.text_at_offset(offset)?;
        let start = self.offset(text.key()).ok()?;
        Some((text.key().clone(), offset - start))
    }

    /// Offset of a collapsed range from the start of this node
    pub fn offset_at_range(&self, range: &Selection) -> Result<usize> {
        let range = range.normalize(self)?;
        if range.is_expanded() {
            return Err(Error::InvalidRange(
                "the offset of an expanded range is ambiguous".to_string(),
            ));
        }
        let (start_key, start_offset, _, _) = range.points()?;
        Ok(self.offset(start_key)? + start_offset)
    }

    /// Texts touched by `range`, start and end texts included
    pub fn texts_at_range(&self, range: &Selection) -> Result<Vec<&Text>> {
        let range = range.normalize(self)?;
        let (start_key, _, end_key, _) = range.points()?;
        let texts = self.texts();
        let start = texts
            .iter()
            .position(|t| t.key() == start_key)
            .ok_or_else(|| Error::not_found(start_key))?;
        let end = texts
            .iter()
            .position(|t| t.key() == end_key)
            .ok_or_else(|| Error::not_found(end_key))?;
        Ok(texts[start..=end].to_vec())
    }

    /// Characters strictly inside `range`
    pub fn characters_at_range(&self, range: &Selection) -> Result<Vec<&Character>> {
        let normalized = range.normalize(self)?;
        let (start_key, start_offset, end_key, end_offset) = normalized.points()?;
        let mut characters = Vec::new();
        for text in self.texts_at_range(&normalized)? {
            let from = if text.key() == start_key { start_offset } else { 0 };
            let to = if text.key() == end_key {
                end_offset
            } else {
                text.len()
            };
            characters.extend(text.characters().get(from..to).unwrap_or_default());
        }
        Ok(characters)
    }

    /// Closest block of each text in `range`, deduplicated, in document order
    pub fn blocks_at_range(&self, range: &Selection) -> Result<Vec<&Node>> {
        let mut seen = HashSet::new();
        let mut blocks = Vec::new();
        for text in self.texts_at_range(range)? {
            if let Some(block) = self.closest_block(text.key())?
                && seen.insert(block.key().clone())
            {
                blocks.push(block);
            }
        }
        Ok(blocks)
    }

    /// Closest inline of each text in `range`, deduplicated, in document order
    pub fn inlines_at_range(&self, range: &Selection) -> Result<Vec<&Node>> {
        let mut seen = HashSet::new();
        let mut inlines = Vec::new();
        for text in self.texts_at_range(range)? {
            if let Some(inline) = self.closest_inline(text.key())?
                && seen.insert(inline.key().clone())
            {
                inlines.push(inline);
            }
        }
        Ok(inlines)
    }

    /// Marks in effect for `range`.
    ///
    /// A collapsed range takes the marks of the character before it, reaching
    /// back into the previous text when at offset 0. At the very start of the
    /// document there is no such character and the result is empty. An
    /// expanded range takes the union over every character it covers.
    pub fn marks_at_range(&self, range: &Selection) -> Result<MarkSet> {
        let range = range.normalize(self)?;
        let (start_key, start_offset, _, _) = range.points()?;

        if range.is_expanded() {
            return Ok(self
                .characters_at_range(&range)?
                .into_iter()
                .flat_map(|c| c.marks.iter().cloned())
                .collect());
        }

        if start_offset == 0 {
            return Ok(self
                .previous_text(start_key)
                .and_then(|previous| previous.characters().last())
                .map(|c| c.marks.clone())
                .unwrap_or_default());
        }

        let text = self
            .assert_descendant(start_key)?
            .as_text()
            .ok_or_else(|| Error::InvalidRange(format!("\"{start_key}\" is not a text")))?;
        Ok(text.marks_before(start_offset))
    }

    /// A new document holding copies of the nodes covered by `range`.
    ///
    /// The tree is split at both ends of the range all the way up to this
    /// node, and the top-level pieces between the splits are returned.
    /// Split-off pieces carry fresh keys.
    pub fn fragment_at_range(&self, range: &Selection) -> Result<Node> {
        let range = range.normalize(self)?;
        let (start_key, start_offset, end_key, end_offset) = range.points()?;

        let start = Selection::collapsed(start_key.clone(), start_offset);
        let node = self.split_block_at_range(&start, usize::MAX)?;

        // Splitting regenerated the start text's tail; a range within one text
        // now ends inside that tail.
        let (end_key, end_offset) = if start_key == end_key {
            let next = node.next_text(start_key).ok_or_else(|| {
                Error::InvalidRange(format!("no text follows \"{start_key}\" after splitting"))
            })?;
            (next.key().clone(), end_offset - start_offset)
        } else {
            (end_key.clone(), end_offset)
        };

        let end = Selection::collapsed(end_key.clone(), end_offset);
        let node = node.split_block_at_range(&end, usize::MAX)?;

        let start_piece = node
            .furthest_ancestor(start_key)
            .ok_or_else(|| Error::not_found(start_key))?;
        let end_piece = node
            .furthest_ancestor(&end_key)
            .ok_or_else(|| Error::not_found(&end_key))?;
        let children = node.nodes();
        let position = |key: &Key| children.iter().position(|n| n.key() == key);
        let (Some(start_index), Some(end_index)) =
            (position(start_piece.key()), position(end_piece.key()))
        else {
            return Err(Error::InvalidRange(
                "range endpoints are not under this node".to_string(),
            ));
        };

        Ok(Node::document(
            children[start_index + 1..=end_index].to_vec(),
        ))
    }
}
