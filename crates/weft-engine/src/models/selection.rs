use serde::{Deserialize, Serialize};

use super::key::Key;
use super::mark::MarkSet;
use super::node::{Node, Text};
use crate::error::{Error, Result};

/// A range between two points in the tree, each a text key plus a character
/// offset into that text.
///
/// The anchor is where the range started and the focus where it ended; they
/// may be in either document order. `start_*`/`end_*` give the ordered view,
/// which is only trustworthy after [`Selection::normalize`] has recomputed
/// `is_backward` against a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor_key: Option<Key>,
    pub anchor_offset: usize,
    pub focus_key: Option<Key>,
    pub focus_offset: usize,
    #[serde(default)]
    pub is_backward: bool,
    #[serde(default)]
    pub is_focused: bool,
    /// Marks to apply to the next inserted text, overriding the marks at the cursor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<MarkSet>,
}

impl Selection {
    pub fn new(
        anchor_key: impl Into<Key>,
        anchor_offset: usize,
        focus_key: impl Into<Key>,
        focus_offset: usize,
    ) -> Self {
        Self {
            anchor_key: Some(anchor_key.into()),
            anchor_offset,
            focus_key: Some(focus_key.into()),
            focus_offset,
            ..Self::default()
        }
    }

    /// A cursor at `offset` within the node `key`
    pub fn collapsed(key: impl Into<Key>, offset: usize) -> Self {
        let key = key.into();
        Self::new(key.clone(), offset, key, offset)
    }

    /// A range covering the whole text of `node`, or unset when it has no texts
    pub fn covering(node: &Node) -> Self {
        match (node.first_text(), node.last_text()) {
            (Some(first), Some(last)) => Self::new(first.key(), 0, last.key(), last.len()),
            _ => Self::default(),
        }
    }

    pub fn is_unset(&self) -> bool {
        self.anchor_key.is_none() || self.focus_key.is_none()
    }

    pub fn is_set(&self) -> bool {
        !self.is_unset()
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor_key == self.focus_key && self.anchor_offset == self.focus_offset
    }

    pub fn is_expanded(&self) -> bool {
        !self.is_collapsed()
    }

    pub fn start_key(&self) -> Option<&Key> {
        if self.is_backward {
            self.focus_key.as_ref()
        } else {
            self.anchor_key.as_ref()
        }
    }

    pub fn start_offset(&self) -> usize {
        if self.is_backward {
            self.focus_offset
        } else {
            self.anchor_offset
        }
    }

    pub fn end_key(&self) -> Option<&Key> {
        if self.is_backward {
            self.anchor_key.as_ref()
        } else {
            self.focus_key.as_ref()
        }
    }

    pub fn end_offset(&self) -> usize {
        if self.is_backward {
            self.anchor_offset
        } else {
            self.focus_offset
        }
    }

    /// Ordered `(start_key, start_offset, end_key, end_offset)`, failing when unset
    pub fn points(&self) -> Result<(&Key, usize, &Key, usize)> {
        match (self.start_key(), self.end_key()) {
            (Some(start), Some(end)) => Ok((start, self.start_offset(), end, self.end_offset())),
            _ => Err(Error::InvalidRange("selection is unset".to_string())),
        }
    }

    pub fn collapse_to_anchor(&self) -> Self {
        Self {
            focus_key: self.anchor_key.clone(),
            focus_offset: self.anchor_offset,
            is_backward: false,
            ..self.clone()
        }
    }

    pub fn collapse_to_focus(&self) -> Self {
        Self {
            anchor_key: self.focus_key.clone(),
            anchor_offset: self.focus_offset,
            is_backward: false,
            ..self.clone()
        }
    }

    pub fn collapse_to_start(&self) -> Self {
        if self.is_backward {
            self.collapse_to_focus()
        } else {
            self.collapse_to_anchor()
        }
    }

    pub fn collapse_to_end(&self) -> Self {
        if self.is_backward {
            self.collapse_to_anchor()
        } else {
            self.collapse_to_focus()
        }
    }

    pub fn collapse_to_start_of(&self, text: &Text) -> Self {
        self.move_to(text.key(), 0, text.key(), 0)
    }

    pub fn collapse_to_end_of(&self, text: &Text) -> Self {
        self.move_to(text.key(), text.len(), text.key(), text.len())
    }

    /// Cover the whole of `node`, keeping focus state and pending marks
    pub fn move_to_range_of(&self, node: &Node) -> Self {
        let covering = Self::covering(node);
        Self {
            is_focused: self.is_focused,
            marks: self.marks.clone(),
            ..covering
        }
    }

    fn move_to(&self, anchor: &Key, anchor_offset: usize, focus: &Key, focus_offset: usize) -> Self {
        Self {
            anchor_key: Some(anchor.clone()),
            anchor_offset,
            focus_key: Some(focus.clone()),
            focus_offset,
            is_backward: false,
            ..self.clone()
        }
    }

    /// Shift both points by `n` characters within their texts. Offsets saturate at zero;
    /// normalizing against a tree clamps the upper end.
    pub fn move_by(&self, n: isize) -> Self {
        Self {
            anchor_offset: self.anchor_offset.saturating_add_signed(n),
            focus_offset: self.focus_offset.saturating_add_signed(n),
            ..self.clone()
        }
    }

    /// Shift only the focus by `n` characters
    pub fn extend_by(&self, n: isize) -> Self {
        Self {
            focus_offset: self.focus_offset.saturating_add_signed(n),
            ..self.clone()
        }
    }

    pub fn flip(&self) -> Self {
        Self {
            anchor_key: self.focus_key.clone(),
            anchor_offset: self.focus_offset,
            focus_key: self.anchor_key.clone(),
            focus_offset: self.anchor_offset,
            is_backward: !self.is_backward,
            ..self.clone()
        }
    }

    pub fn focus(&self) -> Self {
        Self {
            is_focused: true,
            ..self.clone()
        }
    }

    pub fn blur(&self) -> Self {
        Self {
            is_focused: false,
            ..self.clone()
        }
    }

    pub fn with_marks(&self, marks: Option<MarkSet>) -> Self {
        Self {
            marks,
            ..self.clone()
        }
    }

    /// Resolve this selection against `root`.
    ///
    /// Points on container nodes move onto the text holding that offset,
    /// offsets are clamped to their text, and `is_backward` is recomputed from
    /// document order. An unset selection is returned unchanged apart from
    /// `is_backward`. Fails with `NotFound` when a point names a key that is not
    /// in the tree.
    pub fn normalize(&self, root: &Node) -> Result<Selection> {
        let (Some(anchor_key), Some(focus_key)) = (&self.anchor_key, &self.focus_key) else {
            return Ok(Self {
                is_backward: false,
                ..self.clone()
            });
        };

        let (anchor_key, anchor_offset) = resolve_point(root, anchor_key, self.anchor_offset)?;
        let (focus_key, focus_offset) = resolve_point(root, focus_key, self.focus_offset)?;

        let is_backward = if anchor_key == focus_key {
            focus_offset < anchor_offset
        } else {
            !root
                .are_descendants_sorted(&anchor_key, &focus_key)
                .unwrap_or(true)
        };

        Ok(Self {
            anchor_key: Some(anchor_key),
            anchor_offset,
            focus_key: Some(focus_key),
            focus_offset,
            is_backward,
            is_focused: self.is_focused,
            marks: self.marks.clone(),
        })
    }
}

fn resolve_point(root: &Node, key: &Key, offset: usize) -> Result<(Key, usize)> {
    let node = root.assert_node(key)?;
    match node {
        Node::Text(text) => Ok((text.key().clone(), offset.min(text.len()))),
        _ => {
            let offset = offset.min(node.len());
            let text = node.text_at_offset(offset).ok_or_else(|| {
                Error::InvalidRange(format!("node \"{key}\" contains no text to select"))
            })?;
            let local = offset - node.offset(text.key())?;
            Ok((text.key().clone(), local.min(text.len())))
        }
    }
}
