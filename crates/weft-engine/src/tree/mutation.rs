//! Persistent structural edits.
//!
//! Every method here leaves `self` untouched and returns the edited tree.
//! Only the nodes on the path from the root to the edit are rebuilt.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::models::{Character, Key, MarkSet, Node, Properties, Selection};

/// Where split operations get keys for the nodes they create.
///
/// Recording fresh keys the first time a split runs and replaying them when
/// it is redone keeps redo deterministic.
enum KeySupply<'a> {
    Fresh(&'a mut Vec<Key>),
    Replay(std::slice::Iter<'a, Key>),
}

impl KeySupply<'_> {
    fn next(&mut self) -> Key {
        match self {
            KeySupply::Fresh(recorded) => {
                let key = Key::generate();
                recorded.push(key.clone());
                key
            }
            KeySupply::Replay(keys) => keys.next().cloned().unwrap_or_else(Key::generate),
        }
    }
}

impl Node {
    /// Rebuild the branch down to `path`, replacing the node there with `f`'s result
    pub fn update_at_path<F>(&self, path: &[usize], f: F) -> Result<Node>
    where
        F: FnOnce(&Node) -> Result<Node>,
    {
        self.assert_path(path)?;
        self.update_at_path_unchecked(path, f)
    }

    fn update_at_path_unchecked<F>(&self, path: &[usize], f: F) -> Result<Node>
    where
        F: FnOnce(&Node) -> Result<Node>,
    {
        let Some((&index, rest)) = path.split_first() else {
            return f(self);
        };
        let child = &self.nodes()[index];
        let updated = child.update_at_path_unchecked(rest, f)?;
        let mut node = self.clone();
        if let Some(nodes) = node.nodes_mut() {
            nodes[index] = updated;
        }
        Ok(node)
    }

    /// Rebuild the branch down to `key`, replacing that node with `f`'s result
    pub fn update_node<F>(&self, key: &str, f: F) -> Result<Node>
    where
        F: FnOnce(&Node) -> Result<Node>,
    {
        let path = self.path(key)?;
        self.update_at_path(&path, f)
    }

    /// Swap in `node` for the node that currently has its key
    pub fn update_descendant(&self, node: Node) -> Result<Node> {
        let path = self.path(node.key())?;
        self.update_at_path(&path, |_| Ok(node))
    }

    /// Insert `node` as child `index`. Keys in `node` that already exist in
    /// this subtree are regenerated.
    pub fn insert_node(&self, index: usize, node: Node) -> Result<Node> {
        if self.is_text() {
            return Err(Error::InvalidOperation(format!(
                "cannot insert into text node \"{}\"",
                self.key()
            )));
        }
        if index > self.nodes().len() {
            return Err(Error::InvalidOperation(format!(
                "insert index {index} is past the end of \"{}\"",
                self.key()
            )));
        }
        let mut taken = self.keys();
        taken.insert(self.key().clone());
        let node = node.regenerate_colliding_keys(&taken);

        let mut updated = self.clone();
        if let Some(nodes) = updated.nodes_mut() {
            nodes.insert(index, node);
        }
        Ok(updated)
    }

    pub fn remove_node(&self, index: usize) -> Result<Node> {
        if index >= self.nodes().len() {
            return Err(Error::InvalidOperation(format!(
                "no child {index} in \"{}\"",
                self.key()
            )));
        }
        let mut updated = self.clone();
        if let Some(nodes) = updated.nodes_mut() {
            nodes.remove(index);
        }
        Ok(updated)
    }

    pub fn remove_descendant(&self, key: &str) -> Result<Node> {
        let path = self.path(key)?;
        let Some((&index, parent_path)) = path.split_last() else {
            return Err(Error::InvalidOperation(
                "cannot remove a node from itself".to_string(),
            ));
        };
        self.update_at_path(parent_path, |parent| parent.remove_node(index))
    }

    /// The same node under a freshly generated key
    pub fn regenerate_key(&self) -> Node {
        self.clone().with_key(Key::generate())
    }

    /// Regenerate the key of this node and of any descendant whose key is in `taken`
    pub fn regenerate_colliding_keys(&self, taken: &HashSet<Key>) -> Node {
        let node = if taken.contains(self.key()) {
            self.regenerate_key()
        } else {
            self.clone()
        };
        node.map_descendants(&mut |child| {
            if taken.contains(child.key()) {
                child.regenerate_key()
            } else {
                child
            }
        })
    }

    /// Apply `f` to every descendant, children before their parents
    pub fn map_descendants<F>(&self, f: &mut F) -> Node
    where
        F: FnMut(Node) -> Node,
    {
        if self.nodes().is_empty() {
            return self.clone();
        }
        let nodes = self
            .nodes()
            .iter()
            .map(|child| {
                let mapped = child.map_descendants(&mut *f);
                f(mapped)
            })
            .collect();
        self.with_nodes(nodes)
    }

    /// Split the node at `path` in two at character `offset`, using fresh keys
    pub fn split_node(&self, path: &[usize], offset: usize) -> Result<Node> {
        self.split_node_recording(path, offset)
            .map(|(node, _)| node)
    }

    /// Split the node at `path`, returning the new tree and the keys created
    /// for the split-off halves, innermost first.
    ///
    /// The first half keeps the original key. Every node on the way down to
    /// the text at `offset` is split the same way, so the second half is a new
    /// subtree with new keys at every level.
    pub fn split_node_recording(&self, path: &[usize], offset: usize) -> Result<(Node, Vec<Key>)> {
        let mut keys = Vec::new();
        let node = self.split_node_with(path, offset, None, &mut KeySupply::Fresh(&mut keys))?;
        Ok((node, keys))
    }

    /// Split the node at `path` reusing previously recorded keys
    pub fn split_node_with_keys(&self, path: &[usize], offset: usize, keys: &[Key]) -> Result<Node> {
        self.split_node_with(path, offset, None, &mut KeySupply::Replay(keys.iter()))
    }

    /// Split the node at `path` at `offset` within its descendant text `key`.
    ///
    /// Unlike a split by character offset, a point on the boundary between
    /// two texts splits the named text, so `key` always ends the first half.
    pub fn split_node_at_point(&self, path: &[usize], key: &str, offset: usize) -> Result<Node> {
        let target = self.assert_path(path)?;
        let text = target
            .assert_node(key)?
            .as_text()
            .ok_or_else(|| Error::InvalidRange(format!("\"{key}\" is not a text")))?;
        if offset > text.len() {
            return Err(Error::InvalidRange(format!(
                "offset {offset} is past the end of \"{key}\""
            )));
        }
        let at = target.offset(key)? + offset;
        let mut keys = Vec::new();
        self.split_node_with(path, at, Some(key), &mut KeySupply::Fresh(&mut keys))
    }

    fn split_node_with(
        &self,
        path: &[usize],
        offset: usize,
        toward: Option<&str>,
        keys: &mut KeySupply<'_>,
    ) -> Result<Node> {
        let Some((&index, parent_path)) = path.split_last() else {
            return Err(Error::InvalidOperation("cannot split the root".to_string()));
        };
        let target = self.assert_path(path)?;
        let (one, two) = split_in_two(target, offset, toward, keys)?;
        self.update_at_path(parent_path, |parent| {
            let mut parent = parent.clone();
            if let Some(nodes) = parent.nodes_mut() {
                nodes[index] = one;
                nodes.insert(index + 1, two);
            }
            Ok(parent)
        })
    }

    /// Split the container at `path` after its first `count` children.
    /// The children after `count` move to a new sibling with a fresh key.
    pub fn split_node_after(&self, path: &[usize], count: usize) -> Result<Node> {
        let Some((&index, parent_path)) = path.split_last() else {
            return Err(Error::InvalidOperation("cannot split the root".to_string()));
        };
        let target = self.assert_path(path)?;
        if target.is_text() || count > target.nodes().len() {
            return Err(Error::InvalidOperation(format!(
                "cannot split \"{}\" after {count} children",
                target.key()
            )));
        }
        let one = target.with_nodes(target.nodes()[..count].to_vec());
        let two = target
            .with_nodes(target.nodes()[count..].to_vec())
            .regenerate_key();
        self.update_at_path(parent_path, |parent| {
            let mut parent = parent.clone();
            if let Some(nodes) = parent.nodes_mut() {
                nodes[index] = one;
                nodes.insert(index + 1, two);
            }
            Ok(parent)
        })
    }

    /// The node and offset a block split at the start of `range` acts on.
    ///
    /// Starting at the start text, walk up through closest block ancestors at
    /// most `height` times, carrying the offset along. Height 0 splits the
    /// text itself.
    pub fn split_target_at_range(&self, range: &Selection, height: usize) -> Result<(Key, usize)> {
        let range = range.normalize(self)?;
        let (start_key, start_offset, _, _) = range.points()?;

        let mut node = self.assert_descendant(start_key)?;
        let mut offset = start_offset;
        let mut parent = self.closest_block(node.key())?;
        let mut climbed = 0;
        while let Some(block) = parent
            && climbed < height
        {
            offset += block.offset(node.key())?;
            node = block;
            parent = self.closest_block(node.key())?;
            climbed += 1;
        }
        Ok((node.key().clone(), offset))
    }

    /// Split the closest blocks around the start of `range`, `height` levels up.
    /// The start text of the range is the one split, even at a text boundary.
    pub fn split_block_at_range(&self, range: &Selection, height: usize) -> Result<Node> {
        let range = range.normalize(self)?;
        let (start_key, start_offset, _, _) = range.points()?;
        let (key, _) = self.split_target_at_range(&range, height)?;
        let path = self.path(&key)?;
        self.split_node_at_point(&path, start_key, start_offset)
    }

    /// Merge `second` into `first`. `first` keeps its key.
    ///
    /// Two texts concatenate. Two containers concatenate children, and with
    /// `deep` the children that meet at the seam are joined recursively while
    /// they are of joinable kinds.
    pub fn join_node(&self, first: &str, second: &str, deep: bool) -> Result<Node> {
        let first_node = self.assert_descendant(first)?;
        let second_node = self.assert_descendant(second)?;
        let merged = merge(first_node, second_node, deep)?;
        self.remove_descendant(second)?.update_descendant(merged)
    }

    pub fn insert_text(&self, key: &str, offset: usize, characters: &[Character]) -> Result<Node> {
        self.update_text(key, |chars| {
            if offset > chars.len() {
                return Err(Error::InvalidRange(format!(
                    "offset {offset} is past the end of \"{key}\""
                )));
            }
            let tail = chars.split_off(offset);
            chars.extend(characters.iter().cloned());
            chars.extend(tail);
            Ok(())
        })
    }

    pub fn remove_text(&self, key: &str, offset: usize, length: usize) -> Result<Node> {
        self.update_text(key, |chars| {
            let end = offset + length;
            if end > chars.len() {
                return Err(Error::InvalidRange(format!(
                    "cannot remove {offset}..{end} from \"{key}\" of length {}",
                    chars.len()
                )));
            }
            chars.drain(offset..end);
            Ok(())
        })
    }

    /// Replace the marks of consecutive characters starting at `offset`
    pub fn set_marks(&self, key: &str, offset: usize, marks: &[MarkSet]) -> Result<Node> {
        self.update_text(key, |chars| {
            let end = offset + marks.len();
            let Some(slice) = chars.get_mut(offset..end) else {
                return Err(Error::InvalidRange(format!(
                    "cannot set marks on {offset}..{end} of \"{key}\""
                )));
            };
            for (character, marks) in slice.iter_mut().zip(marks) {
                character.marks = marks.clone();
            }
            Ok(())
        })
    }

    pub fn set_properties(&self, key: &str, properties: &Properties) -> Result<Node> {
        self.update_node(key, |node| {
            if node.is_text() {
                return Err(Error::InvalidOperation(format!(
                    "text node \"{key}\" has no properties"
                )));
            }
            Ok(node.with_properties(properties))
        })
    }

    fn update_text<F>(&self, key: &str, f: F) -> Result<Node>
    where
        F: FnOnce(&mut Vec<Character>) -> Result<()>,
    {
        self.update_node(key, |node| {
            let Node::Text(text) = node else {
                return Err(Error::InvalidOperation(format!(
                    "\"{key}\" is not a text node"
                )));
            };
            let mut text = text.clone();
            f(text.characters_mut())?;
            Ok(Node::Text(text))
        })
    }
}

/// Split `node` at character `offset`. With `toward`, containers descend into
/// the child holding that key instead of the child at `offset`.
fn split_in_two(
    node: &Node,
    offset: usize,
    toward: Option<&str>,
    keys: &mut KeySupply<'_>,
) -> Result<(Node, Node)> {
    if offset > node.len() {
        return Err(Error::InvalidRange(format!(
            "split offset {offset} is past the end of \"{}\"",
            node.key()
        )));
    }

    if let Node::Text(text) = node {
        let (before, after) = text.characters().split_at(offset);
        let one = node.with_characters(before.to_vec());
        let two = node.with_characters(after.to_vec()).with_key(keys.next());
        return Ok((one, two));
    }

    let target = match toward {
        Some(key) if node.has_descendant(key) => key,
        _ => match node.text_at_offset(offset) {
            Some(text) => text.key().as_str(),
            None => {
                // Nothing to split inside; everything stays with the first half
                let two = node.with_nodes(Vec::new()).with_key(keys.next());
                return Ok((node.clone(), two));
            }
        },
    };
    let children = node.nodes();
    let index = children
        .iter()
        .position(|c| c.key().as_str() == target || c.has_descendant(target))
        .ok_or_else(|| Error::not_found(target))?;
    let before: usize = children[..index].iter().map(Node::len).sum();
    let local = offset.checked_sub(before).ok_or_else(|| {
        Error::InvalidRange(format!("split offset {offset} falls before \"{target}\""))
    })?;

    let (left, right) = split_in_two(&children[index], local, toward, keys)?;

    let mut first_children = children[..index].to_vec();
    first_children.push(left);
    let mut second_children = vec![right];
    second_children.extend(children[index + 1..].iter().cloned());

    let one = node.with_nodes(first_children);
    let two = node.with_nodes(second_children).with_key(keys.next());
    Ok((one, two))
}

fn merge(first: &Node, second: &Node, deep: bool) -> Result<Node> {
    match (first, second) {
        (Node::Text(a), Node::Text(b)) => {
            let mut characters = a.characters().to_vec();
            characters.extend(b.characters().iter().cloned());
            Ok(first.with_characters(characters))
        }
        (Node::Text(_), _) | (_, Node::Text(_)) => Err(Error::InvalidOperation(format!(
            "cannot join \"{}\" with \"{}\": a text only joins another text",
            first.key(),
            second.key()
        ))),
        _ => {
            let seam = first.nodes().len();
            let mut merged = first.clone();
            for (i, child) in second.nodes().iter().enumerate() {
                merged = merged.insert_node(seam + i, child.clone())?;
            }
            if deep && seam > 0 && merged.nodes().len() > seam {
                let left = &merged.nodes()[seam - 1];
                let right = &merged.nodes()[seam];
                if left.is_joinable_with(right) {
                    let (left, right) = (left.key().clone(), right.key().clone());
                    merged = merged.join_node(&left, &right, true)?;
                }
            }
            Ok(merged)
        }
    }
}
