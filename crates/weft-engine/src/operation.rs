//! Primitive edits and the operations that pair them with their inverses.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::models::{Character, Key, MarkSet, Node, Path, Properties, Selection};

/// One primitive change to a document and its selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Edit {
    InsertNode {
        path: Path,
        node: Node,
    },
    RemoveNode {
        path: Path,
        node: Node,
    },
    InsertText {
        key: Key,
        offset: usize,
        characters: Vec<Character>,
    },
    RemoveText {
        key: Key,
        offset: usize,
        characters: Vec<Character>,
    },
    SetMarks {
        key: Key,
        offset: usize,
        before: Vec<MarkSet>,
        after: Vec<MarkSet>,
    },
    SetNode {
        key: Key,
        properties: Properties,
        previous: Properties,
    },
    /// Split the node at `path`; `keys` are the keys given to the split-off
    /// halves, innermost first
    SplitNode {
        path: Path,
        offset: usize,
        keys: Vec<Key>,
    },
    /// Join the node at `path` with its next sibling
    JoinNode {
        path: Path,
        deep: bool,
    },
    SetSelection {
        selection: Selection,
        previous: Selection,
    },
}

/// A recorded edit together with the edits that undo it, in the order they
/// must be replayed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub apply: Edit,
    pub inverse: Vec<Edit>,
}

impl Operation {
    pub fn insert_node(path: Path, node: Node) -> Self {
        Self {
            inverse: vec![Edit::RemoveNode {
                path: path.clone(),
                node: node.clone(),
            }],
            apply: Edit::InsertNode { path, node },
        }
    }

    pub fn remove_node(path: Path, node: Node) -> Self {
        Self {
            inverse: vec![Edit::InsertNode {
                path: path.clone(),
                node: node.clone(),
            }],
            apply: Edit::RemoveNode { path, node },
        }
    }

    pub fn insert_text(key: Key, offset: usize, characters: Vec<Character>) -> Self {
        Self {
            inverse: vec![Edit::RemoveText {
                key: key.clone(),
                offset,
                characters: characters.clone(),
            }],
            apply: Edit::InsertText {
                key,
                offset,
                characters,
            },
        }
    }

    pub fn remove_text(key: Key, offset: usize, characters: Vec<Character>) -> Self {
        Self {
            inverse: vec![Edit::InsertText {
                key: key.clone(),
                offset,
                characters: characters.clone(),
            }],
            apply: Edit::RemoveText {
                key,
                offset,
                characters,
            },
        }
    }

    pub fn set_marks(key: Key, offset: usize, before: Vec<MarkSet>, after: Vec<MarkSet>) -> Self {
        Self {
            inverse: vec![Edit::SetMarks {
                key: key.clone(),
                offset,
                before: after.clone(),
                after: before.clone(),
            }],
            apply: Edit::SetMarks {
                key,
                offset,
                before,
                after,
            },
        }
    }

    pub fn set_node(key: Key, properties: Properties, previous: Properties) -> Self {
        Self {
            inverse: vec![Edit::SetNode {
                key: key.clone(),
                properties: previous.clone(),
                previous: properties.clone(),
            }],
            apply: Edit::SetNode {
                key,
                properties,
                previous,
            },
        }
    }

    /// A split undone by a deep join of the two halves
    pub fn split_node(path: Path, offset: usize, keys: Vec<Key>) -> Self {
        Self {
            inverse: vec![Edit::JoinNode {
                path: path.clone(),
                deep: true,
            }],
            apply: Edit::SplitNode { path, offset, keys },
        }
    }

    /// A join undone by removing the merged node and restoring both originals
    pub fn join_node(path: Path, deep: bool, first: Node, second: Node, merged: Node) -> Self {
        let second_path = next_sibling_path(&path);
        Self {
            inverse: vec![
                Edit::RemoveNode {
                    path: path.clone(),
                    node: merged,
                },
                Edit::InsertNode {
                    path: path.clone(),
                    node: first,
                },
                Edit::InsertNode {
                    path: second_path,
                    node: second,
                },
            ],
            apply: Edit::JoinNode { path, deep },
        }
    }

    pub fn set_selection(selection: Selection, previous: Selection) -> Self {
        Self {
            inverse: vec![Edit::SetSelection {
                selection: previous.clone(),
                previous: selection.clone(),
            }],
            apply: Edit::SetSelection {
                selection,
                previous,
            },
        }
    }
}

impl Edit {
    pub fn name(&self) -> &'static str {
        match self {
            Edit::InsertNode { .. } => "insert_node",
            Edit::RemoveNode { .. } => "remove_node",
            Edit::InsertText { .. } => "insert_text",
            Edit::RemoveText { .. } => "remove_text",
            Edit::SetMarks { .. } => "set_marks",
            Edit::SetNode { .. } => "set_node",
            Edit::SplitNode { .. } => "split_node",
            Edit::JoinNode { .. } => "join_node",
            Edit::SetSelection { .. } => "set_selection",
        }
    }

    /// Apply this edit, returning the new document and the selection moved
    /// to follow the content it pointed at
    pub fn apply(&self, document: &Node, selection: &Selection) -> Result<(Node, Selection)> {
        match self {
            Edit::InsertNode { path, node } => {
                let (index, parent) = split_path(path)?;
                let mut taken = document.keys();
                taken.insert(document.key().clone());
                let node = node.regenerate_colliding_keys(&taken);
                let updated = document.update_at_path(parent, |p| p.insert_node(index, node))?;
                Ok((updated, selection.clone()))
            }
            Edit::RemoveNode { path, .. } => {
                let (index, parent) = split_path(path)?;
                let removed = document.assert_path(path)?;
                let updated = document.update_at_path(parent, |p| p.remove_node(index))?;
                let selection = map_points(selection, |key, offset| {
                    if updated.has_descendant(key) {
                        Some((key.clone(), offset))
                    } else {
                        nearest_surviving_point(document, removed)
                    }
                });
                Ok((updated, selection))
            }
            Edit::InsertText {
                key,
                offset,
                characters,
            } => {
                let updated = document.insert_text(key, *offset, characters)?;
                let selection = map_points(selection, |point_key, point_offset| {
                    if point_key == key && point_offset >= *offset {
                        Some((point_key.clone(), point_offset + characters.len()))
                    } else {
                        Some((point_key.clone(), point_offset))
                    }
                });
                Ok((updated, selection))
            }
            Edit::RemoveText {
                key,
                offset,
                characters,
            } => {
                let updated = document.remove_text(key, *offset, characters.len())?;
                let selection = map_points(selection, |point_key, point_offset| {
                    if point_key == key && point_offset > *offset {
                        let shifted = point_offset.saturating_sub(characters.len());
                        Some((point_key.clone(), shifted.max(*offset)))
                    } else {
                        Some((point_key.clone(), point_offset))
                    }
                });
                Ok((updated, selection))
            }
            Edit::SetMarks {
                key, offset, after, ..
            } => Ok((
                document.set_marks(key, *offset, after)?,
                selection.clone(),
            )),
            Edit::SetNode {
                key, properties, ..
            } => Ok((
                document.set_properties(key, properties)?,
                selection.clone(),
            )),
            Edit::SplitNode { path, offset, keys } => {
                let target = document.assert_path(path)?;
                let updated = document.split_node_with_keys(path, *offset, keys)?;
                let second = updated.assert_path(&next_sibling_path(path))?;
                let selection = map_points(selection, |key, point_offset| {
                    if target.has_node(key) {
                        let local = target.offset(key).ok()? + point_offset;
                        if local > *offset {
                            return locate(second, local - offset);
                        }
                    }
                    Some((key.clone(), point_offset))
                });
                Ok((updated, selection))
            }
            Edit::JoinNode { path, deep } => {
                let first = document.assert_path(path)?;
                let second = document.assert_path(&next_sibling_path(path))?;
                let updated = document.join_node(first.key(), second.key(), *deep)?;
                let merged = updated.assert_path(path)?;
                let seam = first.len();
                let selection = map_points(selection, |key, point_offset| {
                    if updated.has_descendant(key) {
                        return Some((key.clone(), point_offset));
                    }
                    let local = second.offset(key).ok()? + point_offset;
                    locate(merged, seam + local)
                });
                Ok((updated, selection))
            }
            Edit::SetSelection { selection, .. } => Ok((document.clone(), selection.clone())),
        }
    }
}

fn split_path(path: &[usize]) -> Result<(usize, &[usize])> {
    path.split_last()
        .map(|(&index, parent)| (index, parent))
        .ok_or_else(|| Error::InvalidOperation("the root cannot be inserted or removed".to_string()))
}

fn next_sibling_path(path: &[usize]) -> Path {
    let mut next = path.to_vec();
    if let Some(last) = next.last_mut() {
        *last += 1;
    }
    next
}

/// The text point at character `offset` of `node`, which may itself be a text
fn locate(node: &Node, offset: usize) -> Option<(Key, usize)> {
    match node {
        Node::Text(text) => Some((text.key().clone(), offset.min(text.len()))),
        _ => node.point_at_offset(offset.min(node.len())),
    }
}

/// Where a point inside `removed` should go: the end of the text before it,
/// else the start of the text after it
fn nearest_surviving_point(document: &Node, removed: &Node) -> Option<(Key, usize)> {
    let mut gone: HashSet<Key> = removed.keys();
    gone.insert(removed.key().clone());
    let texts = document.texts();
    let first_gone = texts.iter().position(|t| gone.contains(t.key()));

    let before = match first_gone {
        Some(index) => &texts[..index],
        None => &texts[..],
    };
    if let Some(previous) = before.iter().rev().find(|t| !gone.contains(t.key())) {
        return Some((previous.key().clone(), previous.len()));
    }
    texts
        .iter()
        .find(|t| !gone.contains(t.key()))
        .map(|next| (next.key().clone(), 0))
}

/// Move both points of a set selection through `f`. A point that has nowhere
/// to go leaves the selection unset.
fn map_points<F>(selection: &Selection, f: F) -> Selection
where
    F: Fn(&Key, usize) -> Option<(Key, usize)>,
{
    let (Some(anchor_key), Some(focus_key)) = (&selection.anchor_key, &selection.focus_key) else {
        return selection.clone();
    };
    match (
        f(anchor_key, selection.anchor_offset),
        f(focus_key, selection.focus_offset),
    ) {
        (Some((anchor_key, anchor_offset)), Some((focus_key, focus_offset))) => Selection {
            anchor_key: Some(anchor_key),
            anchor_offset,
            focus_key: Some(focus_key),
            focus_offset,
            ..selection.clone()
        },
        _ => Selection {
            is_focused: selection.is_focused,
            ..Selection::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::marks;
    use pretty_assertions::assert_eq;

    fn sample() -> Node {
        Node::document(vec![
            Node::block("paragraph", vec![Node::text("hello").with_key("t1")]).with_key("b1"),
            Node::block("paragraph", vec![Node::text("world").with_key("t2")]).with_key("b2"),
        ])
        .with_key("doc")
    }

    fn replay(document: &Node, selection: &Selection, edits: &[Edit]) -> (Node, Selection) {
        edits.iter().fold(
            (document.clone(), selection.clone()),
            |(document, selection), edit| edit.apply(&document, &selection).unwrap(),
        )
    }

    #[test]
    fn test_insert_text_shifts_cursor_after_insertion_point() {
        let operation = Operation::insert_text(
            "t1".into(),
            2,
            Character::from_str_with_marks("XY", &MarkSet::new()),
        );
        let selection = Selection::new("t1", 1, "t1", 3);

        let (document, selection) = operation.apply.apply(&sample(), &selection).unwrap();

        assert_eq!(document.text_content(), "heXYlloworld");
        assert_eq!(selection.anchor_offset, 1);
        assert_eq!(selection.focus_offset, 5);
    }

    #[test]
    fn test_remove_text_clamps_cursor_to_removal_start() {
        let removed = Character::from_str_with_marks("ell", &MarkSet::new());
        let operation = Operation::remove_text("t1".into(), 1, removed);

        let (document, selection) = operation
            .apply
            .apply(&sample(), &Selection::collapsed("t1", 3))
            .unwrap();

        assert_eq!(document.text_content(), "howorld");
        assert_eq!(selection.anchor_offset, 1);
    }

    #[test]
    fn test_split_moves_cursor_into_second_half() {
        let operation = Operation::split_node(vec![0], 2, vec!["t9".into(), "b9".into()]);

        let (document, selection) = operation
            .apply
            .apply(&sample(), &Selection::collapsed("t1", 4))
            .unwrap();

        assert_eq!(document.nodes()[1].key().as_str(), "b9");
        assert_eq!(selection.anchor_key.as_deref(), Some("t9"));
        assert_eq!(selection.anchor_offset, 2);
    }

    #[test]
    fn test_join_moves_cursor_into_first() {
        let document = sample();
        let first = document.nodes()[0].clone();
        let second = document.nodes()[1].clone();
        let joined = document.join_node("b1", "b2", true).unwrap();
        let merged = joined.nodes()[0].clone();
        let operation = Operation::join_node(vec![0], true, first, second, merged);

        let (updated, selection) = operation
            .apply
            .apply(&document, &Selection::collapsed("t2", 1))
            .unwrap();

        assert_eq!(updated, joined);
        assert_eq!(selection.anchor_key.as_deref(), Some("t1"));
        assert_eq!(selection.anchor_offset, 6);
    }

    #[test]
    fn test_inverses_restore_document() {
        let document = sample();
        let selection = Selection::collapsed("t1", 0);
        let bold = marks(["bold"]);

        let first = document.nodes()[0].clone();
        let second = document.nodes()[1].clone();
        let merged = document.join_node("b1", "b2", false).unwrap().nodes()[0].clone();

        let operations = vec![
            Operation::insert_node(vec![1], Node::block("hr", vec![]).void().with_key("hr")),
            Operation::set_marks("t1".into(), 0, vec![MarkSet::new()], vec![bold.clone()]),
            Operation::set_node(
                "b1".into(),
                Properties::with_type("heading"),
                Properties::with_type("paragraph"),
            ),
        ];
        let join = Operation::join_node(vec![0], false, first, second, merged);

        for operation in operations.iter().chain([&join]) {
            let (after, after_selection) =
                replay(&document, &selection, std::slice::from_ref(&operation.apply));
            let (restored, _) = replay(&after, &after_selection, &operation.inverse);
            assert_eq!(restored, document, "inverse of {}", operation.apply.name());
        }
    }

    #[test]
    fn test_remove_node_moves_cursor_to_previous_text() {
        let operation = Operation::remove_node(vec![1], sample().nodes()[1].clone());

        let (_, selection) = operation
            .apply
            .apply(&sample(), &Selection::collapsed("t2", 3))
            .unwrap();

        assert_eq!(selection.anchor_key.as_deref(), Some("t1"));
        assert_eq!(selection.anchor_offset, 5);
    }

    #[test]
    fn test_remove_root_is_invalid() {
        let operation = Operation::remove_node(vec![], sample());
        assert!(matches!(
            operation.apply.apply(&sample(), &Selection::default()),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_insert_node_never_duplicates_a_key() {
        let operation = Operation::insert_node(vec![1, 0], Node::text("dup").with_key("t1"));

        let (document, _) = operation
            .apply
            .apply(&sample(), &Selection::default())
            .unwrap();

        let texts: Vec<(&str, String)> = document
            .texts()
            .iter()
            .map(|t| (t.key().as_str(), t.text()))
            .collect();
        assert_eq!(texts.len(), 3);
        assert_eq!(texts.iter().filter(|(key, _)| *key == "t1").count(), 1);
        assert_eq!(texts[0], ("t1", "hello".to_string()));
        assert_eq!(texts[1].1, "dup");
    }
}
