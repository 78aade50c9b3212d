//! Read-only lookups over a node's subtree.
//!
//! All searches are depth-first in document order. Lookups that may
//! legitimately miss return `Option`; lookups whose key must exist return
//! `Result` and fail with [`Error::NotFound`].

use std::collections::HashSet;
use std::ops::ControlFlow;

use crate::error::{Error, Result};
use crate::models::{Character, Key, MarkSet, Node, Path, Text};

impl Node {
    /// Direct child with `key`
    pub fn child(&self, key: &str) -> Option<&Node> {
        self.nodes().iter().find(|n| n.key().as_str() == key)
    }

    pub fn assert_child(&self, key: &str) -> Result<&Node> {
        self.child(key).ok_or_else(|| Error::not_found(key))
    }

    pub fn has_child(&self, key: &str) -> bool {
        self.child(key).is_some()
    }

    /// Descendant with `key` anywhere below this node
    pub fn descendant(&self, key: &str) -> Option<&Node> {
        let mut found = None;
        let _ = self.walk(&mut |node| {
            if node.key().as_str() == key {
                found = Some(node);
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        found
    }

    pub fn assert_descendant(&self, key: &str) -> Result<&Node> {
        self.descendant(key).ok_or_else(|| Error::not_found(key))
    }

    pub fn has_descendant(&self, key: &str) -> bool {
        self.descendant(key).is_some()
    }

    /// This node or one of its descendants
    pub fn node(&self, key: &str) -> Option<&Node> {
        if self.key().as_str() == key {
            Some(self)
        } else {
            self.descendant(key)
        }
    }

    pub fn assert_node(&self, key: &str) -> Result<&Node> {
        self.node(key).ok_or_else(|| Error::not_found(key))
    }

    pub fn has_node(&self, key: &str) -> bool {
        self.node(key).is_some()
    }

    pub fn descendant_at_path(&self, path: &[usize]) -> Option<&Node> {
        path.iter()
            .try_fold(self, |node, &index| node.nodes().get(index))
    }

    pub fn assert_path(&self, path: &[usize]) -> Result<&Node> {
        self.descendant_at_path(path)
            .ok_or_else(|| Error::path_not_found(path))
    }

    /// Visit every descendant in document order until `f` breaks
    pub fn walk<'a, F>(&'a self, f: &mut F) -> ControlFlow<()>
    where
        F: FnMut(&'a Node) -> ControlFlow<()>,
    {
        for child in self.nodes() {
            f(child)?;
            child.walk(f)?;
        }
        ControlFlow::Continue(())
    }

    /// First descendant in document order matching `predicate`
    pub fn find_descendant(&self, mut predicate: impl FnMut(&Node) -> bool) -> Option<&Node> {
        let mut found = None;
        let _ = self.walk(&mut |node| {
            if predicate(node) {
                found = Some(node);
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        found
    }

    /// All descendants matching `predicate`, in document order
    pub fn filter_descendants(&self, mut predicate: impl FnMut(&Node) -> bool) -> Vec<&Node> {
        let mut matches = Vec::new();
        let _ = self.walk(&mut |node| {
            if predicate(node) {
                matches.push(node);
            }
            ControlFlow::Continue(())
        });
        matches
    }

    /// Keys of every descendant
    pub fn keys(&self) -> HashSet<Key> {
        let mut keys = HashSet::new();
        let _ = self.walk(&mut |node| {
            keys.insert(node.key().clone());
            ControlFlow::Continue(())
        });
        keys
    }

    /// The node whose direct child is `key`
    pub fn parent(&self, key: &str) -> Option<&Node> {
        if self.has_child(key) {
            return Some(self);
        }
        self.nodes()
            .iter()
            .filter(|child| !child.is_text())
            .find_map(|child| child.parent(key))
    }

    /// Chain from this node down to the parent of `key`. Empty when `key` is
    /// this node, `None` when `key` is not in the subtree.
    pub fn ancestors(&self, key: &str) -> Option<Vec<&Node>> {
        if self.key().as_str() == key {
            return Some(Vec::new());
        }
        if self.has_child(key) {
            return Some(vec![self]);
        }
        self.nodes().iter().find_map(|child| {
            let mut chain = child.ancestors(key)?;
            chain.insert(0, self);
            Some(chain)
        })
    }

    /// Child indices leading from this node to `key`
    pub fn path(&self, key: &str) -> Result<Path> {
        self.find_path(key).ok_or_else(|| Error::not_found(key))
    }

    fn find_path(&self, key: &str) -> Option<Path> {
        if self.key().as_str() == key {
            return Some(Vec::new());
        }
        self.nodes().iter().enumerate().find_map(|(index, child)| {
            let mut path = child.find_path(key)?;
            path.insert(0, index);
            Some(path)
        })
    }

    /// Number of levels between this node and `key`; direct children are at depth 1
    pub fn depth(&self, key: &str) -> Result<usize> {
        self.ancestors(key)
            .map(|chain| chain.len())
            .ok_or_else(|| Error::not_found(key))
    }

    fn sibling_index(&self, key: &str) -> Result<(&Node, usize)> {
        let parent = self.parent(key).ok_or_else(|| Error::not_found(key))?;
        let index = parent
            .nodes()
            .iter()
            .position(|n| n.key().as_str() == key)
            .ok_or_else(|| Error::not_found(key))?;
        Ok((parent, index))
    }

    pub fn next_sibling(&self, key: &str) -> Result<Option<&Node>> {
        let (parent, index) = self.sibling_index(key)?;
        Ok(parent.nodes().get(index + 1))
    }

    pub fn previous_sibling(&self, key: &str) -> Result<Option<&Node>> {
        let (parent, index) = self.sibling_index(key)?;
        Ok(index.checked_sub(1).and_then(|i| parent.nodes().get(i)))
    }

    /// The direct child of this node that is or contains `key`
    pub fn furthest_ancestor(&self, key: &str) -> Option<&Node> {
        self.nodes()
            .iter()
            .find(|child| child.key().as_str() == key || child.has_descendant(key))
    }

    /// Nearest ancestor of `key` matching `predicate`, not counting this node
    pub fn closest(&self, key: &str, predicate: impl Fn(&Node) -> bool) -> Result<Option<&Node>> {
        let chain = self.ancestors(key).ok_or_else(|| Error::not_found(key))?;
        Ok(chain.into_iter().skip(1).rev().find(|node| predicate(node)))
    }

    /// Topmost ancestor of `key` matching `predicate`, not counting this node
    pub fn furthest(&self, key: &str, predicate: impl Fn(&Node) -> bool) -> Result<Option<&Node>> {
        let chain = self.ancestors(key).ok_or_else(|| Error::not_found(key))?;
        Ok(chain.into_iter().skip(1).find(|node| predicate(node)))
    }

    pub fn closest_block(&self, key: &str) -> Result<Option<&Node>> {
        self.closest(key, Node::is_block)
    }

    pub fn closest_inline(&self, key: &str) -> Result<Option<&Node>> {
        self.closest(key, Node::is_inline)
    }

    pub fn closest_void(&self, key: &str) -> Result<Option<&Node>> {
        self.closest(key, Node::is_void)
    }

    pub fn furthest_block(&self, key: &str) -> Result<Option<&Node>> {
        self.furthest(key, Node::is_block)
    }

    pub fn furthest_inline(&self, key: &str) -> Result<Option<&Node>> {
        self.furthest(key, Node::is_inline)
    }

    /// Highest ancestor of `key` whose subtree is a chain of only children
    /// ending at `key`, so removing it removes nothing but `key`'s branch.
    /// `None` when `key`'s parent has other children. Never returns this node.
    pub fn furthest_only_child_ancestor(&self, key: &str) -> Result<Option<&Node>> {
        let chain = self.ancestors(key).ok_or_else(|| Error::not_found(key))?;
        let mut furthest = None;
        for ancestor in chain.into_iter().skip(1).rev() {
            if ancestor.nodes().len() != 1 {
                break;
            }
            furthest = Some(ancestor);
        }
        Ok(furthest)
    }

    pub fn has_void_parent(&self, key: &str) -> Result<bool> {
        Ok(self.closest_void(key)?.is_some())
    }

    /// Lowest node that contains both keys. A key that names this node makes
    /// this node the answer; a key that names an ancestor of the other yields
    /// that ancestor's parent.
    pub fn common_ancestor(&self, one: &str, two: &str) -> Result<&Node> {
        if self.key().as_str() == one {
            self.assert_node(two)?;
            return Ok(self);
        }
        if self.key().as_str() == two {
            self.assert_node(one)?;
            return Ok(self);
        }
        let first = self.ancestors(one).ok_or_else(|| Error::not_found(one))?;
        let second = self.ancestors(two).ok_or_else(|| Error::not_found(two))?;

        let mut common = self;
        for (a, b) in first.into_iter().zip(second) {
            if a.key() != b.key() {
                break;
            }
            common = a;
        }
        Ok(common)
    }

    /// Whether `first` comes before `second` in document order. `None` when
    /// either key is missing.
    pub fn are_descendants_sorted(&self, first: &str, second: &str) -> Option<bool> {
        let mut order = None;
        let _ = self.walk(&mut |node| {
            let key = node.key().as_str();
            if key == first {
                order = Some(true);
                ControlFlow::Break(())
            } else if key == second {
                order = Some(false);
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        let order = order?;
        (self.has_descendant(first) && self.has_descendant(second)).then_some(order)
    }

    /// Every text in this subtree, in document order
    pub fn texts(&self) -> Vec<&Text> {
        let mut texts = Vec::new();
        let _ = self.walk(&mut |node| {
            if let Node::Text(text) = node {
                texts.push(text);
            }
            ControlFlow::Continue(())
        });
        texts
    }

    pub fn first_text(&self) -> Option<&Text> {
        self.find_descendant(Node::is_text).and_then(Node::as_text)
    }

    pub fn last_text(&self) -> Option<&Text> {
        self.nodes()
            .iter()
            .rev()
            .find_map(|child| match child {
                Node::Text(text) => Some(text),
                _ => child.last_text(),
            })
    }

    pub fn next_text(&self, key: &str) -> Option<&Text> {
        let texts = self.texts();
        let index = texts.iter().position(|t| t.key().as_str() == key)?;
        texts.get(index + 1).copied()
    }

    pub fn previous_text(&self, key: &str) -> Option<&Text> {
        let texts = self.texts();
        let index = texts.iter().position(|t| t.key().as_str() == key)?;
        index.checked_sub(1).and_then(|i| texts.get(i).copied())
    }

    /// A block none of whose children are blocks
    pub fn is_leaf_block(&self) -> bool {
        self.is_block() && !self.nodes().iter().any(Node::is_block)
    }

    /// An inline none of whose children are inlines
    pub fn is_leaf_inline(&self) -> bool {
        self.is_inline() && !self.nodes().iter().any(Node::is_inline)
    }

    /// Leaf blocks in document order
    pub fn blocks(&self) -> Vec<&Node> {
        let mut blocks = Vec::new();
        for child in self.nodes().iter().filter(|n| n.is_block()) {
            if child.is_leaf_block() {
                blocks.push(child);
            } else {
                blocks.extend(child.blocks());
            }
        }
        blocks
    }

    /// Leaf inlines in document order
    pub fn inlines(&self) -> Vec<&Node> {
        let mut inlines = Vec::new();
        for child in self.nodes().iter().filter(|n| !n.is_text()) {
            if child.is_leaf_inline() {
                inlines.push(child);
            } else {
                inlines.extend(child.inlines());
            }
        }
        inlines
    }

    pub fn blocks_by_type(&self, node_type: &str) -> Vec<&Node> {
        self.filter_descendants(|n| n.is_block() && n.node_type() == Some(node_type))
    }

    pub fn inlines_by_type(&self, node_type: &str) -> Vec<&Node> {
        self.filter_descendants(|n| n.is_inline() && n.node_type() == Some(node_type))
    }

    pub fn next_block(&self, key: &str) -> Result<Option<&Node>> {
        let blocks = self.blocks();
        let current = self.leaf_block_of(key)?;
        Ok(current.and_then(|current| {
            let index = blocks.iter().position(|b| b.key() == current.key())?;
            blocks.get(index + 1).copied()
        }))
    }

    pub fn previous_block(&self, key: &str) -> Result<Option<&Node>> {
        let blocks = self.blocks();
        let current = self.leaf_block_of(key)?;
        Ok(current.and_then(|current| {
            let index = blocks.iter().position(|b| b.key() == current.key())?;
            index.checked_sub(1).and_then(|i| blocks.get(i).copied())
        }))
    }

    fn leaf_block_of(&self, key: &str) -> Result<Option<&Node>> {
        let node = self.assert_descendant(key)?;
        if node.is_leaf_block() {
            Ok(Some(node))
        } else {
            self.closest_block(key)
        }
    }

    /// Every character in this subtree, in document order
    pub fn characters(&self) -> Vec<&Character> {
        match self {
            Node::Text(text) => text.characters().iter().collect(),
            _ => self
                .texts()
                .into_iter()
                .flat_map(|t| t.characters())
                .collect(),
        }
    }

    /// Union of the marks on every character in this subtree
    pub fn marks(&self) -> MarkSet {
        self.characters()
            .into_iter()
            .flat_map(|c| c.marks.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::marks;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    /// document
    ///   quote (b1)
    ///     paragraph (b2): "ab" link(i1: "cd")
    ///   paragraph (b3): "ef"
    fn sample() -> Node {
        Node::document(vec![
            Node::block(
                "quote",
                vec![
                    Node::block(
                        "paragraph",
                        vec![
                            Node::text("ab").with_key("t1"),
                            Node::inline("link", vec![Node::text("cd").with_key("t2")])
                                .with_key("i1"),
                        ],
                    )
                    .with_key("b2"),
                ],
            )
            .with_key("b1"),
            Node::block(
                "paragraph",
                vec![Node::text_with_marks("ef", &marks(["bold"])).with_key("t3")],
            )
            .with_key("b3"),
        ])
        .with_key("doc")
    }

    fn keys_of<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Vec<&'a str> {
        nodes.into_iter().map(|n| n.key().as_str()).collect()
    }

    #[test]
    fn test_child_and_descendant() {
        let doc = sample();

        assert!(doc.child("b1").is_some());
        assert!(doc.child("b2").is_none());
        assert_eq!(doc.descendant("t2").map(|n| n.text_content()), Some("cd".into()));
        assert!(doc.descendant("doc").is_none());
        assert!(doc.node("doc").is_some());
    }

    #[test]
    fn test_assert_descendant_missing_is_not_found() {
        assert_eq!(
            sample().assert_descendant("nope").unwrap_err(),
            Error::NotFound { key: "nope".into() }
        );
    }

    #[test]
    fn test_parent_and_ancestors() {
        let doc = sample();

        assert_eq!(doc.parent("t2").map(|n| n.key().as_str()), Some("i1"));
        assert_eq!(doc.parent("b1").map(|n| n.key().as_str()), Some("doc"));
        assert!(doc.parent("doc").is_none());
        assert_eq!(
            keys_of(doc.ancestors("t2").unwrap()),
            vec!["doc", "b1", "b2", "i1"]
        );
        assert!(doc.ancestors("missing").is_none());
    }

    #[rstest]
    #[case("b1", vec![0])]
    #[case("t1", vec![0, 0, 0])]
    #[case("t2", vec![0, 0, 1, 0])]
    #[case("t3", vec![1, 0])]
    #[case("doc", vec![])]
    fn test_path_round_trips_through_descendant_at_path(
        #[case] key: &str,
        #[case] expected: Vec<usize>,
    ) {
        let doc = sample();
        let path = doc.path(key).unwrap();

        assert_eq!(path, expected);
        assert_eq!(doc.assert_path(&path).unwrap().key().as_str(), key);
    }

    #[test]
    fn test_assert_path_out_of_range() {
        assert_eq!(
            sample().assert_path(&[5]).unwrap_err(),
            Error::PathNotFound { path: vec![5] }
        );
    }

    #[test]
    fn test_depth() {
        let doc = sample();
        assert_eq!(doc.depth("b1").unwrap(), 1);
        assert_eq!(doc.depth("t2").unwrap(), 4);
    }

    #[test]
    fn test_siblings() {
        let doc = sample();

        assert_eq!(
            doc.next_sibling("t1").unwrap().map(|n| n.key().as_str()),
            Some("i1")
        );
        assert!(doc.next_sibling("i1").unwrap().is_none());
        assert!(doc.previous_sibling("b1").unwrap().is_none());
        assert!(matches!(
            doc.next_sibling("missing"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_closest_and_furthest() {
        let doc = sample();

        assert_eq!(
            doc.closest_block("t2").unwrap().map(|n| n.key().as_str()),
            Some("b2")
        );
        assert_eq!(
            doc.furthest_block("t2").unwrap().map(|n| n.key().as_str()),
            Some("b1")
        );
        assert_eq!(
            doc.closest_inline("t2").unwrap().map(|n| n.key().as_str()),
            Some("i1")
        );
        assert!(doc.closest_inline("t1").unwrap().is_none());
        assert!(doc.closest_block("missing").is_err());
    }

    #[test]
    fn test_furthest_only_child_ancestor() {
        let doc = sample();

        // t2 is the only child of i1, but i1 shares b2 with t1
        assert_eq!(
            doc.furthest_only_child_ancestor("t2")
                .unwrap()
                .map(|n| n.key().as_str()),
            Some("i1")
        );
        // i1 shares its parent with t1
        assert_eq!(
            doc.furthest_only_child_ancestor("i1")
                .unwrap()
                .map(|n| n.key().as_str()),
            None
        );
        assert_eq!(
            doc.furthest_only_child_ancestor("t3")
                .unwrap()
                .map(|n| n.key().as_str()),
            Some("b3")
        );
    }

    #[rstest]
    #[case("t1", "t2", "b2")]
    #[case("t1", "t3", "doc")]
    #[case("t2", "i1", "b2")]
    #[case("b2", "t2", "b1")]
    #[case("doc", "t3", "doc")]
    fn test_common_ancestor(#[case] one: &str, #[case] two: &str, #[case] expected: &str) {
        assert_eq!(
            sample().common_ancestor(one, two).unwrap().key().as_str(),
            expected
        );
    }

    #[test]
    fn test_common_ancestor_missing_key() {
        assert_eq!(
            sample().common_ancestor("t1", "missing").unwrap_err(),
            Error::NotFound {
                key: "missing".into()
            }
        );
    }

    #[test]
    fn test_texts_and_neighbours() {
        let doc = sample();

        let keys: Vec<&str> = doc.texts().iter().map(|t| t.key().as_str()).collect();
        assert_eq!(keys, vec!["t1", "t2", "t3"]);
        assert_eq!(doc.first_text().map(|t| t.key().as_str()), Some("t1"));
        assert_eq!(doc.last_text().map(|t| t.key().as_str()), Some("t3"));
        assert_eq!(doc.next_text("t2").map(|t| t.key().as_str()), Some("t3"));
        assert!(doc.previous_text("t1").is_none());
    }

    #[test]
    fn test_leaf_blocks_and_inlines() {
        let doc = sample();

        assert_eq!(keys_of(doc.blocks()), vec!["b2", "b3"]);
        assert_eq!(keys_of(doc.inlines()), vec!["i1"]);
        assert_eq!(keys_of(doc.blocks_by_type("paragraph")), vec!["b2", "b3"]);
        assert_eq!(keys_of(doc.inlines_by_type("link")), vec!["i1"]);
        assert!(!doc.child("b1").unwrap().is_leaf_block());
    }

    #[test]
    fn test_next_and_previous_block() {
        let doc = sample();

        assert_eq!(
            doc.next_block("t2").unwrap().map(|n| n.key().as_str()),
            Some("b3")
        );
        assert_eq!(
            doc.previous_block("b3").unwrap().map(|n| n.key().as_str()),
            Some("b2")
        );
        assert!(doc.next_block("t3").unwrap().is_none());
    }

    #[test]
    fn test_are_descendants_sorted() {
        let doc = sample();

        assert_eq!(doc.are_descendants_sorted("t1", "t3"), Some(true));
        assert_eq!(doc.are_descendants_sorted("t3", "t2"), Some(false));
        assert_eq!(doc.are_descendants_sorted("t1", "missing"), None);
    }

    #[test]
    fn test_characters_and_marks() {
        let doc = sample();

        assert_eq!(doc.characters().len(), 6);
        assert_eq!(doc.marks(), marks(["bold"]));
        assert!(doc.child("b1").unwrap().marks().is_empty());
    }

    #[test]
    fn test_keys_excludes_root() {
        let keys = sample().keys();

        assert_eq!(keys.len(), 7);
        assert!(keys.contains("t2"));
        assert!(!keys.contains("doc"));
    }
}
