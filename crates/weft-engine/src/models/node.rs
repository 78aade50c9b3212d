use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::character::{Character, characters_to_string};
use super::key::Key;
use super::mark::MarkSet;

/// Child indices from a root down to one of its descendants
pub type Path = Vec<usize>;

/// The four node kinds a tree is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Document,
    Block,
    Inline,
    Text,
}

/// A persistent document tree node.
///
/// Nodes are immutable values. Every mutation method returns a new tree that
/// shares all untouched subtrees with the old one through `Arc`, so holding on
/// to a previous version is cheap.
///
/// Only `Text` nodes hold characters. The other kinds hold ordered children:
/// the document holds blocks, blocks hold blocks, inlines or texts, and inlines
/// hold inlines or texts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node {
    Document(Container),
    Block(Container),
    Inline(Container),
    Text(Text),
}

/// Shared body of the document, block and inline kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    key: Key,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    node_type: String,
    #[serde(default)]
    is_void: bool,
    #[serde(default)]
    nodes: Arc<Vec<Node>>,
}

/// A leaf holding characters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    key: Key,
    #[serde(default)]
    characters: Arc<Vec<Character>>,
}

/// Patch of container properties used by `set_node` style edits.
/// `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Properties {
    pub node_type: Option<String>,
    pub is_void: Option<bool>,
}

impl Properties {
    pub fn with_type(node_type: impl Into<String>) -> Self {
        Self {
            node_type: Some(node_type.into()),
            is_void: None,
        }
    }

    pub fn void(mut self, is_void: bool) -> Self {
        self.is_void = Some(is_void);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.node_type.is_none() && self.is_void.is_none()
    }
}

impl Container {
    fn new(node_type: String, nodes: Vec<Node>) -> Self {
        Self {
            key: Key::generate(),
            node_type,
            is_void: false,
            nodes: Arc::new(nodes),
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    pub fn is_void(&self) -> bool {
        self.is_void
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Current values of the fields named in `patch`, for building an inverse
    pub(crate) fn properties_for(&self, patch: &Properties) -> Properties {
        Properties {
            node_type: patch.node_type.as_ref().map(|_| self.node_type.clone()),
            is_void: patch.is_void.map(|_| self.is_void),
        }
    }

    fn apply_properties(&mut self, patch: &Properties) {
        if let Some(node_type) = &patch.node_type {
            self.node_type = node_type.clone();
        }
        if let Some(is_void) = patch.is_void {
            self.is_void = is_void;
        }
    }
}

impl Text {
    pub fn new(key: Key, characters: Vec<Character>) -> Self {
        Self {
            key,
            characters: Arc::new(characters),
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn text(&self) -> String {
        characters_to_string(&self.characters)
    }

    /// Marks of the character just before `offset`, as used for typing at a cursor
    pub fn marks_before(&self, offset: usize) -> MarkSet {
        offset
            .checked_sub(1)
            .and_then(|index| self.characters.get(index))
            .map(|c| c.marks.clone())
            .unwrap_or_default()
    }

    pub(crate) fn characters_mut(&mut self) -> &mut Vec<Character> {
        Arc::make_mut(&mut self.characters)
    }
}

impl Node {
    pub fn document(nodes: Vec<Node>) -> Self {
        Node::Document(Container::new(String::new(), nodes))
    }

    pub fn block(node_type: impl Into<String>, nodes: Vec<Node>) -> Self {
        Node::Block(Container::new(node_type.into(), nodes))
    }

    pub fn inline(node_type: impl Into<String>, nodes: Vec<Node>) -> Self {
        Node::Inline(Container::new(node_type.into(), nodes))
    }

    pub fn text(text: &str) -> Self {
        Node::Text(Text::new(
            Key::generate(),
            Character::from_str_with_marks(text, &MarkSet::new()),
        ))
    }

    pub fn text_with_marks(text: &str, marks: &MarkSet) -> Self {
        Node::Text(Text::new(
            Key::generate(),
            Character::from_str_with_marks(text, marks),
        ))
    }

    /// The same node under a different key
    pub fn with_key(mut self, key: impl Into<Key>) -> Self {
        let key = key.into();
        match &mut self {
            Node::Document(c) | Node::Block(c) | Node::Inline(c) => c.key = key,
            Node::Text(t) => t.key = key,
        }
        self
    }

    /// Mark a block or inline as void. Has no effect on texts.
    pub fn void(mut self) -> Self {
        if let Some(container) = self.container_mut() {
            container.is_void = true;
        }
        self
    }

    pub fn key(&self) -> &Key {
        match self {
            Node::Document(c) | Node::Block(c) | Node::Inline(c) => &c.key,
            Node::Text(t) => &t.key,
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Node::Document(_) => Kind::Document,
            Node::Block(_) => Kind::Block,
            Node::Inline(_) => Kind::Inline,
            Node::Text(_) => Kind::Text,
        }
    }

    pub fn container(&self) -> Option<&Container> {
        match self {
            Node::Document(c) | Node::Block(c) | Node::Inline(c) => Some(c),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Node::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Node::Block(_))
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Node::Inline(_))
    }

    pub fn is_void(&self) -> bool {
        self.container().is_some_and(Container::is_void)
    }

    /// Type name of a block or inline. `None` for documents and texts.
    pub fn node_type(&self) -> Option<&str> {
        match self {
            Node::Block(c) | Node::Inline(c) => Some(&c.node_type),
            Node::Document(_) | Node::Text(_) => None,
        }
    }

    /// Direct children. Always empty for texts.
    pub fn nodes(&self) -> &[Node] {
        match self {
            Node::Document(c) | Node::Block(c) | Node::Inline(c) => &c.nodes,
            Node::Text(_) => &[],
        }
    }

    /// Number of characters in this subtree
    pub fn len(&self) -> usize {
        match self {
            Node::Text(t) => t.len(),
            _ => self.nodes().iter().map(Node::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Concatenated text of this subtree
    pub fn text_content(&self) -> String {
        match self {
            Node::Text(t) => t.text(),
            _ => self.nodes().iter().map(Node::text_content).collect(),
        }
    }

    /// Whether `other` is the same kind of node, so the two could be joined
    pub fn is_joinable_with(&self, other: &Node) -> bool {
        self.is_text() == other.is_text() && self.kind() != Kind::Document
    }

    /// The same container with different children. Texts are returned unchanged.
    pub fn with_nodes(&self, nodes: Vec<Node>) -> Node {
        let mut node = self.clone();
        if let Some(container) = node.container_mut() {
            container.nodes = Arc::new(nodes);
        }
        node
    }

    /// The same text with different characters. Containers are returned unchanged.
    pub fn with_characters(&self, characters: Vec<Character>) -> Node {
        let mut node = self.clone();
        if let Node::Text(text) = &mut node {
            text.characters = Arc::new(characters);
        }
        node
    }

    pub(crate) fn with_properties(&self, patch: &Properties) -> Node {
        let mut node = self.clone();
        if let Some(container) = node.container_mut() {
            container.apply_properties(patch);
        }
        node
    }

    fn container_mut(&mut self) -> Option<&mut Container> {
        match self {
            Node::Document(c) | Node::Block(c) | Node::Inline(c) => Some(c),
            Node::Text(_) => None,
        }
    }

    pub(crate) fn nodes_mut(&mut self) -> Option<&mut Vec<Node>> {
        self.container_mut().map(|c| Arc::make_mut(&mut c.nodes))
    }
}
