//! Validation rules that keep a document in shape.
//!
//! A [`Schema`] is an ordered list of [`Rule`]s. The first rule that rejects
//! a node reports a [`Failure`] and is then asked to fix the node through a
//! [`Transform`], so every fix is an ordinary recorded edit.

use crate::error::Result;
use crate::models::{Key, Node};
use crate::transform::Transform;

/// What a rule found wrong with a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Offending children or descendants
    Keys(Vec<Key>),
    /// Position of the first offending child
    Index(usize),
    Message(String),
}

pub trait Rule {
    /// `None` when `node` satisfies the rule
    fn validate(&self, node: &Node) -> Option<Failure>;

    /// Repair `node` given what `validate` reported. The node should
    /// validate afterwards, or at least be closer to doing so.
    fn normalize(&self, transform: &mut Transform, node: &Node, failure: Failure) -> Result<()>;
}

#[derive(Default)]
pub struct Schema {
    rules: Vec<Box<dyn Rule>>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn rule(&mut self, rule: impl Rule + 'static) -> &mut Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The first rule `node` breaks, with its failure
    pub fn validate(&self, node: &Node) -> Option<(&dyn Rule, Failure)> {
        self.rules
            .iter()
            .find_map(|rule| rule.validate(node).map(|failure| (rule.as_ref(), failure)))
    }
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("rules", &self.rules.len())
            .finish()
    }
}
