use std::collections::{HashSet, VecDeque};

use log::{debug, warn};

use super::Transform;
use crate::error::{Error, Result};
use crate::models::{Key, Selection};
use crate::schema::Schema;

impl Transform {
    /// Normalize the whole document with `schema`, then the selection
    pub fn normalize(&mut self, schema: &Schema) -> Result<()> {
        let key = self.document.key().clone();
        self.normalize_node_by_key(&key, schema)?;
        self.normalize_selection()
    }

    /// Normalize the node `key` and everything under it, children first.
    ///
    /// Children created while normalizing their siblings are picked up and
    /// normalized too. Each node gets at most one repair per schema rule (or
    /// the configured `max_iterations`) before normalization gives up with
    /// `NonConvergentNormalization`.
    pub fn normalize_node_by_key(&mut self, key: &str, schema: &Schema) -> Result<()> {
        if schema.is_empty() {
            return Ok(());
        }
        let key = self.document.assert_node(key)?.key().clone();
        debug!("Normalizing \"{key}\" against {} rules", schema.len());
        self.normalize_tree(&key, schema)
    }

    /// Make sure the selection points at existing text, moving it to the
    /// start of the document when it does not
    pub fn normalize_selection(&mut self) -> Result<()> {
        let Some(first) = self.document.first_text() else {
            return Ok(());
        };
        let selection = match self.selection.normalize(&self.document) {
            Ok(selection) if selection.is_set() => selection,
            _ => {
                if self.selection.is_set() && self.options().warn_on_selection_reset {
                    warn!(
                        "Selection {:?} was invalid and has been reset to the start of the document",
                        self.selection
                    );
                }
                Selection {
                    is_focused: self.selection.is_focused,
                    ..Selection::collapsed(first.key().clone(), 0)
                }
            }
        };
        self.selection = selection;
        Ok(())
    }

    fn normalize_tree(&mut self, key: &Key, schema: &Schema) -> Result<()> {
        let Some(node) = self.document.node(key) else {
            return Ok(());
        };
        let mut pending: VecDeque<Key> = node.nodes().iter().map(|n| n.key().clone()).collect();
        let mut done = HashSet::new();

        while !pending.is_empty() {
            let recorded = self.operations.len();
            while let Some(child) = pending.pop_front() {
                self.normalize_tree(&child, schema)?;
                done.insert(child);
            }
            if self.operations.len() == recorded {
                break;
            }
            // Repairs may have added children; queue the ones not seen yet.
            let Some(node) = self.document.node(key) else {
                return Ok(());
            };
            for child in node.nodes().iter().rev() {
                if !done.contains(child.key()) {
                    pending.push_front(child.key().clone());
                }
            }
        }

        self.normalize_node(key, schema)
    }

    fn normalize_node(&mut self, key: &Key, schema: &Schema) -> Result<()> {
        let limit = self.options().max_iterations.unwrap_or(schema.len());
        let mut iterations = 0;
        loop {
            let Some(node) = self.document.node(key).cloned() else {
                return Ok(());
            };
            let Some((rule, failure)) = schema.validate(&node) else {
                return Ok(());
            };
            if iterations >= limit {
                return Err(Error::NonConvergentNormalization {
                    key: key.clone(),
                    iterations,
                });
            }
            rule.normalize(self, &node, failure)?;
            iterations += 1;
        }
    }
}
