use std::sync::Arc;

use weft_config::{Config, ConfigError};

use crate::error::{Error, Result};
use crate::memo::{CacheStats, QueryCache};
use crate::models::{History, Key, MarkSet, Node, Selection, Text};
use crate::transform::Transform;

/// Engine settings carried by every state and the transforms made from it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Maximum number of saved undo batches
    pub max_undos: usize,
    /// Normalization iteration guard per node; `None` allows one iteration per schema rule
    pub max_iterations: Option<usize>,
    /// Log a warning when normalization resets an invalid selection
    pub warn_on_selection_reset: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for EngineOptions {
    fn from(config: &Config) -> Self {
        Self {
            max_undos: config.history.max_undos,
            max_iterations: (config.normalize.max_iterations > 0)
                .then_some(config.normalize.max_iterations),
            warn_on_selection_reset: config.selection.warn_on_reset,
        }
    }
}

/// An immutable snapshot of a document, its selection and its history.
///
/// States are never edited in place. `transform()` opens a working session
/// and `Transform::apply` produces the next state.
#[derive(Debug, Clone)]
pub struct State {
    document: Node,
    selection: Selection,
    history: History,
    options: EngineOptions,
    version: u64,
    cache: QueryCache,
}

impl State {
    pub fn new(document: Node) -> Self {
        Self::with_options(document, EngineOptions::default())
    }

    pub fn with_config(document: Node, config: &Config) -> Self {
        Self::with_options(document, EngineOptions::from(config))
    }

    /// A state set up from the TOML file at `config_path`, or with default
    /// options when there is no file there
    pub fn from_config_file(
        document: Node,
        config_path: &str,
    ) -> std::result::Result<Self, ConfigError> {
        let config = Config::load_or_default(config_path)?;
        Ok(Self::with_config(document, &config))
    }

    /// A state with the cursor at the start of the first text
    pub fn with_options(document: Node, options: EngineOptions) -> Self {
        let selection = document
            .first_text()
            .map(|text| Selection::collapsed(text.key().clone(), 0))
            .unwrap_or_default();
        Self::from_parts(
            document,
            selection,
            History::new(options.max_undos),
            options,
            0,
        )
    }

    pub(crate) fn from_parts(
        document: Node,
        selection: Selection,
        history: History,
        options: EngineOptions,
        version: u64,
    ) -> Self {
        Self {
            document,
            selection,
            history,
            options,
            version,
            cache: QueryCache::new(),
        }
    }

    pub fn document(&self) -> &Node {
        &self.document
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Number of transforms applied since this document was loaded
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Open a transform against this state
    pub fn transform(&self) -> Transform {
        Transform::new(self.clone())
    }

    pub(crate) fn into_parts(self) -> (Node, Selection, History, EngineOptions, u64) {
        (
            self.document,
            self.selection,
            self.history,
            self.options,
            self.version,
        )
    }

    /// Every text in the document, memoized for this state
    pub fn texts(&self) -> Arc<Vec<Text>> {
        self.cache.texts(&self.document)
    }

    /// Leaf blocks of the document, memoized for this state
    pub fn blocks(&self) -> Arc<Vec<Node>> {
        self.cache.blocks(&self.document)
    }

    /// Leaf inlines of the document, memoized for this state
    pub fn inlines(&self) -> Arc<Vec<Node>> {
        self.cache.inlines(&self.document)
    }

    /// Texts under the node `key`, memoized for this state
    pub fn texts_of(&self, key: &str) -> Result<Arc<Vec<Text>>> {
        let node = self.document.assert_node(key)?;
        Ok(self.cache.texts(node))
    }

    /// Text after `key` in document order, looked up in the memoized texts
    pub fn next_text(&self, key: &str) -> Option<Text> {
        let texts = self.texts();
        let index = texts.iter().position(|t| t.key().as_str() == key)?;
        texts.get(index + 1).cloned()
    }

    /// Text before `key` in document order, looked up in the memoized texts
    pub fn previous_text(&self, key: &str) -> Option<Text> {
        let texts = self.texts();
        let index = texts.iter().position(|t| t.key().as_str() == key)?;
        index.checked_sub(1).and_then(|i| texts.get(i).cloned())
    }

    /// Texts touched by `range`, sliced out of the memoized texts
    pub fn texts_at_range(&self, range: &Selection) -> Result<Vec<Text>> {
        let range = range.normalize(&self.document)?;
        let (start_key, _, end_key, _) = range.points()?;
        let texts = self.texts();
        let position = |key: &Key| {
            texts
                .iter()
                .position(|t| t.key() == key)
                .ok_or_else(|| Error::not_found(key.as_str()))
        };
        let (start, end) = (position(start_key)?, position(end_key)?);
        Ok(texts[start..=end].to_vec())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Text holding the start of the selection
    pub fn start_text(&self) -> Option<&Text> {
        let key = self.selection.start_key()?;
        self.document.descendant(key)?.as_text()
    }

    /// Closest block around the start of the selection
    pub fn start_block(&self) -> Option<&Node> {
        let key = self.selection.start_key()?;
        self.document.closest_block(key).ok().flatten()
    }

    /// Marks the next typed character would get: pending selection marks if
    /// any, otherwise the marks at the selection
    pub fn marks(&self) -> Result<MarkSet> {
        if let Some(marks) = &self.selection.marks {
            return Ok(marks.clone());
        }
        if self.selection.is_unset() {
            return Ok(MarkSet::new());
        }
        self.document.marks_at_range(&self.selection)
    }
}
