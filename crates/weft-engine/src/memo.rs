//! Per-snapshot memoization of flattened leaf queries.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::{Key, Node, Text};

type Entries<T> = Mutex<HashMap<Key, Arc<Vec<T>>>>;

/// Hit and miss counts, mostly for tests and benchmarks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Default)]
struct Inner {
    texts: Entries<Text>,
    blocks: Entries<Node>,
    inlines: Entries<Node>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Results of `texts`/`blocks`/`inlines` queries keyed by node key, one map
/// per query.
///
/// A cache belongs to exactly one document snapshot: keys are only stable
/// within a snapshot, so every new state starts with an empty cache. Clones
/// of the same state share entries.
#[derive(Debug, Clone, Default)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texts(&self, node: &Node) -> Arc<Vec<Text>> {
        self.get_or_insert(&self.inner.texts, node, |node| {
            node.texts().into_iter().cloned().collect()
        })
    }

    pub fn blocks(&self, node: &Node) -> Arc<Vec<Node>> {
        self.get_or_insert(&self.inner.blocks, node, |node| {
            node.blocks().into_iter().cloned().collect()
        })
    }

    pub fn inlines(&self, node: &Node) -> Arc<Vec<Node>> {
        self.get_or_insert(&self.inner.inlines, node, |node| {
            node.inlines().into_iter().cloned().collect()
        })
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
        }
    }

    fn get_or_insert<T>(
        &self,
        entries: &Entries<T>,
        node: &Node,
        compute: impl FnOnce(&Node) -> Vec<T>,
    ) -> Arc<Vec<T>> {
        let mut entries = entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = entries.get(node.key()) {
            self.inner.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(cached);
        }
        self.inner.misses.fetch_add(1, Ordering::Relaxed);
        let computed = Arc::new(compute(node));
        entries.insert(node.key().clone(), Arc::clone(&computed));
        computed
    }
}
