use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A formatting attribute carried by individual characters (bold, italic, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub mark_type: String,
}

impl Mark {
    pub fn new(mark_type: impl Into<String>) -> Self {
        Self {
            mark_type: mark_type.into(),
        }
    }
}

impl From<&str> for Mark {
    fn from(value: &str) -> Self {
        Mark::new(value)
    }
}

/// Ordered so that equal mark sets compare and print identically
pub type MarkSet = BTreeSet<Mark>;

/// Build a mark set from mark type names
pub fn marks<I, S>(types: I) -> MarkSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    types.into_iter().map(Mark::new).collect()
}
