use crate::models::Key;

/// Errors raised by navigation, mutation and transform operations.
///
/// Lookups that simply may not match (`child`, `parent`, `closest_block`, ...)
/// return `Option`; the variants here are for callers whose notion of the tree
/// is stale or wrong.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Could not find a node with key \"{key}\"")]
    NotFound { key: Key },

    #[error("Could not find a descendant at path {path:?}")]
    PathNotFound { path: Vec<usize> },

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error(
        "Schema rules for node \"{key}\" did not converge after {iterations} iterations; \
         a rule's validate or normalize is probably looping"
    )]
    NonConvergentNormalization { key: Key, iterations: usize },
}

impl Error {
    pub(crate) fn not_found(key: &str) -> Self {
        Error::NotFound {
            key: Key::from(key),
        }
    }

    pub(crate) fn path_not_found(path: &[usize]) -> Self {
        Error::PathNotFound {
            path: path.to_vec(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
