//! A persistent, key-addressed document tree.
//!
//! Documents are immutable [`Node`] trees of blocks, inlines and texts. Edits
//! happen inside a [`Transform`] opened from a [`State`]; every edit is an
//! invertible [`Operation`], which is what powers undo and redo.

pub mod error;
pub mod memo;
pub mod models;
pub mod operation;
pub mod schema;
pub mod serializers;
pub mod state;
pub mod transform;
pub mod tree;

// Re-export key types for easier usage
pub use error::{Error, Result};
pub use memo::{CacheStats, QueryCache};
pub use models::*;
pub use operation::{Edit, Operation};
pub use schema::{Failure, Rule, Schema};
pub use serializers::Plain;
pub use state::{EngineOptions, State};
pub use transform::{Boundary, Direction, Transform};
pub use tree::format_tree;
pub use weft_config::{Config, ConfigError};
