//! Conversions between documents and external formats.

mod plain;

pub use plain::Plain;
