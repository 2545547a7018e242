//! Filesystem rule registry.
//!
//! Scans configuration roots for YAML documents, deserializes them in two
//! passes (`RuleEnvelope` -> `RuleDocument`) and indexes validation rules by
//! (entity type, event type).

mod core;
mod error;

#[cfg(test)]
mod tests;

pub use self::core::RuleRegistry;
pub use self::error::{LoadResult, LoadStatus, Result, RuleError};
