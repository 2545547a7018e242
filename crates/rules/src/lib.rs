//! Rule documents, registry and engine for entity-change validation.
//!
//! This crate provides:
//! - YAML rule documents with two-pass serde deserialization
//! - A registry that loads rule roots once and indexes by entity/event type
//! - A closed condition language compiled at load time
//! - The rule-dictionary client
//! - The [`engine::Validator`] that turns an event payload into results

pub mod dictionary;
pub mod engine;
pub mod evaluator;
pub mod registry;
pub mod rule;
pub mod schema;
