//! YAML document types with serde deserialization.
//!
//! - `RuleEnvelope`: lightweight first-pass header (apiVersion, kind, metadata)
//! - `RuleDocument`: enum dispatching to kind-specific types
//! - `ValidationRule` / `EntityDefinition`: the two supported kinds

mod condition;
mod document;
mod entity_definition;
mod envelope;
mod kind;
mod metadata;
mod validation_rule;

pub use condition::*;
pub use document::*;
pub use entity_definition::*;
pub use envelope::*;
pub use kind::*;
pub use metadata::*;
pub use validation_rule::*;
