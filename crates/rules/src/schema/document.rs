//! Multi-kind rule document container and accessors.

use super::{CommonMetadata, EntityDefinition, RuleKind, ValidationRule};

/// A fully deserialized document of any supported kind.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleDocument {
    /// A check applied to entities of one type for a set of event types.
    Validation(ValidationRule),
    /// Key attributes and resource-version attribute of an entity type.
    Entity(EntityDefinition),
}

impl RuleDocument {
    pub fn metadata(&self) -> &CommonMetadata {
        match self {
            RuleDocument::Validation(rule) => &rule.metadata,
            RuleDocument::Entity(def) => &def.metadata,
        }
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            RuleDocument::Validation(_) => RuleKind::ValidationRule,
            RuleDocument::Entity(_) => RuleKind::EntityDefinition,
        }
    }

    pub fn as_validation(&self) -> Option<&ValidationRule> {
        match self {
            RuleDocument::Validation(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&EntityDefinition> {
        match self {
            RuleDocument::Entity(def) => Some(def),
            _ => None,
        }
    }
}
