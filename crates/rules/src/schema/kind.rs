//! Document kind enum for two-pass deserialization dispatch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    ValidationRule,
    EntityDefinition,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::ValidationRule => write!(f, "ValidationRule"),
            RuleKind::EntityDefinition => write!(f, "EntityDefinition"),
        }
    }
}

impl FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ValidationRule" => Ok(RuleKind::ValidationRule),
            "EntityDefinition" => Ok(RuleKind::EntityDefinition),
            other => Err(format!("unknown rule kind: '{}'", other)),
        }
    }
}
