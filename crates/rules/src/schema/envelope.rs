//! Rule envelope for lightweight first-pass deserialization.

use serde::{Deserialize, Serialize};

use super::{CommonMetadata, EntityDefinition, RuleDocument, RuleKind, ValidationRule};

/// First-pass header: `apiVersion`, `kind` and `metadata`, with the rest
/// kept as raw YAML until the kind is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEnvelope {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    #[serde(flatten)]
    pub rest: serde_yaml::Value,
}

impl RuleEnvelope {
    pub fn rule_kind(&self) -> std::result::Result<RuleKind, String> {
        self.kind.parse()
    }

    /// Second pass: reconstruct the full YAML and deserialize into the concrete type.
    pub fn parse_full(&self) -> std::result::Result<RuleDocument, String> {
        let kind = self.rule_kind()?;
        let yaml = serde_yaml::to_string(self).map_err(|e| e.to_string())?;
        match kind {
            RuleKind::ValidationRule => {
                let rule: ValidationRule = serde_yaml::from_str(&yaml).map_err(|e| e.to_string())?;
                Ok(RuleDocument::Validation(rule))
            }
            RuleKind::EntityDefinition => {
                let def: EntityDefinition =
                    serde_yaml::from_str(&yaml).map_err(|e| e.to_string())?;
                Ok(RuleDocument::Entity(def))
            }
        }
    }
}
