//! `ValidationRule` documents: what to check for an entity/event pair.

use serde::{Deserialize, Serialize};

use super::{CommonMetadata, Condition};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ValidationRule {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    pub spec: ValidationRuleSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ValidationRuleSpec {
    pub entity_type: String,
    /// Event types this rule runs for (matched case-insensitively).
    pub event_types: Vec<String>,
    /// Violation category tag, e.g. `MISSING_REL`.
    pub category: String,
    #[serde(default = "default_severity")]
    pub severity: String,
    /// Extra attribute paths exposed to the message template and reported
    /// in violation details.
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub condition: Option<Condition>,
    /// minijinja template for the violation message.
    pub message: String,
    #[serde(default)]
    pub dictionary: Option<DictionaryCheck>,
    #[serde(default)]
    pub model: Option<ModelCheck>,
}

fn default_severity() -> String {
    "MAJOR".to_string()
}

/// Ask the remote rule dictionary whether an attribute value is acceptable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DictionaryCheck {
    /// `Instance` or `Attribute`.
    pub element_type: String,
    pub element_name: String,
    /// Attribute path whose value is sent.
    pub attribute: String,
}

/// Compare the entity against the model it declares.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModelCheck {
    /// Entity attribute holding the model id; falls back to the entity
    /// definition's `model_id_attribute`.
    #[serde(default)]
    pub id_attribute: Option<String>,
    /// `/`-separated path inside the model listing expected values.
    #[serde(default)]
    pub element_path: Option<String>,
    /// Entity attribute path that must carry every expected value.
    #[serde(default)]
    pub compare_to: Option<String>,
}
