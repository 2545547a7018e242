//! `EntityDefinition` documents: identity of an entity type.

use serde::{Deserialize, Serialize};
use validus_core::entity::DEFAULT_RESOURCE_VERSION_ATTR;

use super::CommonMetadata;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EntityDefinition {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    pub spec: EntityDefinitionSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EntityDefinitionSpec {
    pub entity_type: String,
    /// Primary key attribute names, in order.
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default = "default_resource_version")]
    pub resource_version: String,
    #[serde(default)]
    pub model_id_attribute: Option<String>,
}

fn default_resource_version() -> String {
    DEFAULT_RESOURCE_VERSION_ATTR.to_string()
}
