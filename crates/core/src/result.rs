use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::entity::{Entity, EntityId};

/// Where a violation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    /// A configured condition failed.
    Rule,
    /// The remote rule dictionary rejected a value.
    Dictionary,
    /// The entity does not conform to its resolved model.
    Model,
}

/// One failed rule outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub rule_id: String,
    pub category: String,
    pub severity: String,
    pub violation_type: ViolationType,
    pub message: String,
    /// Offending attribute paths and the values seen there.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, Vec<String>>,
}

/// Outcome of validating one entity instance.
///
/// An empty violation list means the entity is valid.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub validation_id: Uuid,
    pub validation_timestamp: DateTime<Utc>,
    pub entity_type: String,
    #[serde(serialize_with = "serialize_entity_ids")]
    pub entity_id: Vec<EntityId>,
    pub entity_link: String,
    pub resource_version: Option<String>,
    pub violations: Vec<Violation>,
}

impl ValidationResult {
    /// Snapshot an entity's identity together with its violations.
    pub fn for_entity(entity: &Entity, violations: Vec<Violation>) -> Self {
        Self {
            validation_id: Uuid::new_v4(),
            validation_timestamp: Utc::now(),
            entity_type: entity.entity_type().to_string(),
            entity_id: entity.ids().to_vec(),
            entity_link: entity.entity_link().to_string(),
            resource_version: entity.resource_version().map(str::to_string),
            violations,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Entity ids publish as an object keyed by primary-key name, in key order.
fn serialize_entity_ids<S: Serializer>(ids: &[EntityId], serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(ids.len()))?;
    for id in ids {
        map.serialize_entry(&id.key, &id.value)?;
    }
    map.end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn published_shape() {
        let instance = json!({"vserver-id": "vs-1", "resource-version": "42"});
        let entity = Entity::new(instance.to_string(), "vserver", "/vservers/vs-1", instance);
        let violation = Violation {
            rule_id: "vserver-tenant".into(),
            category: "MISSING_REL".into(),
            severity: "CRITICAL".into(),
            violation_type: ViolationType::Rule,
            message: "vserver has no tenant".into(),
            details: BTreeMap::from([("related-to".to_string(), vec!["image".to_string()])]),
        };
        let result = ValidationResult::for_entity(&entity, vec![violation]);

        let json: Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(json["entityType"], "vserver");
        assert_eq!(json["entityId"], json!({"vserver-id": "vs-1"}));
        assert_eq!(json["entityLink"], "/vservers/vs-1");
        assert_eq!(json["resourceVersion"], "42");
        assert_eq!(json["violations"][0]["category"], "MISSING_REL");
        assert_eq!(json["violations"][0]["violationType"], "rule");
        assert!(json["validationId"].is_string());
    }

    #[test]
    fn empty_violations_mean_valid() {
        let entity = Entity::new("{}", "vserver", "", json!({}));
        let result = ValidationResult::for_entity(&entity, Vec::new());
        assert!(result.is_valid());
        assert_eq!(result.resource_version, None);
    }
}
