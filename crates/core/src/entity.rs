use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attributes::{AttributeValue, AttributeValues};
use crate::path::{scalar_to_string, AttributePath, PathError};

/// Default attribute holding an entity's resource version.
pub const DEFAULT_RESOURCE_VERSION_ATTR: &str = "resource-version";

/// One primary-key component of an entity: key name plus value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId {
    pub key: String,
    pub value: String,
}

impl EntityId {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Typed view over one entity instance described by an event payload.
///
/// Identifiers and resource version are computed on first access and cached
/// for the lifetime of the instance.
#[derive(Debug)]
pub struct Entity {
    raw: String,
    entity_type: String,
    entity_link: String,
    instance: Value,
    keys: Vec<String>,
    resource_version_attr: String,
    ids: OnceLock<Vec<EntityId>>,
    resource_version: OnceLock<Option<String>>,
}

impl Entity {
    pub fn new(
        raw: impl Into<String>,
        entity_type: impl Into<String>,
        entity_link: impl Into<String>,
        instance: Value,
    ) -> Self {
        Self {
            raw: raw.into(),
            entity_type: entity_type.into(),
            entity_link: entity_link.into(),
            instance,
            keys: Vec::new(),
            resource_version_attr: DEFAULT_RESOURCE_VERSION_ATTR.to_string(),
            ids: OnceLock::new(),
            resource_version: OnceLock::new(),
        }
    }

    /// Primary key attribute names, in order. Composite keys list several.
    pub fn with_keys(mut self, keys: Vec<String>) -> Self {
        self.keys = keys;
        self
    }

    pub fn with_resource_version_attr(mut self, attr: impl Into<String>) -> Self {
        self.resource_version_attr = attr.into();
        self
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn entity_link(&self) -> &str {
        &self.entity_link
    }

    pub fn instance(&self) -> &Value {
        &self.instance
    }

    /// Primary key components present on the instance.
    ///
    /// Without configured keys the conventional `{entity-type}-id` is used.
    pub fn ids(&self) -> &[EntityId] {
        self.ids.get_or_init(|| {
            let fallback;
            let keys: &[String] = if self.keys.is_empty() {
                fallback = [format!("{}-id", self.entity_type)];
                &fallback
            } else {
                &self.keys
            };
            keys.iter()
                .filter_map(|key| {
                    self.instance
                        .get(key)
                        .and_then(scalar_to_string)
                        .map(|value| EntityId::new(key.clone(), value))
                })
                .collect()
        })
    }

    pub fn resource_version(&self) -> Option<&str> {
        self.resource_version
            .get_or_init(|| {
                self.instance
                    .get(&self.resource_version_attr)
                    .and_then(scalar_to_string)
            })
            .as_deref()
    }

    /// Extract one attribute by path expression.
    pub fn attribute(&self, path: &str) -> Result<Option<AttributeValue>, PathError> {
        Ok(AttributePath::parse(path)?.extract(&self.instance))
    }

    /// Extract every listed path; paths with no value are left out.
    pub fn attribute_values<S: AsRef<str>>(&self, paths: &[S]) -> Result<AttributeValues, PathError> {
        let mut values = AttributeValues::new();
        for path in paths {
            let path = path.as_ref();
            if let Some(value) = self.attribute(path)? {
                values.set(path, value);
            }
        }
        Ok(values)
    }
}
