use std::fmt;

use serde::{Deserialize, Serialize};

/// Key used to look up a model definition: the attribute that holds the id
/// plus the id value itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelId {
    attr: String,
    id: String,
}

impl ModelId {
    pub fn new(attr: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            attr: attr.into(),
            id: id.into(),
        }
    }

    /// Build from optional parts; a missing part becomes the empty string.
    pub fn from_parts(attr: Option<&str>, id: Option<&str>) -> Self {
        Self::new(attr.unwrap_or_default(), id.unwrap_or_default())
    }

    pub fn attr(&self) -> &str {
        &self.attr
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// An empty id must never trigger resolution.
    pub fn is_empty(&self) -> bool {
        self.attr.is_empty() || self.id.is_empty()
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.attr, self.id)
    }
}
