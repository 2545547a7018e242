//! Attribute values extracted from an entity for a single rule evaluation.

use std::collections::HashMap;

use serde::Serialize;

/// A single extracted attribute: either one scalar or an ordered list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Single(String),
    List(Vec<String>),
}

impl AttributeValue {
    /// All values as a slice-like iterator, regardless of shape.
    pub fn values(&self) -> Vec<&str> {
        match self {
            AttributeValue::Single(v) => vec![v.as_str()],
            AttributeValue::List(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    /// First value, if any.
    pub fn first(&self) -> Option<&str> {
        match self {
            AttributeValue::Single(v) => Some(v.as_str()),
            AttributeValue::List(vs) => vs.first().map(String::as_str),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            AttributeValue::Single(_) => 1,
            AttributeValue::List(vs) => vs.len(),
        }
    }

    /// True for an empty list or a blank scalar.
    pub fn is_empty(&self) -> bool {
        match self {
            AttributeValue::Single(v) => v.trim().is_empty(),
            AttributeValue::List(vs) => vs.is_empty(),
        }
    }

    /// Render for messages: scalars as-is, lists comma-joined.
    pub fn joined(&self) -> String {
        match self {
            AttributeValue::Single(v) => v.clone(),
            AttributeValue::List(vs) => vs.join(","),
        }
    }
}

/// Attribute name → value, populated once per rule evaluation.
///
/// Names are keyed trimmed, the same form [`crate::AttributePath`] keeps.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AttributeValues {
    values: HashMap<String, AttributeValue>,
}

impl AttributeValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: AttributeValue) {
        let name = name.into();
        let key = if name.trim().len() == name.len() {
            name
        } else {
            name.trim().to_string()
        };
        self.values.insert(key, value);
    }

    pub fn set_single(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.set(name, AttributeValue::Single(value.into()));
    }

    pub fn set_list(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.set(name, AttributeValue::List(values));
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.values.get(name.trim())
    }

    /// Values for `name`, empty when the attribute was not found.
    pub fn values_of(&self, name: &str) -> Vec<&str> {
        self.get(name).map(AttributeValue::values).unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name.trim())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_and_list_shapes() {
        let mut attrs = AttributeValues::new();
        attrs.set_single("vserver-id", "vs-1");
        attrs.set_list("related-to", vec!["tenant".into(), "pserver".into()]);

        assert_eq!(attrs.values_of("vserver-id"), vec!["vs-1"]);
        assert_eq!(attrs.values_of("related-to"), vec!["tenant", "pserver"]);
        assert!(attrs.values_of("missing").is_empty());
        assert_eq!(attrs.get("related-to").unwrap().joined(), "tenant,pserver");
    }

    #[test]
    fn names_are_keyed_trimmed() {
        let mut attrs = AttributeValues::new();
        attrs.set_single(" prov-status ", "ACTIVE");

        assert!(attrs.contains("prov-status"));
        assert_eq!(attrs.values_of("prov-status"), vec!["ACTIVE"]);
        assert_eq!(attrs.values_of("prov-status "), vec!["ACTIVE"]);
        assert_eq!(attrs.iter().next().unwrap().0, "prov-status");
    }

    #[test]
    fn blank_scalar_is_empty() {
        assert!(AttributeValue::Single("  ".into()).is_empty());
        assert!(AttributeValue::List(vec![]).is_empty());
        assert!(!AttributeValue::Single("x".into()).is_empty());
    }

    #[test]
    fn serializes_untagged() {
        let json = serde_json::to_string(&AttributeValue::List(vec!["a".into()])).unwrap();
        assert_eq!(json, r#"["a"]"#);
        let json = serde_json::to_string(&AttributeValue::Single("a".into())).unwrap();
        assert_eq!(json, r#""a""#);
    }
}
