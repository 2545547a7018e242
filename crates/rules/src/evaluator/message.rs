//! minijinja rendering for violation messages.
//!
//! Templates are per-rule strings rendered with a fresh
//! [`minijinja::Environment`] per call.

use std::collections::BTreeMap;

use serde::Serialize;
use validus_core::{AttributeValue, AttributeValues, Entity};

/// Data a message template can reference.
///
/// `{{ rule.id }}`, `{{ entity.type }}`, `{{ entity.link }}`,
/// `{{ entity.id['vserver-id'] }}`, `{{ attributes['prov-status'] }}`.
#[derive(Debug, Clone, Serialize)]
pub struct MessageContext {
    pub rule: RuleInfo,
    pub entity: EntityInfo,
    pub attributes: BTreeMap<String, AttributeValue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleInfo {
    pub id: String,
    pub name: String,
    pub category: String,
    pub severity: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityInfo {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub link: String,
    pub id: BTreeMap<String, String>,
    pub resource_version: Option<String>,
}

impl MessageContext {
    pub fn new(rule: RuleInfo, entity: &Entity, values: &AttributeValues) -> Self {
        Self {
            rule,
            entity: EntityInfo {
                entity_type: entity.entity_type().to_string(),
                link: entity.entity_link().to_string(),
                id: entity
                    .ids()
                    .iter()
                    .map(|id| (id.key.clone(), id.value.clone()))
                    .collect(),
                resource_version: entity.resource_version().map(str::to_string),
            },
            attributes: values
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        }
    }
}

#[derive(Debug, Default)]
pub struct MessageRenderer {
    _private: (),
}

impl MessageRenderer {
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();
        env.add_filter("lower", lower_filter);
        env.add_filter("upper", upper_filter);
        env.add_filter("joined", joined_filter);
        env
    }

    pub fn render(&self, template: &str, ctx: &MessageContext) -> Result<String, String> {
        Self::build_env()
            .render_str(template, ctx)
            .map_err(|e| e.to_string())
    }

    /// Check template syntax without rendering.
    pub fn validate(&self, template: &str) -> Result<(), String> {
        let env = Self::build_env();
        env.template_from_str(template).map_err(|e| e.to_string())?;
        Ok(())
    }
}

fn lower_filter(value: String) -> String {
    value.to_lowercase()
}

fn upper_filter(value: String) -> String {
    value.to_uppercase()
}

/// Lists render comma-separated; scalars pass through.
fn joined_filter(value: minijinja::Value) -> String {
    match value.try_iter() {
        Ok(items) if value.as_str().is_none() => items
            .map(|item| item.to_string())
            .collect::<Vec<_>>()
            .join(","),
        _ => value.to_string(),
    }
}
