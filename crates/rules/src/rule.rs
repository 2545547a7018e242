//! Registry-owned, compiled form of a `ValidationRule` document.

use validus_core::AttributePath;

use crate::evaluator::{Check, MessageRenderer};
use crate::schema::{DictionaryCheck, ModelCheck, ValidationRule};

#[derive(Debug)]
pub struct Rule {
    definition: ValidationRule,
    check: Option<Check>,
    /// Every attribute path the rule reads, deduplicated, in first-use order.
    paths: Vec<String>,
}

impl Rule {
    /// Validate a rule document and compile its condition.
    pub fn compile(definition: ValidationRule, renderer: &MessageRenderer) -> Result<Self, String> {
        let spec = &definition.spec;
        if spec.entity_type.trim().is_empty() {
            return Err("spec.entity_type must not be empty".to_string());
        }
        if spec.event_types.iter().all(|e| e.trim().is_empty()) {
            return Err("spec.event_types must list at least one event type".to_string());
        }
        if spec.category.trim().is_empty() {
            return Err("spec.category must not be empty".to_string());
        }
        renderer
            .validate(&spec.message)
            .map_err(|e| format!("invalid message template: {}", e))?;

        let check = spec.condition.as_ref().map(Check::compile).transpose()?;

        let mut paths: Vec<String> = Vec::new();
        let mut add = |path: &str| {
            if !paths.iter().any(|p| p == path) {
                paths.push(path.to_string());
            }
        };
        spec.attributes.iter().for_each(|p| add(p.as_str()));
        if let Some(condition) = &spec.condition {
            condition.attributes().into_iter().for_each(&mut add);
        }
        if let Some(dictionary) = &spec.dictionary {
            add(dictionary.attribute.as_str());
        }
        if let Some(compare_to) = spec.model.as_ref().and_then(|m| m.compare_to.as_deref()) {
            add(compare_to);
        }
        for path in &paths {
            AttributePath::parse(path).map_err(|e| e.to_string())?;
        }

        Ok(Self {
            definition,
            check,
            paths,
        })
    }

    pub fn id(&self) -> &str {
        &self.definition.metadata.id
    }

    pub fn name(&self) -> &str {
        &self.definition.metadata.name
    }

    pub fn entity_type(&self) -> &str {
        &self.definition.spec.entity_type
    }

    pub fn event_types(&self) -> impl Iterator<Item = &str> {
        self.definition
            .spec
            .event_types
            .iter()
            .map(|e| e.trim())
            .filter(|e| !e.is_empty())
    }

    pub fn category(&self) -> &str {
        &self.definition.spec.category
    }

    pub fn severity(&self) -> &str {
        &self.definition.spec.severity
    }

    pub fn message_template(&self) -> &str {
        &self.definition.spec.message
    }

    pub fn check(&self) -> Option<&Check> {
        self.check.as_ref()
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn dictionary(&self) -> Option<&DictionaryCheck> {
        self.definition.spec.dictionary.as_ref()
    }

    pub fn model(&self) -> Option<&ModelCheck> {
        self.definition.spec.model.as_ref()
    }

    pub fn definition(&self) -> &ValidationRule {
        &self.definition
    }
}
