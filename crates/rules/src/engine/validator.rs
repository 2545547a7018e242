use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;
use validus_core::config::RulesConfig;
use validus_core::{
    AttributeValues, Entity, EventReader, JsonEventReader, ModelId, ValidationError,
    ValidationResult, Violation, ViolationType,
};
use validus_model::ModelCache;

use crate::dictionary::RuleDictionaryClient;
use crate::evaluator::{MessageContext, MessageRenderer, RuleInfo};
use crate::registry::RuleRegistry;
use crate::rule::Rule;
use crate::schema::EntityDefinition;

use super::error::ValidatorError;

/// Engine-level settings, usually taken from [`RulesConfig`].
#[derive(Debug, Clone, Default)]
pub struct ValidatorConfig {
    /// Event type assumed when the payload carries none.
    pub default_event_type: Option<String>,
    /// Entity types accepted (with zero violations) even though no rule targets them.
    pub ignored_entity_types: Vec<String>,
}

impl From<&RulesConfig> for ValidatorConfig {
    fn from(config: &RulesConfig) -> Self {
        Self {
            default_event_type: config.default_event_type.clone(),
            ignored_entity_types: config.ignored_entity_types.clone(),
        }
    }
}

/// Runs every applicable rule against the entities an event describes.
///
/// The model cache and the rule-dictionary client are optional: rules that
/// need a collaborator that is not configured skip that part of the check.
pub struct Validator {
    registry: Arc<RuleRegistry>,
    reader: Box<dyn EventReader>,
    models: Option<Arc<ModelCache>>,
    dictionary: Option<RuleDictionaryClient>,
    renderer: MessageRenderer,
    config: ValidatorConfig,
}

impl Validator {
    pub fn new(registry: Arc<RuleRegistry>, config: ValidatorConfig) -> Self {
        Self {
            registry,
            reader: Box::new(JsonEventReader::default()),
            models: None,
            dictionary: None,
            renderer: MessageRenderer::new(),
            config,
        }
    }

    pub fn with_reader(mut self, reader: impl EventReader + 'static) -> Self {
        self.reader = Box::new(reader);
        self
    }

    pub fn with_model_cache(mut self, cache: Arc<ModelCache>) -> Self {
        self.models = Some(cache);
        self
    }

    pub fn with_dictionary(mut self, client: RuleDictionaryClient) -> Self {
        self.dictionary = Some(client);
        self
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Validate one raw event payload.
    ///
    /// A successful call always yields at least one result, one per entity
    /// instance in the payload.
    pub async fn validate(&self, raw: &str) -> Result<Vec<ValidationResult>, ValidationError> {
        Ok(self.validate_event(raw).await?)
    }

    async fn validate_event(&self, raw: &str) -> Result<Vec<ValidationResult>, ValidatorError> {
        let payload = self.reader.parse(raw)?;

        let event_type = self
            .reader
            .event_type(&payload)
            .or_else(|| self.config.default_event_type.clone())
            .ok_or(ValidatorError::MissingEventType)?;
        let entity_type = self
            .reader
            .entity_type(&payload)
            .ok_or(ValidatorError::MissingEntityType)?;

        if !self.registry.is_known_entity_type(&entity_type) && !self.is_ignored(&entity_type) {
            return Err(ValidatorError::UnsupportedEntityType(entity_type));
        }

        let entity_link = self.reader.entity_link(&payload).unwrap_or_default();
        let instances = self.reader.entities(&payload)?;
        let rules = self.registry.rules_for(&entity_type, &event_type);
        let definition = self.registry.entity_definition(&entity_type);

        debug!(
            event_type = %event_type,
            entity_type = %entity_type,
            instances = instances.len(),
            rules = rules.len(),
            "validating event"
        );

        let mut results = Vec::with_capacity(instances.len());
        for instance in instances {
            let mut entity = Entity::new(raw, entity_type.as_str(), entity_link.as_str(), instance);
            if let Some(definition) = definition {
                entity = entity
                    .with_keys(definition.spec.keys.clone())
                    .with_resource_version_attr(definition.spec.resource_version.as_str());
            }

            let mut violations = Vec::new();
            for rule in rules {
                violations.extend(self.apply(rule, &entity, definition).await?);
            }

            let result = ValidationResult::for_entity(&entity, violations);
            debug!(
                validation_id = %result.validation_id,
                entity_type = %result.entity_type,
                violations = result.violations.len(),
                "entity validated"
            );
            results.push(result);
        }
        Ok(results)
    }

    fn is_ignored(&self, entity_type: &str) -> bool {
        self.config
            .ignored_entity_types
            .iter()
            .any(|t| t.trim().eq_ignore_ascii_case(entity_type.trim()))
    }

    async fn apply(
        &self,
        rule: &Rule,
        entity: &Entity,
        definition: Option<&EntityDefinition>,
    ) -> Result<Vec<Violation>, ValidatorError> {
        let values = entity
            .attribute_values(rule.paths())
            .map_err(|source| ValidatorError::InvalidPath {
                rule_id: rule.id().to_string(),
                source,
            })?;
        let details = details(rule, &values);
        let mut violations = Vec::new();

        if let Some(check) = rule.check() {
            if !check.evaluate(&values) {
                debug!(rule_id = %rule.id(), "condition failed");
                let message = self.render(rule, entity, &values)?;
                violations.push(violation(rule, ViolationType::Rule, message, details.clone()));
            }
        }

        if let Some(dictionary_check) = rule.dictionary() {
            match &self.dictionary {
                Some(client) => {
                    let attribute_values = values.values_of(&dictionary_check.attribute);
                    let sent = if attribute_values.is_empty() {
                        vec![""]
                    } else {
                        attribute_values
                    };
                    for value in sent {
                        let verdict = client
                            .validate(
                                &dictionary_check.element_type,
                                &dictionary_check.element_name,
                                &dictionary_check.attribute,
                                value,
                            )
                            .await
                            .map_err(|source| ValidatorError::Dictionary {
                                rule_id: rule.id().to_string(),
                                source,
                            })?;
                        if let Some(message) = verdict {
                            violations.push(violation(
                                rule,
                                ViolationType::Dictionary,
                                message,
                                details.clone(),
                            ));
                        }
                    }
                }
                None => debug!(rule_id = %rule.id(), "no rule dictionary configured, skipping check"),
            }
        }

        if let Some(model_check) = rule.model() {
            match &self.models {
                Some(cache) => {
                    let id_attribute = model_check
                        .id_attribute
                        .as_deref()
                        .or_else(|| definition.and_then(|d| d.spec.model_id_attribute.as_deref()));
                    let id_value = match id_attribute {
                        Some(attr) => entity
                            .attribute(attr)
                            .map_err(|source| ValidatorError::InvalidPath {
                                rule_id: rule.id().to_string(),
                                source,
                            })?
                            .and_then(|v| v.first().map(str::to_string)),
                        None => None,
                    };
                    let model_id = ModelId::from_parts(id_attribute, id_value.as_deref());

                    match cache.get(&model_id).await? {
                        None => {
                            let message = if model_id.is_empty() {
                                format!("{} has no model identifier", entity.entity_type())
                            } else {
                                format!("No model found for {}", model_id)
                            };
                            violations.push(violation(rule, ViolationType::Model, message, details.clone()));
                        }
                        Some(model) => {
                            if let (Some(element_path), Some(compare_to)) =
                                (&model_check.element_path, &model_check.compare_to)
                            {
                                let actual = values.values_of(compare_to);
                                let missing: Vec<String> = model
                                    .texts(element_path)
                                    .into_iter()
                                    .filter(|expected| !actual.contains(expected))
                                    .map(str::to_string)
                                    .collect();
                                if !missing.is_empty() {
                                    debug!(rule_id = %rule.id(), model = %model_id, missing = missing.len(), "entity does not conform to model");
                                    let message = self.render(rule, entity, &values)?;
                                    let mut details = details.clone();
                                    details.insert("missing".to_string(), missing);
                                    violations.push(violation(rule, ViolationType::Model, message, details));
                                }
                            }
                        }
                    }
                }
                None => debug!(rule_id = %rule.id(), "no model cache configured, skipping check"),
            }
        }

        Ok(violations)
    }

    fn render(
        &self,
        rule: &Rule,
        entity: &Entity,
        values: &AttributeValues,
    ) -> Result<String, ValidatorError> {
        let info = RuleInfo {
            id: rule.id().to_string(),
            name: rule.name().to_string(),
            category: rule.category().to_string(),
            severity: rule.severity().to_string(),
        };
        let ctx = MessageContext::new(info, entity, values);
        self.renderer
            .render(rule.message_template(), &ctx)
            .map_err(|reason| ValidatorError::Message {
                rule_id: rule.id().to_string(),
                reason,
            })
    }
}

/// Every path the rule reads, with the values found there.
fn details(rule: &Rule, values: &AttributeValues) -> BTreeMap<String, Vec<String>> {
    rule.paths()
        .iter()
        .map(|path| {
            let found = values.values_of(path).into_iter().map(str::to_string).collect();
            (path.clone(), found)
        })
        .collect()
}

fn violation(
    rule: &Rule,
    violation_type: ViolationType,
    message: String,
    details: BTreeMap<String, Vec<String>>,
) -> Violation {
    Violation {
        rule_id: rule.id().to_string(),
        category: rule.category().to_string(),
        severity: rule.severity().to_string(),
        violation_type,
        message,
        details,
    }
}
