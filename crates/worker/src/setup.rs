//! Builds the service's components from [`Config`].

use std::sync::Arc;

use tracing::info;
use validus_core::config::{ModelConfig, ModelSource, PublisherConfig};
use validus_core::error::ErrorCode;
use validus_core::{Config, JsonEventReader, ValidationError};
use validus_model::{LocalModelResolver, ModelCache, ModelResolver, RemoteModelResolver};
use validus_queue::sqs::build_client;
use validus_queue::{OutputChannel, ResultPublisher, SqsChannel, SqsConsumer};
use validus_rules::dictionary::RuleDictionaryClient;
use validus_rules::engine::{Validator, ValidatorConfig};
use validus_rules::registry::RuleRegistry;

pub fn build_registry(config: &Config) -> Result<Arc<RuleRegistry>, ValidationError> {
    let registry = RuleRegistry::initialise(&config.rules.dirs)?;
    info!(
        rules = registry.rule_count(),
        files = registry.report().len(),
        "rule registry initialised"
    );
    Ok(Arc::new(registry))
}

pub fn build_model_cache(config: &ModelConfig) -> Result<Arc<ModelCache>, ValidationError> {
    let resolver: Arc<dyn ModelResolver> = match config.source {
        ModelSource::Local => {
            let mut resolver = LocalModelResolver::new(&config.file);
            if let Some(id_path) = &config.id_path {
                resolver = resolver.with_id_path(id_path.as_str());
            }
            Arc::new(resolver)
        }
        ModelSource::Remote => {
            let base_url = config.base_url.as_deref().filter(|u| !u.is_empty()).ok_or_else(|| {
                ValidationError::new(
                    ErrorCode::ServiceMisconfigured,
                    &[&"MODEL_BASE_URL is required when MODEL_SOURCE is remote"],
                )
            })?;
            Arc::new(RemoteModelResolver::from_config(config, base_url)?)
        }
    };
    Ok(Arc::new(ModelCache::from_config(resolver, config)))
}

/// Registry, reader, model cache, and (when configured) the rule dictionary.
pub fn build_validator(config: &Config) -> Result<Validator, ValidationError> {
    let registry = build_registry(config)?;
    let models = build_model_cache(&config.model)?;

    let mut validator = Validator::new(registry, ValidatorConfig::from(&config.rules))
        .with_reader(JsonEventReader::new(config.reader.clone()))
        .with_model_cache(models);

    if config.dictionary.is_configured() {
        let client = RuleDictionaryClient::new(&config.dictionary)?;
        info!(base_url = client.base_url(), "rule dictionary enabled");
        validator = validator.with_dictionary(client);
    }
    Ok(validator)
}

pub fn build_publisher(
    channels: Vec<Box<dyn OutputChannel>>,
    config: &PublisherConfig,
) -> ResultPublisher {
    let publisher = ResultPublisher::new(channels, config.clone());
    info!(
        enabled = publisher.is_enabled(),
        channels = ?publisher.channel_names(),
        retries = config.retries,
        "result publisher configured"
    );
    publisher
}

/// SQS consumer for the inbound queue plus one channel per output queue.
pub fn build_sqs(
    config: &Config,
) -> Result<(SqsConsumer, Vec<Box<dyn OutputChannel>>), ValidationError> {
    let client = build_client(&config.aws);
    let consumer = SqsConsumer::new(client.clone(), &config.queue)?;
    let channels = SqsChannel::from_config(&client, &config.queue)
        .into_iter()
        .map(|c| Box::new(c) as Box<dyn OutputChannel>)
        .collect();
    Ok((consumer, channels))
}
