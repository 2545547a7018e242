//! Resolves models over HTTP from a model-catalog endpoint.

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, warn};
use validus_core::config::ModelConfig;
use validus_core::ModelId;

use crate::definition::{ModelDefinition, ModelElement};
use crate::error::ResolverError;
use crate::local::{MODELS_ROOT, MODEL_ELEMENT};
use crate::namespace::strip_namespaces;
use crate::resolver::{ModelResolver, Resolution};

/// Queries `GET {base_url}?{id-attribute}={id}` and parses the XML reply.
#[derive(Debug, Clone)]
pub struct RemoteModelResolver {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteModelResolver {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Build a client with the configured connect/read timeouts.
    pub fn from_config(config: &ModelConfig, base_url: &str) -> Result<Self, ResolverError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.read_timeout())
            .build()
            .map_err(|source| ResolverError::Http {
                url: base_url.to_string(),
                source,
            })?;
        Ok(Self::new(client, base_url))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// A `models` wrapper yields its first `model`; any other root is the model.
fn definition_from(root: ModelElement) -> Resolution {
    if root.name != MODELS_ROOT {
        return Resolution::Found(ModelDefinition::new(root));
    }
    root.children
        .into_iter()
        .find(|child| child.name == MODEL_ELEMENT)
        .map(|model| Resolution::Found(ModelDefinition::new(model)))
        .unwrap_or(Resolution::NotFound)
}

#[async_trait]
impl ModelResolver for RemoteModelResolver {
    fn name(&self) -> &str {
        "remote"
    }

    async fn resolve(&self, id: &ModelId) -> Result<Resolution, ResolverError> {
        let http_err = |source| ResolverError::Http {
            url: self.base_url.clone(),
            source,
        };

        let response = self
            .client
            .get(&self.base_url)
            .query(&[(id.attr(), id.id())])
            .send()
            .await
            .map_err(http_err)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(model = %id, "remote model not found");
            return Ok(Resolution::NotFound);
        }
        if !status.is_success() {
            warn!(model = %id, status = status.as_u16(), "remote model lookup failed");
            return Err(ResolverError::Status {
                url: self.base_url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(http_err)?;
        let root = ModelElement::parse(&strip_namespaces(&body))?;
        Ok(definition_from(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver(server: &MockServer) -> RemoteModelResolver {
        RemoteModelResolver::new(reqwest::Client::new(), format!("{}/models", server.uri()))
    }

    fn id() -> ModelId {
        ModelId::new("model-invariant-id", "inv-1")
    }

    #[tokio::test]
    async fn found_model_is_namespace_stripped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .and(query_param("model-invariant-id", "inv-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<?xml version="1.0"?><ns:models xmlns:ns="http://x"><ns:model><model-invariant-id>inv-1</model-invariant-id></ns:model></ns:models>"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let resolution = resolver(&server).resolve(&id()).await.unwrap();
        let Resolution::Found(model) = resolution else {
            panic!("expected model");
        };
        assert_eq!(model.name(), "model");
        assert_eq!(model.texts("model-invariant-id"), vec!["inv-1"]);
    }

    #[tokio::test]
    async fn not_found_status_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let resolution = resolver(&server).resolve(&id()).await.unwrap();
        assert_eq!(resolution, Resolution::NotFound);
    }

    #[tokio::test]
    async fn server_error_is_a_resolution_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = resolver(&server).resolve(&id()).await.unwrap_err();
        assert!(matches!(err, ResolverError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn unparseable_body_is_a_resolution_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<model><open></model>"))
            .mount(&server)
            .await;

        let err = resolver(&server).resolve(&id()).await.unwrap_err();
        assert!(matches!(err, ResolverError::Document(_)));
    }
}
