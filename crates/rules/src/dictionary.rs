//! Client for the remote rule-dictionary service.
//!
//! The dictionary holds the accepted values of common model elements.
//! `POST {base}/commonModelElements/{type}~{name}/validateInstance` answers
//! 200/204 when the value is accepted. A 500 is treated as an outage and
//! fails open; any other status is a violation carrying the service's cause.

use std::fmt;

use reqwest::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};
use validus_core::config::DictionaryConfig;
use validus_core::error::{ErrorCode, ValidationError};

/// Kind of model element a dictionary check targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    /// A whole instance: the body carries `{attribute: value}`.
    Instance,
    /// A single attribute: the body carries the bare value.
    Attribute,
    Unrecognized(String),
}

impl ElementKind {
    /// Case-insensitive; never fails.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "instance" => ElementKind::Instance,
            "attribute" => ElementKind::Attribute,
            _ => ElementKind::Unrecognized(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ElementKind::Instance => "instance",
            ElementKind::Attribute => "attribute",
            ElementKind::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("rule dictionary base URL is not configured")]
    NotConfigured,

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl DictionaryError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DictionaryError::NotConfigured => ErrorCode::ServiceMisconfigured,
            DictionaryError::Http { .. } => ErrorCode::RestRequestFailed,
        }
    }
}

impl From<DictionaryError> for ValidationError {
    fn from(err: DictionaryError) -> Self {
        let converted = match &err {
            DictionaryError::NotConfigured => ValidationError::new(err.code(), &[&err]),
            DictionaryError::Http { url, source } => ValidationError::new(err.code(), &[url, source]),
        };
        converted.with_source(err)
    }
}

pub struct RuleDictionaryClient {
    client: reqwest::Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl RuleDictionaryClient {
    /// Build a client from explicit configuration; fails when no base URL is set.
    pub fn new(config: &DictionaryConfig) -> Result<Self, DictionaryError> {
        let base_url = config
            .base_url
            .as_deref()
            .map(|u| u.trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .ok_or(DictionaryError::NotConfigured)?;

        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_millis(config.connect_timeout_ms))
            .timeout(std::time::Duration::from_millis(config.read_timeout_ms))
            .build()
            .map_err(|source| DictionaryError::Http {
                url: base_url.clone(),
                source,
            })?;

        Ok(Self {
            client,
            base_url,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check one attribute value. `Ok(None)` means no violation.
    pub async fn validate(
        &self,
        element_type: &str,
        element_name: &str,
        attribute_name: &str,
        attribute_value: &str,
    ) -> Result<Option<String>, DictionaryError> {
        let kind = ElementKind::parse(element_type);
        if attribute_value.trim().is_empty() {
            return Ok(Some(format!(
                "{} {} has no value for attribute '{}'",
                kind, element_name, attribute_name
            )));
        }

        let body = match &kind {
            ElementKind::Instance => json!({ "instance": { attribute_name: attribute_value } }),
            ElementKind::Attribute => json!({ "instance": attribute_value }),
            ElementKind::Unrecognized(raw) => {
                warn!(element_type = %raw, element_name, "unrecognized dictionary element type");
                return Ok(Some(format!(
                    "Unrecognized element type '{}' for {}.{}",
                    raw, element_name, attribute_name
                )));
            }
        };

        let url = format!(
            "{}/commonModelElements/{}~{}/validateInstance",
            self.base_url, kind, element_name
        );
        let mut request = self.client.post(&url).json(&body);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }

        let response = request.send().await.map_err(|source| DictionaryError::Http {
            url: url.clone(),
            source,
        })?;
        let status = response.status();

        match status {
            StatusCode::OK | StatusCode::NO_CONTENT => {
                debug!(element_name, attribute_name, "dictionary accepted value");
                Ok(None)
            }
            StatusCode::INTERNAL_SERVER_ERROR => {
                warn!(url = %url, element_name, attribute_name, "rule dictionary unavailable, skipping check");
                Ok(None)
            }
            other => {
                let text = response.text().await.unwrap_or_default();
                Ok(Some(format!(
                    "Rule dictionary rejected {}.{} = '{}' ({}): {}",
                    element_name,
                    attribute_name,
                    attribute_value,
                    other.as_u16(),
                    failure_cause(&text)
                )))
            }
        }
    }
}

/// `failureCause` or `message` from a JSON body, else the raw text.
fn failure_cause(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            ["failureCause", "message"]
                .iter()
                .find_map(|k| json.get(*k).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer) -> RuleDictionaryClient {
        RuleDictionaryClient::new(&DictionaryConfig::with_base_url(server.uri())).unwrap()
    }

    #[test]
    fn element_kind_parse_is_total() {
        assert_eq!(ElementKind::parse("Instance"), ElementKind::Instance);
        assert_eq!(ElementKind::parse(" ATTRIBUTE "), ElementKind::Attribute);
        assert_eq!(
            ElementKind::parse("widget"),
            ElementKind::Unrecognized("widget".into())
        );
    }

    #[test]
    fn failure_cause_prefers_json_fields() {
        assert_eq!(failure_cause(r#"{"failureCause": "bad value"}"#), "bad value");
        assert_eq!(failure_cause(r#"{"message": "nope"}"#), "nope");
        assert_eq!(failure_cause("plain text "), "plain text");
    }

    #[test]
    fn missing_base_url_is_misconfiguration() {
        let mut config = DictionaryConfig::with_base_url("");
        assert!(matches!(
            RuleDictionaryClient::new(&config),
            Err(DictionaryError::NotConfigured)
        ));
        config.base_url = None;
        let err = RuleDictionaryClient::new(&config).err().unwrap();
        assert_eq!(err.code(), ErrorCode::ServiceMisconfigured);
    }

    #[tokio::test]
    async fn accepted_values_are_not_violations() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/commonModelElements/attribute~prov-status/validateInstance"))
            .and(body_json(json!({"instance": "ACTIVE"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/commonModelElements/instance~vserver/validateInstance"))
            .and(body_json(json!({"instance": {"vserver-name": "web-01"}})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server).await;
        assert_eq!(
            client.validate("Attribute", "prov-status", "prov-status", "ACTIVE").await.unwrap(),
            None
        );
        assert_eq!(
            client.validate("Instance", "vserver", "vserver-name", "web-01").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn server_error_fails_open() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .mount(&server)
            .await;

        let verdict = client(&server)
            .await
            .validate("Attribute", "prov-status", "prov-status", "ACTIVE")
            .await
            .unwrap();
        assert_eq!(verdict, None);
    }

    #[tokio::test]
    async fn other_statuses_carry_the_failure_cause() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"failureCause": "PROV is not an allowed value"})),
            )
            .mount(&server)
            .await;

        let verdict = client(&server)
            .await
            .validate("Attribute", "prov-status", "prov-status", "PROV")
            .await
            .unwrap()
            .unwrap();
        assert!(verdict.contains("400"));
        assert!(verdict.contains("PROV is not an allowed value"));
    }

    #[tokio::test]
    async fn empty_value_short_circuits() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let verdict = client(&server)
            .await
            .validate("Attribute", "prov-status", "prov-status", "  ")
            .await
            .unwrap();
        assert!(verdict.unwrap().contains("no value"));
    }

    #[tokio::test]
    async fn empty_value_is_reported_before_an_unrecognized_kind() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let verdict = client(&server)
            .await
            .validate("Widget", "prov-status", "prov-status", "")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(verdict, "Widget prov-status has no value for attribute 'prov-status'");
    }

    #[tokio::test]
    async fn unrecognized_kind_is_a_violation_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let verdict = client(&server)
            .await
            .validate("Widget", "prov-status", "prov-status", "ACTIVE")
            .await
            .unwrap()
            .unwrap();
        assert!(verdict.contains("Unrecognized element type 'Widget'"));
    }

    #[tokio::test]
    async fn credentials_are_sent_as_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Basic dXNlcjpwYXNz"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = DictionaryConfig::with_base_url(format!("{}/", server.uri()));
        config.username = Some("user".into());
        config.password = Some("pass".into());
        let client = RuleDictionaryClient::new(&config).unwrap();
        assert_eq!(
            client.validate("Attribute", "prov-status", "prov-status", "ACTIVE").await.unwrap(),
            None
        );
    }
}
