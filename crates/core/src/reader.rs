//! Reads event metadata and entity instances out of raw JSON payloads.
//!
//! Each field is first looked up at its configured JSON pointer; when that
//! misses, a list of well-known key names is searched at the top level and
//! inside the event header, so slightly different producers still parse.

use serde_json::Value;
use thiserror::Error;

use crate::error::{ErrorCode, ValidationError};
use crate::path::scalar_to_string;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("payload has no entity at '{0}'")]
    MissingEntity(String),
}

impl ReaderError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ReaderError::InvalidJson(_) | ReaderError::NotAnObject => ErrorCode::MalformedPayload,
            ReaderError::MissingEntity(_) => ErrorCode::MissingEntity,
        }
    }
}

impl From<ReaderError> for ValidationError {
    fn from(err: ReaderError) -> Self {
        let arg = match &err {
            ReaderError::MissingEntity(pointer) => pointer.clone(),
            other => other.to_string(),
        };
        ValidationError::new(err.code(), &[&arg]).with_source(err)
    }
}

/// An event payload parsed once and queried by the reader.
#[derive(Debug, Clone)]
pub struct EventPayload {
    raw: String,
    json: Value,
}

impl EventPayload {
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn json(&self) -> &Value {
        &self.json
    }
}

/// Pulls event type, entity type, link, and entity instances from a payload.
pub trait EventReader: Send + Sync {
    fn parse(&self, raw: &str) -> Result<EventPayload, ReaderError> {
        let json: Value = serde_json::from_str(raw)?;
        if !json.is_object() {
            return Err(ReaderError::NotAnObject);
        }
        Ok(EventPayload {
            raw: raw.to_string(),
            json,
        })
    }

    fn event_type(&self, payload: &EventPayload) -> Option<String>;

    fn entity_type(&self, payload: &EventPayload) -> Option<String>;

    fn entity_link(&self, payload: &EventPayload) -> Option<String>;

    /// Every entity instance the payload describes.
    fn entities(&self, payload: &EventPayload) -> Result<Vec<Value>, ReaderError>;
}

/// JSON pointers the [`JsonEventReader`] consults first.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReaderConfig {
    pub event_type_pointer: String,
    pub entity_type_pointer: String,
    pub entity_link_pointer: String,
    pub entity_pointer: String,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            event_type_pointer: "/event-header/event-type".to_string(),
            entity_type_pointer: "/event-header/entity-type".to_string(),
            entity_link_pointer: "/event-header/entity-link".to_string(),
            entity_pointer: "/entity".to_string(),
        }
    }
}

/// Well-known header locations searched when a pointer misses.
const HEADER_KEYS: &[&str] = &["event-header", "eventHeader", "header"];

const EVENT_TYPE_KEYS: &[&str] = &["event-type", "eventType", "event_type"];

const ENTITY_TYPE_KEYS: &[&str] = &["entity-type", "entityType", "entity_type"];

const ENTITY_LINK_KEYS: &[&str] = &["entity-link", "entityLink", "entity_link"];

/// Pointer-driven reader for JSON event envelopes.
#[derive(Debug, Clone, Default)]
pub struct JsonEventReader {
    config: ReaderConfig,
}

impl JsonEventReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    fn lookup(&self, json: &Value, pointer: &str, keys: &[&str]) -> Option<String> {
        json.pointer(pointer)
            .and_then(scalar_to_string)
            .or_else(|| find_key(json, keys))
            .or_else(|| {
                HEADER_KEYS
                    .iter()
                    .find_map(|h| json.get(*h))
                    .and_then(|header| find_key(header, keys))
            })
            .filter(|s| !s.trim().is_empty())
    }
}

fn find_key(json: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| json.get(*k))
        .and_then(scalar_to_string)
}

impl EventReader for JsonEventReader {
    fn event_type(&self, payload: &EventPayload) -> Option<String> {
        self.lookup(&payload.json, &self.config.event_type_pointer, EVENT_TYPE_KEYS)
    }

    fn entity_type(&self, payload: &EventPayload) -> Option<String> {
        self.lookup(&payload.json, &self.config.entity_type_pointer, ENTITY_TYPE_KEYS)
    }

    fn entity_link(&self, payload: &EventPayload) -> Option<String> {
        self.lookup(&payload.json, &self.config.entity_link_pointer, ENTITY_LINK_KEYS)
    }

    fn entities(&self, payload: &EventPayload) -> Result<Vec<Value>, ReaderError> {
        match payload.json.pointer(&self.config.entity_pointer) {
            Some(Value::Array(items)) if !items.is_empty() => Ok(items.clone()),
            Some(obj @ Value::Object(_)) => Ok(vec![obj.clone()]),
            _ => Err(ReaderError::MissingEntity(self.config.entity_pointer.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AAI_EVENT: &str = r#"{
        "event-header": {
            "event-type": "AAI-EVENT",
            "entity-type": "vserver",
            "entity-link": "/aai/v11/cloud-infrastructure/vservers/vserver/vs-1"
        },
        "entity": {"vserver-id": "vs-1"}
    }"#;

    #[test]
    fn reads_header_fields_via_pointers() {
        let reader = JsonEventReader::default();
        let payload = reader.parse(AAI_EVENT).unwrap();

        assert_eq!(reader.event_type(&payload).as_deref(), Some("AAI-EVENT"));
        assert_eq!(reader.entity_type(&payload).as_deref(), Some("vserver"));
        assert_eq!(
            reader.entity_link(&payload).as_deref(),
            Some("/aai/v11/cloud-infrastructure/vservers/vserver/vs-1")
        );
        assert_eq!(reader.entities(&payload).unwrap().len(), 1);
    }

    #[test]
    fn finds_alternate_key_names() {
        let reader = JsonEventReader::default();
        let payload = reader
            .parse(r#"{"eventHeader": {"eventType": "update", "entityType": "pserver"}, "entity": {}}"#)
            .unwrap();
        assert_eq!(reader.event_type(&payload).as_deref(), Some("update"));
        assert_eq!(reader.entity_type(&payload).as_deref(), Some("pserver"));
        assert_eq!(reader.entity_link(&payload), None);
    }

    #[test]
    fn array_entity_yields_one_instance_each() {
        let reader = JsonEventReader::default();
        let payload = reader
            .parse(r#"{"entity-type": "vserver", "entity": [{"vserver-id": "a"}, {"vserver-id": "b"}]}"#)
            .unwrap();
        assert_eq!(reader.entities(&payload).unwrap().len(), 2);
    }

    #[test]
    fn blank_values_count_as_missing() {
        let reader = JsonEventReader::default();
        let payload = reader
            .parse(r#"{"event-header": {"event-type": "  "}, "entity": {}}"#)
            .unwrap();
        assert_eq!(reader.event_type(&payload), None);
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        let reader = JsonEventReader::default();
        let err = reader.parse("not json").unwrap_err();
        assert_eq!(err.code(), ErrorCode::MalformedPayload);

        let err = reader.parse("[1, 2]").unwrap_err();
        assert!(matches!(err, ReaderError::NotAnObject));

        let payload = reader.parse(r#"{"event-header": {}}"#).unwrap();
        let err = reader.entities(&payload).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingEntity);
    }
}
