use thiserror::Error;
use validus_core::error::{ErrorCode, ValidationError};
use validus_core::{PathError, ReaderError};
use validus_model::CacheError;

use crate::dictionary::DictionaryError;

/// Per-event failures. None of them outlive the call that raised them.
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error("event type could not be determined and no default is configured")]
    MissingEventType,

    #[error("entity type could not be determined from the event")]
    MissingEntityType,

    #[error("entity type '{0}' is not supported")]
    UnsupportedEntityType(String),

    #[error("rule '{rule_id}' has an invalid attribute path: {source}")]
    InvalidPath {
        rule_id: String,
        #[source]
        source: PathError,
    },

    #[error("rule '{rule_id}' message failed to render: {reason}")]
    Message { rule_id: String, reason: String },

    #[error(transparent)]
    Model(#[from] CacheError),

    #[error("rule '{rule_id}' dictionary check failed: {source}")]
    Dictionary {
        rule_id: String,
        #[source]
        source: DictionaryError,
    },
}

impl ValidatorError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ValidatorError::Reader(e) => e.code(),
            ValidatorError::MissingEventType => ErrorCode::MissingEventType,
            ValidatorError::MissingEntityType => ErrorCode::MissingEntityType,
            ValidatorError::UnsupportedEntityType(_) => ErrorCode::UnsupportedEntityType,
            ValidatorError::InvalidPath { .. } => ErrorCode::InvalidAttributePath,
            ValidatorError::Message { .. } => ErrorCode::MessageTemplateFailed,
            ValidatorError::Model(e) => e.code(),
            ValidatorError::Dictionary { source, .. } => source.code(),
        }
    }
}

impl From<ValidatorError> for ValidationError {
    fn from(err: ValidatorError) -> Self {
        let code = err.code();
        match err {
            ValidatorError::Reader(e) => e.into(),
            ValidatorError::Model(e) => e.into(),
            ValidatorError::Dictionary { source, .. } => source.into(),
            other => {
                let converted = match &other {
                    ValidatorError::UnsupportedEntityType(entity_type) => {
                        ValidationError::new(code, &[entity_type])
                    }
                    ValidatorError::InvalidPath { rule_id, source } => {
                        ValidationError::new(code, &[rule_id, source])
                    }
                    ValidatorError::Message { rule_id, reason } => {
                        ValidationError::new(code, &[rule_id, reason])
                    }
                    _ => ValidationError::new(code, &[]),
                };
                converted.with_source(other)
            }
        }
    }
}
