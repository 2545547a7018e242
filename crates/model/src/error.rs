use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use validus_core::error::{ErrorCode, ValidationError};
use validus_core::ModelId;

/// Failure turning XML text into a model element tree.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("XML error at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("malformed model document: {0}")]
    Malformed(String),
}

/// A resolver failure other than "not found".
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("failed to read model document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} returned status {status}")]
    Status { url: String, status: u16 },
}

impl ResolverError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ResolverError::Io { .. } | ResolverError::Document(_) => ErrorCode::ModelDocumentInvalid,
            ResolverError::Http { .. } => ErrorCode::RestRequestFailed,
            ResolverError::Status { .. } => ErrorCode::RestUnexpectedStatus,
        }
    }
}

impl From<ResolverError> for ValidationError {
    fn from(err: ResolverError) -> Self {
        let converted = match &err {
            ResolverError::Io { .. } | ResolverError::Document(_) => {
                ValidationError::new(err.code(), &[&err])
            }
            ResolverError::Http { url, source } => ValidationError::new(err.code(), &[url, source]),
            ResolverError::Status { url, status } => ValidationError::new(err.code(), &[url, status]),
        };
        converted.with_source(err)
    }
}

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// Every waiter on the same in-flight resolution shares the one failure.
    #[error("failed to resolve model {key}: {source}")]
    Resolution {
        key: ModelId,
        #[source]
        source: Arc<ResolverError>,
    },
}

impl CacheError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CacheError::Resolution { .. } => ErrorCode::ModelResolutionFailed,
        }
    }

    pub fn key(&self) -> &ModelId {
        match self {
            CacheError::Resolution { key, .. } => key,
        }
    }
}

impl From<CacheError> for ValidationError {
    fn from(err: CacheError) -> Self {
        let CacheError::Resolution { key, source } = &err;
        let args: [&dyn fmt::Display; 2] = [key, source];
        let converted = ValidationError::new(err.code(), &args);
        converted.with_source(err)
    }
}
