//! Error types and load reports for the rule registry.

use std::path::PathBuf;

use validus_core::error::{ErrorCode, ValidationError};

/// Initialization failures. Each one names the offending file.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("failed to read rule file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid rule file {path}: {reason}")]
    InvalidFile { path: PathBuf, reason: String },

    #[error("duplicate id '{id}' in {path} (first defined in {first})")]
    Duplicate {
        id: String,
        path: PathBuf,
        first: PathBuf,
    },
}

impl RuleError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RuleError::Io { .. } => ErrorCode::RuleFileUnreadable,
            RuleError::InvalidFile { .. } => ErrorCode::RuleFileInvalid,
            RuleError::Duplicate { .. } => ErrorCode::DuplicateRule,
        }
    }

    pub fn path(&self) -> &PathBuf {
        match self {
            RuleError::Io { path, .. }
            | RuleError::InvalidFile { path, .. }
            | RuleError::Duplicate { path, .. } => path,
        }
    }

    pub(crate) fn invalid(path: &std::path::Path, reason: impl Into<String>) -> Self {
        RuleError::InvalidFile {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

impl From<RuleError> for ValidationError {
    fn from(err: RuleError) -> Self {
        let converted = match &err {
            RuleError::Io { path, source } => {
                ValidationError::new(err.code(), &[&path.display(), source])
            }
            RuleError::InvalidFile { path, reason } => {
                ValidationError::new(err.code(), &[&path.display(), reason])
            }
            RuleError::Duplicate { id, path, .. } => {
                ValidationError::new(err.code(), &[id, &path.display()])
            }
        };
        converted.with_source(err)
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;

/// Outcome of loading a single file.
#[derive(Debug)]
pub struct LoadResult {
    pub path: PathBuf,
    pub status: LoadStatus,
}

#[derive(Debug, PartialEq)]
pub enum LoadStatus {
    Loaded { id: String },
    Disabled { id: String },
    Skipped { reason: String },
}
