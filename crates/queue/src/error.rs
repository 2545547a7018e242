//! Queue and publishing error types.

use thiserror::Error;
use validus_core::error::{ErrorCode, ValidationError};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("message parse error: {0}")]
    Parse(String),

    #[error("acknowledge error: {0}")]
    Ack(String),

    #[error("queue not configured: {0}")]
    NotConfigured(String),

    #[error("provider error: {0}")]
    Provider(String),
}

impl QueueError {
    pub fn code(&self) -> ErrorCode {
        match self {
            QueueError::NotConfigured(_) => ErrorCode::ServiceMisconfigured,
            _ => ErrorCode::QueueReadFailed,
        }
    }
}

impl From<QueueError> for ValidationError {
    fn from(err: QueueError) -> Self {
        let converted = match &err {
            QueueError::NotConfigured(what) => ValidationError::new(err.code(), &[what]),
            other => ValidationError::new(err.code(), &[other]),
        };
        converted.with_source(err)
    }
}

/// Failures raised by a single output channel or one of its handles.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to open: {0}")]
    Open(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("close failed: {0}")]
    Close(String),
}

/// Publishing to one channel failed after every attempt was used.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("channel '{channel}' acknowledged {acknowledged} of {expected} messages")]
    IncorrectMessageCount {
        channel: String,
        expected: usize,
        acknowledged: usize,
        unsent: Vec<String>,
    },

    #[error("channel '{channel}' left {} messages unsent", .unsent.len())]
    Unsent { channel: String, unsent: Vec<String> },

    #[error("channel '{channel}' could not be opened: {source}")]
    Open {
        channel: String,
        #[source]
        source: ChannelError,
    },

    #[error("channel '{channel}' failed: {source}")]
    Send {
        channel: String,
        #[source]
        source: ChannelError,
        unsent: Vec<String>,
    },
}

impl PublishError {
    pub fn code(&self) -> ErrorCode {
        match self {
            PublishError::IncorrectMessageCount { .. } => ErrorCode::IncorrectMessageCount,
            PublishError::Unsent { .. } => ErrorCode::MessagesUnsent,
            PublishError::Open { .. } => ErrorCode::ChannelUnavailable,
            PublishError::Send { .. } => ErrorCode::PublishFailed,
        }
    }

    pub fn channel(&self) -> &str {
        match self {
            PublishError::IncorrectMessageCount { channel, .. }
            | PublishError::Unsent { channel, .. }
            | PublishError::Open { channel, .. }
            | PublishError::Send { channel, .. } => channel,
        }
    }

    /// Messages known not to have reached the channel.
    pub fn unsent(&self) -> &[String] {
        match self {
            PublishError::IncorrectMessageCount { unsent, .. }
            | PublishError::Unsent { unsent, .. }
            | PublishError::Send { unsent, .. } => unsent,
            PublishError::Open { .. } => &[],
        }
    }
}

impl From<PublishError> for ValidationError {
    fn from(err: PublishError) -> Self {
        let code = err.code();
        let converted = match &err {
            PublishError::IncorrectMessageCount {
                channel,
                expected,
                acknowledged,
                ..
            } => ValidationError::new(code, &[channel, expected, acknowledged]),
            PublishError::Unsent { channel, unsent } => {
                ValidationError::new(code, &[channel, &unsent.len()])
            }
            PublishError::Open { channel, source } | PublishError::Send { channel, source, .. } => {
                ValidationError::new(code, &[channel, source])
            }
        };
        converted.with_source(err)
    }
}
