//! Stable error taxonomy shared by every validation component.
//!
//! Each [`ErrorCode`] has a stable string identifier grouped by range and a
//! message template with positional arguments (`{0}`, `{1}`, ...). Callers
//! branch on the identifier; the rendered message is for humans only.

use std::fmt;

use thiserror::Error;

/// Range an [`ErrorCode`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    RuleExecution,
    Processing,
    Publishing,
    Reading,
    ModelMapping,
    RestClient,
    ServiceConfig,
    Miscellaneous,
}

/// Every failure the pipeline can report, with a stable identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // ── Configuration (VS-1xxx) ───────────────────────────────
    RuleFileUnreadable,
    RuleFileInvalid,
    DuplicateRule,
    ConfigValueInvalid,

    // ── Rule execution (VS-2xxx) ──────────────────────────────
    RuleExecutionFailed,
    InvalidAttributePath,
    MessageTemplateFailed,

    // ── Processing (VS-3xxx) ──────────────────────────────────
    UnsupportedEntityType,
    MissingEventType,
    MissingEntityType,
    ModelResolutionFailed,

    // ── Publishing (VS-4xxx) ──────────────────────────────────
    IncorrectMessageCount,
    MessagesUnsent,
    PublishFailed,
    ChannelUnavailable,

    // ── Reading (VS-5xxx) ─────────────────────────────────────
    MalformedPayload,
    MissingEntity,
    QueueReadFailed,

    // ── Model-instance mapping (VS-6xxx) ──────────────────────
    ModelDocumentInvalid,
    ModelNotFound,

    // ── REST client (VS-7xxx) ─────────────────────────────────
    RestRequestFailed,
    RestUnexpectedStatus,

    // ── Service configuration (VS-8xxx) ───────────────────────
    ServiceMisconfigured,

    // ── Miscellaneous (VS-9xxx) ───────────────────────────────
    Serialization,
    Internal,
}

impl ErrorCode {
    /// Stable identifier, safe to match on.
    pub fn id(&self) -> &'static str {
        match self {
            ErrorCode::RuleFileUnreadable => "VS-1001",
            ErrorCode::RuleFileInvalid => "VS-1002",
            ErrorCode::DuplicateRule => "VS-1003",
            ErrorCode::ConfigValueInvalid => "VS-1004",
            ErrorCode::RuleExecutionFailed => "VS-2001",
            ErrorCode::InvalidAttributePath => "VS-2002",
            ErrorCode::MessageTemplateFailed => "VS-2003",
            ErrorCode::UnsupportedEntityType => "VS-3001",
            ErrorCode::MissingEventType => "VS-3002",
            ErrorCode::MissingEntityType => "VS-3003",
            ErrorCode::ModelResolutionFailed => "VS-3004",
            ErrorCode::IncorrectMessageCount => "VS-4001",
            ErrorCode::MessagesUnsent => "VS-4002",
            ErrorCode::PublishFailed => "VS-4003",
            ErrorCode::ChannelUnavailable => "VS-4004",
            ErrorCode::MalformedPayload => "VS-5001",
            ErrorCode::MissingEntity => "VS-5002",
            ErrorCode::QueueReadFailed => "VS-5003",
            ErrorCode::ModelDocumentInvalid => "VS-6001",
            ErrorCode::ModelNotFound => "VS-6002",
            ErrorCode::RestRequestFailed => "VS-7001",
            ErrorCode::RestUnexpectedStatus => "VS-7002",
            ErrorCode::ServiceMisconfigured => "VS-8001",
            ErrorCode::Serialization => "VS-9001",
            ErrorCode::Internal => "VS-9002",
        }
    }

    /// Message template with positional arguments.
    pub fn template(&self) -> &'static str {
        match self {
            ErrorCode::RuleFileUnreadable => "Unable to read rule file {0}: {1}",
            ErrorCode::RuleFileInvalid => "Invalid rule file {0}: {1}",
            ErrorCode::DuplicateRule => "Duplicate rule id {0} in {1}",
            ErrorCode::ConfigValueInvalid => "Invalid configuration value for {0}: {1}",
            ErrorCode::RuleExecutionFailed => "Rule {0} failed to execute: {1}",
            ErrorCode::InvalidAttributePath => "Invalid attribute path {0}: {1}",
            ErrorCode::MessageTemplateFailed => "Unable to render message for rule {0}: {1}",
            ErrorCode::UnsupportedEntityType => "Entity type {0} is not supported",
            ErrorCode::MissingEventType => "Event type could not be determined and no default is configured",
            ErrorCode::MissingEntityType => "Entity type could not be determined from the event",
            ErrorCode::ModelResolutionFailed => "Unable to resolve model {0}: {1}",
            ErrorCode::IncorrectMessageCount => "Incorrect number of messages sent to {0}: expected {1}, acknowledged {2}",
            ErrorCode::MessagesUnsent => "Channel {0} reported {1} unsent messages",
            ErrorCode::PublishFailed => "Failed to publish to {0}: {1}",
            ErrorCode::ChannelUnavailable => "Unable to open channel {0}: {1}",
            ErrorCode::MalformedPayload => "Malformed event payload: {0}",
            ErrorCode::MissingEntity => "Event payload has no entity at {0}",
            ErrorCode::QueueReadFailed => "Unable to read from queue: {0}",
            ErrorCode::ModelDocumentInvalid => "Invalid model document: {0}",
            ErrorCode::ModelNotFound => "Model {0} not found",
            ErrorCode::RestRequestFailed => "Request to {0} failed: {1}",
            ErrorCode::RestUnexpectedStatus => "Request to {0} returned status {1}",
            ErrorCode::ServiceMisconfigured => "Service misconfigured: {0}",
            ErrorCode::Serialization => "Serialization failed: {0}",
            ErrorCode::Internal => "Internal error: {0}",
        }
    }

    /// Range this code belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self.id().as_bytes().get(3) {
            Some(b'1') => ErrorCategory::Configuration,
            Some(b'2') => ErrorCategory::RuleExecution,
            Some(b'3') => ErrorCategory::Processing,
            Some(b'4') => ErrorCategory::Publishing,
            Some(b'5') => ErrorCategory::Reading,
            Some(b'6') => ErrorCategory::ModelMapping,
            Some(b'7') => ErrorCategory::RestClient,
            Some(b'8') => ErrorCategory::ServiceConfig,
            _ => ErrorCategory::Miscellaneous,
        }
    }

    /// Substitute positional arguments into the template.
    ///
    /// Placeholders without a matching argument are left as-is.
    /// Single pass over the template: substituted text is never rescanned.
    pub fn format(&self, args: &[&dyn fmt::Display]) -> String {
        let template = self.template();
        let mut message = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find('{') {
            message.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let arg = after.find('}').and_then(|end| {
                after[..end]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| args.get(i))
                    .map(|arg| (end, arg))
            });
            match arg {
                Some((end, arg)) => {
                    message.push_str(&arg.to_string());
                    rest = &after[end + 1..];
                }
                None => {
                    message.push('{');
                    rest = after;
                }
            }
        }
        message.push_str(rest);
        message
    }

    /// Failures caused by an external system that may succeed on redelivery.
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorCode::ModelResolutionFailed)
            || self.category() == ErrorCategory::RestClient
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A typed failure carrying a stable code and a rendered message.
#[derive(Debug, Error)]
#[error("[{code}] {message}")]
pub struct ValidationError {
    code: ErrorCode,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ValidationError {
    /// Build an error from a code and its positional arguments.
    pub fn new(code: ErrorCode, args: &[&dyn fmt::Display]) -> Self {
        Self {
            code,
            message: code.format(args),
            source: None,
        }
    }

    /// Attach an underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_substitutes_positional_args() {
        let msg = ErrorCode::IncorrectMessageCount.format(&[&"results", &3, &1]);
        assert_eq!(
            msg,
            "Incorrect number of messages sent to results: expected 3, acknowledged 1"
        );
    }

    #[test]
    fn missing_args_leave_placeholders() {
        let msg = ErrorCode::RuleFileInvalid.format(&[&"a.yml"]);
        assert_eq!(msg, "Invalid rule file a.yml: {1}");
    }

    #[test]
    fn substituted_text_is_not_rescanned() {
        let msg = ErrorCode::IncorrectMessageCount.format(&[&"{1}", &3, &1]);
        assert_eq!(
            msg,
            "Incorrect number of messages sent to {1}: expected 3, acknowledged 1"
        );
        let msg = ErrorCode::UnsupportedEntityType.format(&[&"{0}{"]);
        assert_eq!(msg, "Entity type {0}{ is not supported");
    }

    #[test]
    fn transient_codes_are_external_failures() {
        assert!(ErrorCode::ModelResolutionFailed.is_transient());
        assert!(ErrorCode::RestRequestFailed.is_transient());
        assert!(ErrorCode::RestUnexpectedStatus.is_transient());
        assert!(!ErrorCode::MalformedPayload.is_transient());
        assert!(!ErrorCode::UnsupportedEntityType.is_transient());
        assert!(!ErrorCode::InvalidAttributePath.is_transient());
    }

    #[test]
    fn ids_are_grouped_by_range() {
        assert_eq!(ErrorCode::RuleFileInvalid.category(), ErrorCategory::Configuration);
        assert_eq!(ErrorCode::UnsupportedEntityType.category(), ErrorCategory::Processing);
        assert_eq!(ErrorCode::IncorrectMessageCount.category(), ErrorCategory::Publishing);
        assert_eq!(ErrorCode::RestUnexpectedStatus.category(), ErrorCategory::RestClient);
        assert_eq!(ErrorCode::Internal.category(), ErrorCategory::Miscellaneous);
    }

    #[test]
    fn validation_error_display_carries_code() {
        let err = ValidationError::new(ErrorCode::UnsupportedEntityType, &[&"widget"]);
        assert_eq!(err.code(), ErrorCode::UnsupportedEntityType);
        assert_eq!(err.to_string(), "[VS-3001] Entity type widget is not supported");
    }
}
