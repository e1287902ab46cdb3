//! Failure taxonomy for the generation pipeline.
//!
//! Every stage reports failures as a [`PipelineError`]. The [`ErrorKind`] is
//! the stable, externally visible classification and decides the status the
//! caller sees.

use crate::redact::sanitize_to;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message returned to callers for faults whose detail must stay internal.
pub const INTERNAL_MESSAGE: &str = "Internal Server Error";

/// Longest diagnostic kept on an error, in characters.
pub const MAX_DIAGNOSTIC_CHARS: usize = 500;

/// Stable classification of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The inbound request does not match the input schema.
    ValidationError,
    /// The caller exceeded its admission quota.
    RateLimitError,
    /// The upstream service answered without any content.
    UpstreamEmptyError,
    /// No JSON payload could be recovered from the upstream text.
    UpstreamFormatError,
    /// The upstream call failed in transport (network, timeout, status, refusal).
    UpstreamTransportError,
    /// The upstream produced JSON that breaks the roadmap content rules.
    SchemaViolationError,
    /// Anything unanticipated.
    InternalError,
}

impl ErrorKind {
    /// HTTP status for this kind.
    pub fn status(&self) -> u16 {
        match self {
            ErrorKind::ValidationError => 400,
            ErrorKind::RateLimitError => 429,
            ErrorKind::UpstreamEmptyError => 500,
            ErrorKind::UpstreamFormatError => 500,
            ErrorKind::UpstreamTransportError => 500,
            ErrorKind::SchemaViolationError => 502,
            ErrorKind::InternalError => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::RateLimitError => "RateLimitError",
            ErrorKind::UpstreamEmptyError => "UpstreamEmptyError",
            ErrorKind::UpstreamFormatError => "UpstreamFormatError",
            ErrorKind::UpstreamTransportError => "UpstreamTransportError",
            ErrorKind::SchemaViolationError => "SchemaViolationError",
            ErrorKind::InternalError => "InternalError",
        }
    }

    /// Whether the caller can fix the failure by changing its request.
    pub fn is_caller_fault(&self) -> bool {
        matches!(self, ErrorKind::ValidationError | ErrorKind::RateLimitError)
    }

    /// Whether the failure is attributed to the upstream generation service.
    pub fn is_upstream_fault(&self) -> bool {
        matches!(
            self,
            ErrorKind::UpstreamEmptyError
                | ErrorKind::UpstreamFormatError
                | ErrorKind::UpstreamTransportError
                | ErrorKind::SchemaViolationError
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single failed rule at a specific location in the input or output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// JSON-path-like location, e.g. `modules[1].docUrl`. Empty for the document root.
    pub field: String,
    /// Short machine-readable rule name.
    pub rule: String,
    pub message: String,
}

impl Violation {
    pub fn new(
        field: impl Into<String>,
        rule: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            rule: rule.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            write!(f, "{} ({})", self.message, self.rule)
        } else {
            write!(f, "{}: {} ({})", self.field, self.message, self.rule)
        }
    }
}

/// A classified pipeline failure.
///
/// `message` is safe to show to the caller. Anything that must not leak
/// (raw upstream text, transport causes) travels in `diagnostic` and is only
/// ever logged.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct PipelineError {
    pub kind: ErrorKind,
    pub message: String,
    pub details: Vec<Violation>,
    pub diagnostic: Option<String>,
}

impl PipelineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: Vec::new(),
            diagnostic: None,
        }
    }

    pub fn validation(details: Vec<Violation>) -> Self {
        Self::new(ErrorKind::ValidationError, "Invalid input").with_details(details)
    }

    pub fn rate_limited() -> Self {
        Self::new(
            ErrorKind::RateLimitError,
            "Too many requests. Please try again later.",
        )
    }

    pub fn upstream_empty() -> Self {
        Self::new(
            ErrorKind::UpstreamEmptyError,
            "No content received from the generation service",
        )
    }

    /// `raw` is kept for diagnostics only.
    pub fn upstream_format(raw: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::UpstreamFormatError,
            "Failed to parse the generation service response",
        )
        .with_diagnostic(raw)
    }

    pub fn upstream_transport(cause: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::UpstreamTransportError,
            "The generation service is unavailable",
        )
        .with_diagnostic(cause)
    }

    pub fn schema_violation(details: Vec<Violation>) -> Self {
        Self::new(
            ErrorKind::SchemaViolationError,
            "AI response validation failed",
        )
        .with_details(details)
    }

    pub fn internal(cause: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, INTERNAL_MESSAGE).with_diagnostic(cause)
    }

    pub fn with_details(mut self, details: Vec<Violation>) -> Self {
        self.details = details;
        self
    }

    /// Attach internal detail. Secrets are redacted and the text is bounded.
    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostic = Some(sanitize_to(&diagnostic.into(), MAX_DIAGNOSTIC_CHARS));
        self
    }

    pub fn status(&self) -> u16 {
        self.kind.status()
    }

    /// The externally visible body: `{ error, kind, details? }`.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.message.clone(),
            kind: self.kind,
            details: if self.details.is_empty() {
                None
            } else {
                Some(self.details.clone())
            },
        }
    }
}

/// Serialized error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: ErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<Violation>>,
}
