//! Passage API error taxonomy
//!
//! Every client operation returns `Result<T, ApiError>`. The kind tells the
//! caller how to branch; the status and provider message are kept for logs and
//! for surfacing the provider's own wording.

use serde::Deserialize;
use std::fmt;

/// Classification of an API failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Rejected locally; no request was sent
    InvalidArgument,
    /// Transport failure: DNS, connect, TLS or timeout
    Unreachable,
    /// Non-2xx response other than 404
    ProviderRejected,
    /// 404 from a lookup endpoint
    NotFound,
    /// The caller's cancellation scope fired while the call was outstanding
    Cancelled,
    /// A 2xx response that could not be decoded, or missing client credentials
    Fatal,
}

impl ApiErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::Unreachable => "unreachable",
            Self::ProviderRejected => "provider_rejected",
            Self::NotFound => "not_found",
            Self::Cancelled => "cancelled",
            Self::Fatal => "fatal",
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by every Passage API operation
#[derive(Debug, Clone)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    /// HTTP status of the response, when one was received
    pub status: Option<u16>,
    /// The provider's `error` field, or the raw body when it was not JSON
    pub provider_message: Option<String>,
    /// Underlying transport or decode error
    pub cause: Option<String>,
    /// What the client was doing, e.g. "Failed to get user 'u1'"
    pub context: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl ApiError {
    fn new(kind: ApiErrorKind, context: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            provider_message: None,
            cause: None,
            context: context.into(),
        }
    }

    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::InvalidArgument, message)
    }

    #[must_use]
    pub fn cancelled(context: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Cancelled, context)
    }

    #[must_use]
    pub fn fatal(context: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            cause: Some(cause.into()),
            ..Self::new(ApiErrorKind::Fatal, context)
        }
    }

    /// Classify a transport error from reqwest
    #[must_use]
    pub fn from_transport(context: impl Into<String>, err: &reqwest::Error) -> Self {
        let kind = if err.is_decode() {
            ApiErrorKind::Fatal
        } else {
            ApiErrorKind::Unreachable
        };
        Self {
            cause: Some(err.to_string()),
            ..Self::new(kind, context)
        }
    }

    /// Classify a non-2xx response
    ///
    /// The body is read as `{"error": "..."}` when it is JSON shaped; any other
    /// body is kept verbatim as the provider message.
    #[must_use]
    pub fn from_response(context: impl Into<String>, status: u16, body: &str) -> Self {
        let kind = if status == 404 {
            ApiErrorKind::NotFound
        } else {
            ApiErrorKind::ProviderRejected
        };
        Self {
            status: Some(status),
            provider_message: parse_provider_message(body),
            ..Self::new(kind, context)
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == ApiErrorKind::NotFound
    }

    /// Best human readable message: the provider's own, else the context
    #[must_use]
    pub fn message(&self) -> &str {
        self.provider_message.as_deref().unwrap_or(&self.context)
    }

}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}", self.context, self.kind)?;
        if let Some(status) = self.status {
            write!(f, ", status {status}")?;
        }
        if let Some(message) = &self.provider_message {
            write!(f, ": {message}")?;
        } else if let Some(cause) = &self.cause {
            write!(f, ": {cause}")?;
        }
        write!(f, ")")
    }
}

impl std::error::Error for ApiError {}

fn parse_provider_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<ErrorBody>(trimmed) {
        Ok(ErrorBody { error: Some(error) }) => Some(error),
        Ok(ErrorBody { error: None }) => Some(trimmed.to_string()),
        Err(_) => Some(trimmed.to_string()),
    }
}
