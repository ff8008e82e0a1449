use std::fmt;

use crate::client::{ApiError, ApiErrorKind};

/// Why a handshake ended in `Failed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The request carried no Passage credential; another handler may own it
    NoCredential,
    /// Passage refused the exchange or lookup
    ProviderRejected {
        status: Option<u16>,
        message: String,
    },
    Unreachable(String),
    /// The token subject does not exist at Passage
    UserNotFound(String),
    /// The access token has no readable `sub` claim
    InvalidToken,
    HookError(String),
    SignInRejected(String),
    Cancelled,
}

impl FailureReason {
    /// Soft failures mean "not this handler's request" rather than a failed attempt
    #[must_use]
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::NoCredential)
    }

    /// Stable identifier for redirects and JSON bodies
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoCredential => "no_credential",
            Self::ProviderRejected { .. } => "provider_rejected",
            Self::Unreachable(_) => "unreachable",
            Self::UserNotFound(_) => "user_not_found",
            Self::InvalidToken => "invalid_token",
            Self::HookError(_) => "hook_error",
            Self::SignInRejected(_) => "sign_in_rejected",
            Self::Cancelled => "cancelled",
        }
    }

    /// Classify an error from the credential exchange
    #[must_use]
    pub fn from_exchange(err: &ApiError) -> Self {
        match err.kind {
            ApiErrorKind::Cancelled => Self::Cancelled,
            ApiErrorKind::Unreachable => Self::Unreachable(err.to_string()),
            ApiErrorKind::InvalidArgument
            | ApiErrorKind::ProviderRejected
            | ApiErrorKind::NotFound
            | ApiErrorKind::Fatal => Self::rejected(err),
        }
    }

    /// Classify an error from the user lookup of `subject`
    #[must_use]
    pub fn from_lookup(err: &ApiError, subject: &str) -> Self {
        match err.kind {
            ApiErrorKind::NotFound => Self::UserNotFound(subject.to_string()),
            _ => Self::from_exchange(err),
        }
    }

    fn rejected(err: &ApiError) -> Self {
        Self::ProviderRejected {
            status: err.status,
            message: err.message().to_string(),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredential => write!(f, "No Passage credential on the request"),
            Self::ProviderRejected {
                status: Some(status),
                message,
            } => write!(f, "Passage rejected the request ({status}): {message}"),
            Self::ProviderRejected {
                status: None,
                message,
            } => write!(f, "Passage rejected the request: {message}"),
            Self::Unreachable(msg) => write!(f, "Passage unreachable: {msg}"),
            Self::UserNotFound(id) => write!(f, "Passage user '{id}' not found"),
            Self::InvalidToken => write!(f, "Access token has no subject"),
            Self::HookError(msg) => write!(f, "Event hook failed: {msg}"),
            Self::SignInRejected(msg) => write!(f, "Sign-in rejected: {msg}"),
            Self::Cancelled => write!(f, "Handshake cancelled"),
        }
    }
}

impl std::error::Error for FailureReason {}
