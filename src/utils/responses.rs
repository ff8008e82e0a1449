//! HTTP response helpers shared by the handlers
//!
//! Error bodies always have the shape `{"error": <code>, "message": <text>}`
//! plus any additional fields a handler attaches.

use actix_web::{cookie::Cookie, http::header, http::StatusCode, HttpResponse};
use serde_json::{json, Value};

use crate::client::{ApiError, ApiErrorKind};

pub struct ResponseBuilder;

impl ResponseBuilder {
    /// Create a `BadRequest` (400) error response
    #[must_use]
    pub fn bad_request() -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(ErrorType::BadRequest)
    }

    /// Create an `Unauthorized` (401) error response
    #[must_use]
    pub fn unauthorized() -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(ErrorType::Unauthorized)
    }

    /// Create a `NotFound` (404) error response
    #[must_use]
    pub fn not_found() -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(ErrorType::NotFound)
    }

    /// Create an `InternalServerError` (500) error response
    #[must_use]
    pub fn internal_server_error() -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(ErrorType::InternalServerError)
    }

    /// Create a `BadGateway` (502) error response
    #[must_use]
    pub fn bad_gateway() -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(ErrorType::BadGateway)
    }

    /// Create a `ServiceUnavailable` (503) error response
    #[must_use]
    pub fn service_unavailable() -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(ErrorType::ServiceUnavailable)
    }

    /// Create a redirect response (302 Found)
    #[must_use]
    pub fn redirect(location: &str) -> RedirectBuilder {
        RedirectBuilder::new(location)
    }

    /// Common validation error: missing field
    #[must_use]
    pub fn missing_field(field_name: &str) -> HttpResponse {
        Self::bad_request()
            .with_error_code("missing_field")
            .with_message(&format!("Missing required field: {field_name}"))
            .with_additional_fields(json!({ "field": field_name }))
            .build()
    }

    /// Translate a Passage API failure into the response a browser client
    /// should see
    ///
    /// Provider 4xx statuses are passed through; everything the provider
    /// answers with 5xx becomes a 502.
    #[must_use]
    pub fn from_api_error(error: &ApiError) -> HttpResponse {
        let builder = match error.kind {
            ApiErrorKind::InvalidArgument => Self::bad_request(),
            ApiErrorKind::NotFound => Self::not_found(),
            ApiErrorKind::ProviderRejected => match error.status {
                Some(status) if (400..500).contains(&status) => {
                    ErrorResponseBuilder::new(ErrorType::Provider(status))
                }
                _ => Self::bad_gateway(),
            },
            ApiErrorKind::Unreachable | ApiErrorKind::Cancelled => Self::service_unavailable(),
            ApiErrorKind::Fatal => Self::internal_server_error(),
        };
        builder
            .with_error_code(error.kind.as_str())
            .with_message(error.message())
            .build()
    }
}

/// Builder for error responses with fluent interface
pub struct ErrorResponseBuilder {
    error_type: ErrorType,
    error_code: Option<String>,
    message: Option<String>,
    additional_fields: Option<Value>,
}

/// Builder for redirect responses
pub struct RedirectBuilder {
    location: String,
    cookies: Vec<Cookie<'static>>,
}

#[derive(Clone, Copy)]
enum ErrorType {
    BadRequest,
    Unauthorized,
    NotFound,
    InternalServerError,
    BadGateway,
    ServiceUnavailable,
    /// A 4xx relayed from Passage
    Provider(u16),
}

impl ErrorType {
    fn status(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadGateway => StatusCode::BAD_GATEWAY,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Provider(status) => {
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
        }
    }

    fn default_error_code(self) -> &'static str {
        match self {
            Self::BadRequest => "invalid_request",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::InternalServerError => "server_error",
            Self::BadGateway => "bad_gateway",
            Self::ServiceUnavailable => "service_unavailable",
            Self::Provider(_) => "provider_rejected",
        }
    }

    fn default_message(self) -> &'static str {
        match self {
            Self::BadRequest => "The request is malformed or invalid",
            Self::Unauthorized => "Authentication is required to access this resource",
            Self::NotFound => "The requested resource does not exist",
            Self::InternalServerError => "An internal server error occurred",
            Self::BadGateway => "Passage returned an unexpected error",
            Self::ServiceUnavailable => "Passage is temporarily unavailable",
            Self::Provider(_) => "Passage rejected the request",
        }
    }
}

impl ErrorResponseBuilder {
    fn new(error_type: ErrorType) -> Self {
        Self {
            error_type,
            error_code: None,
            message: None,
            additional_fields: None,
        }
    }

    /// Set a custom error code (e.g., "`no_credential`")
    #[must_use]
    pub fn with_error_code(mut self, code: &str) -> Self {
        self.error_code = Some(code.to_string());
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    /// Add additional JSON fields to the response
    #[must_use]
    pub fn with_additional_fields(mut self, fields: Value) -> Self {
        self.additional_fields = Some(fields);
        self
    }

    #[must_use]
    pub fn build(self) -> HttpResponse {
        let mut body = json!({
            "error": self.error_code.as_deref().unwrap_or(self.error_type.default_error_code()),
            "message": self.message.as_deref().unwrap_or(self.error_type.default_message()),
        });

        if let Some(Value::Object(map)) = self.additional_fields {
            for (key, value) in map {
                body[key] = value;
            }
        }

        HttpResponse::build(self.error_type.status())
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .json(body)
    }
}

impl RedirectBuilder {
    fn new(location: &str) -> Self {
        Self {
            location: location.to_string(),
            cookies: Vec::new(),
        }
    }

    /// Add a cookie to the redirect response
    #[must_use]
    pub fn with_cookie(mut self, cookie: Cookie<'static>) -> Self {
        self.cookies.push(cookie);
        self
    }

    /// Add an error parameter to the redirect URL
    #[must_use]
    pub fn with_error(mut self, error_param: &str) -> Self {
        self.location = if self.location.contains('?') {
            format!("{}&error={error_param}", self.location)
        } else {
            format!("{}?error={error_param}", self.location)
        };
        self
    }

    #[must_use]
    pub fn build(self) -> HttpResponse {
        let mut builder = HttpResponse::Found();
        for cookie in self.cookies {
            builder.cookie(cookie);
        }
        builder.append_header(("Location", self.location)).finish()
    }
}
