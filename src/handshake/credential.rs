use actix_web::HttpRequest;
use std::collections::HashMap;
use std::fmt;

use crate::utils::cookie_utils::collect_cookies;

pub const MAGIC_LINK_PARAM: &str = "psg_magic_link";
pub const VERIFY_LINK_PARAM: &str = "psg_verify_link";

/// The query parameters and cookies of an inbound request
///
/// Framework-neutral snapshot the classifier works on. When a name repeats,
/// the first occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundRequest {
    query: HashMap<String, String>,
    cookies: HashMap<String, String>,
}

impl InboundRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_query(mut self, name: &str, value: &str) -> Self {
        self.query
            .entry(name.to_string())
            .or_insert_with(|| value.to_string());
        self
    }

    #[must_use]
    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies
            .entry(name.to_string())
            .or_insert_with(|| value.to_string());
        self
    }

    /// Snapshot an actix request
    #[must_use]
    pub fn from_http_request(req: &HttpRequest) -> Self {
        let mut query = HashMap::new();
        for (name, value) in url::form_urlencoded::parse(req.query_string().as_bytes()) {
            query
                .entry(name.into_owned())
                .or_insert_with(|| value.into_owned());
        }
        Self {
            query,
            cookies: collect_cookies(req),
        }
    }

    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }
}

/// What an inbound request carries, in classifier priority order
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    MagicLink(String),
    VerifyLink(String),
    BearerCookie(String),
    None,
}

impl Credential {
    /// Classify a request
    ///
    /// Priority is fixed: `psg_magic_link` query parameter, then
    /// `psg_verify_link`, then the auth token cookie. Only the first match
    /// counts, so a stale link always wins over a valid cookie. Presence is
    /// what matters; an empty value still selects its flow.
    #[must_use]
    pub fn classify(request: &InboundRequest, cookie_name: &str) -> Self {
        if let Some(token) = request.query(MAGIC_LINK_PARAM) {
            Self::MagicLink(token.to_string())
        } else if let Some(token) = request.query(VERIFY_LINK_PARAM) {
            Self::VerifyLink(token.to_string())
        } else if let Some(token) = request.cookie(cookie_name) {
            Self::BearerCookie(token.to_string())
        } else {
            Self::None
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MagicLink(_) => "magic_link",
            Self::VerifyLink(_) => "verify_link",
            Self::BearerCookie(_) => "bearer_cookie",
            Self::None => "none",
        }
    }
}

// Token values stay out of logs
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MagicLink(token) | Self::VerifyLink(token) | Self::BearerCookie(token) => {
                write!(f, "{}(<{} chars>)", self.kind(), token.len())
            }
            Self::None => f.write_str("none"),
        }
    }
}
