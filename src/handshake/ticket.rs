//! Claims and tickets produced by a successful handshake

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::client::{AuthResult, User};

/// Claim type names
pub mod claim_types {
    pub const NAME_IDENTIFIER: &str = "NameIdentifier";
    pub const EMAIL: &str = "Email";
    pub const HOME_PHONE: &str = "HomePhone";
    pub const CREATED_AT: &str = "Passage-CreatedAt";
    pub const UPDATED_AT: &str = "Passage-UpdatedAt";
    pub const LAST_LOGIN_AT: &str = "Passage-LastLoginAt";
}

/// Ticket property keys
pub mod properties {
    pub const ISSUED: &str = ".issued";
    pub const EXPIRES: &str = ".expires";
    pub const REDIRECT: &str = ".redirect";
    pub const ACCESS_TOKEN: &str = ".Token.access_token";
    pub const REFRESH_TOKEN: &str = ".Token.refresh_token";
    pub const TOKEN_NAMES: &str = ".TokenNames";
}

/// Lifetime written into `.expires`
pub const TICKET_LIFETIME_MINUTES: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claim {
    #[serde(rename = "type")]
    pub claim_type: String,
    pub value: String,
}

impl Claim {
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }
}

/// Ordered claims; order is part of the contract
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClaimSet(Vec<Claim>);

impl ClaimSet {
    /// Build the claims for a resolved user
    ///
    /// `NameIdentifier` (the token subject) always comes first, then e-mail
    /// and phone when non-empty, then the provider timestamps when present.
    #[must_use]
    pub fn for_user(subject: &str, user: &User) -> Self {
        let mut claims = Self::default();
        claims.push(claim_types::NAME_IDENTIFIER, subject);

        if let Some(email) = user.email.as_deref().filter(|email| !email.is_empty()) {
            claims.push(claim_types::EMAIL, email);
        }
        if let Some(phone) = user.phone.as_deref().filter(|phone| !phone.is_empty()) {
            claims.push(claim_types::HOME_PHONE, phone);
        }

        for (claim_type, timestamp) in [
            (claim_types::CREATED_AT, user.created_at),
            (claim_types::UPDATED_AT, user.updated_at),
            (claim_types::LAST_LOGIN_AT, user.last_login_at),
        ] {
            if let Some(timestamp) = timestamp {
                claims.push(claim_type, format_timestamp(timestamp));
            }
        }
        claims
    }

    pub fn push(&mut self, claim_type: impl Into<String>, value: impl Into<String>) {
        self.0.push(Claim::new(claim_type, value));
    }

    /// First value of a claim type
    #[must_use]
    pub fn find(&self, claim_type: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|claim| claim.claim_type == claim_type)
            .map(|claim| claim.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Claim> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Terminal artifact of a successful handshake
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ticket {
    pub principal: ClaimSet,
    pub properties: BTreeMap<String, String>,
    pub scheme: String,
}

impl Ticket {
    /// Assemble a ticket from a completed exchange and user lookup
    ///
    /// Tokens are copied into the properties only when `save_tokens` is set.
    #[must_use]
    pub fn build(
        scheme: &str,
        principal: ClaimSet,
        auth: &AuthResult,
        save_tokens: bool,
        issued: DateTime<Utc>,
    ) -> Self {
        let mut bag = BTreeMap::new();
        bag.insert(properties::ISSUED.to_string(), format_timestamp(issued));
        bag.insert(
            properties::EXPIRES.to_string(),
            format_timestamp(issued + chrono::Duration::minutes(TICKET_LIFETIME_MINUTES)),
        );
        if let Some(redirect) = auth.redirect_url.as_deref().filter(|url| !url.is_empty()) {
            bag.insert(properties::REDIRECT.to_string(), redirect.to_string());
        }

        if save_tokens {
            let mut names = vec!["access_token"];
            bag.insert(properties::ACCESS_TOKEN.to_string(), auth.access_token.clone());
            if let Some(refresh) = auth.refresh_token.as_deref().filter(|token| !token.is_empty()) {
                bag.insert(properties::REFRESH_TOKEN.to_string(), refresh.to_string());
                names.push("refresh_token");
            }
            bag.insert(properties::TOKEN_NAMES.to_string(), names.join(";"));
        }

        Self {
            principal,
            properties: bag,
            scheme: scheme.to_string(),
        }
    }

    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.principal.find(claim_types::NAME_IDENTIFIER)
    }

    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn redirect(&self) -> Option<&str> {
        self.property(properties::REDIRECT)
    }
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}
