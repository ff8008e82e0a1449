//! Authentication API: unauthenticated end-user operations
//!
//! All paths live under `{auth_api_url}/apps/{app_id}/`.

use chrono::Utc;
use log::debug;
use reqwest::Method;
use serde_json::{json, Value};

use super::models::{
    App, AppEnvelope, AuthResult, AuthResultEnvelope, Challenge, MagicLink, MagicLinkEnvelope,
};
use super::transport::{endpoint, ApiRequest};
use super::{ApiError, ClientInner};
use crate::cancel::CancellationScope;
use crate::utils::validation::is_valid_identifier;

fn check_identifier(identifier: &str) -> Result<(), ApiError> {
    if is_valid_identifier(identifier) {
        Ok(())
    } else {
        Err(ApiError::invalid_argument(
            "Identifier is not a valid email address or E164 formatted phone number",
        ))
    }
}

#[derive(Clone, Copy)]
pub struct AuthenticationApi<'a> {
    inner: &'a ClientInner,
}

#[derive(Clone, Copy, Debug)]
enum Ceremony {
    Login,
    Register,
}

impl Ceremony {
    fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
        }
    }
}

impl<'a> AuthenticationApi<'a> {
    pub(super) fn new(inner: &'a ClientInner) -> Self {
        Self { inner }
    }

    fn url(&self, app_id: &str, path: &[&str]) -> String {
        let mut segments = vec!["apps", app_id];
        segments.extend_from_slice(path);
        endpoint(&self.inner.auth_api_url, &segments)
    }

    /// Public information about an app; defaults to the configured app
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown app, otherwise the usual API errors.
    pub async fn get_app(
        &self,
        app_id: Option<&str>,
        cancel: &CancellationScope,
    ) -> Result<App, ApiError> {
        let app_id = app_id.unwrap_or(&self.inner.app_id);
        let request = ApiRequest::new(
            Method::GET,
            self.url(app_id, &[]),
            format!("Failed to get app '{app_id}'"),
        );
        let envelope: AppEnvelope = self.inner.transport.send_json(request, cancel).await?;
        Ok(envelope.app)
    }

    /// Send a login e-mail or SMS to `identifier`
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` without sending anything when `identifier` is
    /// neither an e-mail address nor an E.164 phone number.
    pub async fn get_magic_link(
        &self,
        identifier: &str,
        cancel: &CancellationScope,
    ) -> Result<MagicLink, ApiError> {
        check_identifier(identifier)?;

        let request = ApiRequest::new(
            Method::POST,
            self.url(&self.inner.app_id, &["login", "magic-link"]),
            "Failed to send magic link",
        )
        .json(json!({ "identifier": identifier }));
        let envelope: MagicLinkEnvelope = self.inner.transport.send_json(request, cancel).await?;
        Ok(envelope.magic_link)
    }

    /// Redeem a magic link token for an `AuthResult`
    ///
    /// # Errors
    ///
    /// Returns `ProviderRejected` for an invalid or expired link, otherwise
    /// the usual API errors.
    pub async fn complete_magic_link(
        &self,
        magic_link: &str,
        cancel: &CancellationScope,
    ) -> Result<AuthResult, ApiError> {
        let request = ApiRequest::new(
            Method::PATCH,
            self.url(&self.inner.app_id, &["magic-link", "activate"]),
            "Failed to activate magic link",
        )
        .json(json!({ "magic_link": magic_link }));
        let envelope: AuthResultEnvelope = self.inner.transport.send_json(request, cancel).await?;
        Ok(envelope.auth_result)
    }

    /// Exchange a refresh token for a fresh token pair
    ///
    /// Without a refresh token a new anonymous pair is requested on every call.
    /// Refreshed pairs are served from the client's cache until shortly before
    /// the access token expires.
    ///
    /// # Errors
    ///
    /// Returns the usual API errors.
    pub async fn get_token(
        &self,
        refresh_token: Option<&str>,
        cancel: &CancellationScope,
    ) -> Result<AuthResult, ApiError> {
        let refresh_token = refresh_token.filter(|token| !token.is_empty());
        if let Some(cached) =
            refresh_token.and_then(|token| self.inner.token_cache.get(token, Utc::now()))
        {
            debug!("Serving cached Passage token");
            return Ok(cached);
        }

        let body = refresh_token.map_or_else(|| json!({}), |token| json!({ "refresh_token": token }));
        let request = ApiRequest::new(
            Method::POST,
            self.url(&self.inner.app_id, &["tokens"]),
            "Failed to get token",
        )
        .json(body);
        let envelope: AuthResultEnvelope = self.inner.transport.send_json(request, cancel).await?;

        // Anonymous pairs belong to one caller and are never shared
        if let Some(token) = refresh_token {
            self.inner.token_cache.insert(token, &envelope.auth_result);
        }
        Ok(envelope.auth_result)
    }

    /// Begin a `WebAuthn` login; `identifier` is optional for discoverable credentials
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a malformed identifier, otherwise the
    /// usual API errors.
    pub async fn webauthn_login_start(
        &self,
        identifier: Option<&str>,
        cancel: &CancellationScope,
    ) -> Result<Challenge, ApiError> {
        let body = match identifier {
            Some(identifier) => {
                check_identifier(identifier)?;
                json!({ "identifier": identifier })
            }
            None => json!({}),
        };
        self.ceremony_start(Ceremony::Login, body, cancel).await
    }

    /// Finish a `WebAuthn` login with the browser's assertion
    ///
    /// # Errors
    ///
    /// Returns the usual API errors.
    pub async fn webauthn_login_finish(
        &self,
        payload: &Value,
        cancel: &CancellationScope,
    ) -> Result<AuthResult, ApiError> {
        self.ceremony_finish(Ceremony::Login, payload, cancel).await
    }

    /// Begin registering a new user with a passkey
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a malformed identifier, otherwise the
    /// usual API errors.
    pub async fn webauthn_register_start(
        &self,
        identifier: &str,
        cancel: &CancellationScope,
    ) -> Result<Challenge, ApiError> {
        check_identifier(identifier)?;
        self.ceremony_start(Ceremony::Register, json!({ "identifier": identifier }), cancel)
            .await
    }

    /// Finish a passkey registration with the browser's attestation
    ///
    /// # Errors
    ///
    /// Returns the usual API errors.
    pub async fn webauthn_register_finish(
        &self,
        payload: &Value,
        cancel: &CancellationScope,
    ) -> Result<AuthResult, ApiError> {
        self.ceremony_finish(Ceremony::Register, payload, cancel).await
    }

    async fn ceremony_start(
        &self,
        ceremony: Ceremony,
        body: Value,
        cancel: &CancellationScope,
    ) -> Result<Challenge, ApiError> {
        let request = ApiRequest::new(
            Method::POST,
            self.url(&self.inner.app_id, &[ceremony.as_str(), "webauthn", "start"]),
            format!("Failed to start WebAuthn {}", ceremony.as_str()),
        )
        .json(body);
        self.inner.transport.send_json(request, cancel).await
    }

    async fn ceremony_finish(
        &self,
        ceremony: Ceremony,
        payload: &Value,
        cancel: &CancellationScope,
    ) -> Result<AuthResult, ApiError> {
        let request = ApiRequest::new(
            Method::POST,
            self.url(&self.inner.app_id, &[ceremony.as_str(), "webauthn", "finish"]),
            format!("Failed to finish WebAuthn {}", ceremony.as_str()),
        )
        .json(payload.clone());
        let envelope: AuthResultEnvelope = self.inner.transport.send_json(request, cancel).await?;
        Ok(envelope.auth_result)
    }
}
