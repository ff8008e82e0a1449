// Browser-facing relays to the Passage Authentication API
use actix_web::{web, HttpResponse, Result};
use log::{debug, info};
use serde::Deserialize;
use serde_json::{json, Value};

use super::session::SessionStore;
use crate::cancel::CancellationScope;
use crate::client::{ApiError, AuthResult};
use crate::config::ConfigStore;
use crate::utils::cookie_utils::{build_cookie, CookieOptions};
use crate::utils::responses::ResponseBuilder;
use crate::utils::validation::is_valid_identifier;

#[derive(Debug, Deserialize)]
pub struct IdentifierRequest {
    pub identifier: Option<String>,
}

/// Send a magic link to an e-mail address or E.164 phone number
///
/// The link itself is never echoed back; only its id and type are.
///
/// # Errors
/// Never fails; API failures are mapped to error responses
pub async fn request_magic_link(
    body: web::Json<IdentifierRequest>,
    store: web::Data<ConfigStore>,
) -> Result<HttpResponse> {
    let Some(identifier) = body.identifier.as_deref().map(str::trim) else {
        return Ok(ResponseBuilder::missing_field("identifier"));
    };
    if !is_valid_identifier(identifier) {
        return Ok(ResponseBuilder::bad_request()
            .with_error_code("invalid_identifier")
            .with_message("Identifier must be an e-mail address or an E.164 phone number")
            .build());
    }

    let snapshot = store.current();
    let cancel = CancellationScope::new();
    let _guard = cancel.drop_guard();

    match snapshot
        .client
        .authentication()
        .get_magic_link(identifier, &cancel)
        .await
    {
        Ok(link) => {
            info!("📧 Magic link {} sent", link.id);
            Ok(HttpResponse::Ok().json(json!({
                "id": link.id,
                "type": link.link_type,
                "ttl": link.ttl,
            })))
        }
        Err(e) => Ok(api_failure(&e)),
    }
}

/// Start a passkey login; the identifier is optional for discoverable
/// credentials
///
/// # Errors
/// Never fails; API failures are mapped to error responses
pub async fn webauthn_login_start(
    body: Option<web::Json<IdentifierRequest>>,
    store: web::Data<ConfigStore>,
) -> Result<HttpResponse> {
    let identifier = body.and_then(|body| body.into_inner().identifier);
    let snapshot = store.current();
    let cancel = CancellationScope::new();
    let _guard = cancel.drop_guard();

    match snapshot
        .client
        .authentication()
        .webauthn_login_start(identifier.as_deref(), &cancel)
        .await
    {
        Ok(challenge) => Ok(HttpResponse::Ok().json(challenge)),
        Err(e) => Ok(api_failure(&e)),
    }
}

/// Finish a passkey login
///
/// # Errors
/// Never fails; API failures are mapped to error responses
pub async fn webauthn_login_finish(
    body: web::Json<Value>,
    store: web::Data<ConfigStore>,
    sessions: web::Data<SessionStore>,
) -> Result<HttpResponse> {
    let snapshot = store.current();
    let cancel = CancellationScope::new();
    let _guard = cancel.drop_guard();

    match snapshot
        .client
        .authentication()
        .webauthn_login_finish(&body, &cancel)
        .await
    {
        Ok(auth) => Ok(auth_token_response(&auth, &snapshot.config.cookie_name, &sessions)),
        Err(e) => Ok(api_failure(&e)),
    }
}

/// Start a passkey registration for a new identifier
///
/// # Errors
/// Never fails; API failures are mapped to error responses
pub async fn webauthn_register_start(
    body: web::Json<IdentifierRequest>,
    store: web::Data<ConfigStore>,
) -> Result<HttpResponse> {
    let Some(identifier) = body.identifier.as_deref().map(str::trim) else {
        return Ok(ResponseBuilder::missing_field("identifier"));
    };
    let snapshot = store.current();
    let cancel = CancellationScope::new();
    let _guard = cancel.drop_guard();

    match snapshot
        .client
        .authentication()
        .webauthn_register_start(identifier, &cancel)
        .await
    {
        Ok(challenge) => Ok(HttpResponse::Ok().json(challenge)),
        Err(e) => Ok(api_failure(&e)),
    }
}

/// Finish a passkey registration
///
/// # Errors
/// Never fails; API failures are mapped to error responses
pub async fn webauthn_register_finish(
    body: web::Json<Value>,
    store: web::Data<ConfigStore>,
    sessions: web::Data<SessionStore>,
) -> Result<HttpResponse> {
    let snapshot = store.current();
    let cancel = CancellationScope::new();
    let _guard = cancel.drop_guard();

    match snapshot
        .client
        .authentication()
        .webauthn_register_finish(&body, &cancel)
        .await
    {
        Ok(auth) => Ok(auth_token_response(&auth, &snapshot.config.cookie_name, &sessions)),
        Err(e) => Ok(api_failure(&e)),
    }
}

/// Hand the fresh auth token to the browser the way the Passage web component
/// does: in the auth token cookie, so the next callback request completes the
/// handshake with it
fn auth_token_response(auth: &AuthResult, cookie_name: &str, sessions: &SessionStore) -> HttpResponse {
    debug!(
        "Passkey ceremony finished, issuing {cookie_name} cookie ({} chars)",
        auth.access_token.len()
    );
    let options = CookieOptions {
        secure: sessions.cookie_secure(),
        ..CookieOptions::default()
    };
    HttpResponse::Ok()
        .cookie(build_cookie(cookie_name, auth.access_token.clone(), &options))
        .json(json!({ "redirect_url": auth.redirect_url }))
}

fn api_failure(error: &ApiError) -> HttpResponse {
    debug!("Passage relay failed: {error}");
    ResponseBuilder::from_api_error(error)
}
