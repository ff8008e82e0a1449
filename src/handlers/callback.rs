// Passage callback handler: runs one handshake per request
use actix_web::{web, HttpRequest, HttpResponse, Result};
use log::{debug, warn};

use super::session::{SessionSignIn, SessionStore};
use crate::cancel::CancellationScope;
use crate::config::ConfigStore;
use crate::handshake::{EventHooks, FailureReason, HandshakeStateMachine, InboundRequest};
use crate::utils::responses::ResponseBuilder;

/// Callback endpoint mounted at the configured callback path
///
/// Success redirects to the ticket's `.redirect` (or `/`) with a session
/// cookie. A request without any Passage credential gets a 401; every other
/// failure redirects to `/?error=<code>`.
///
/// The handshake is bound to the snapshot current when the request arrived.
/// Dropping the request future (client disconnect) cancels any outstanding
/// Passage call.
///
/// # Errors
/// Never fails; failures are expressed as responses
pub async fn passage_callback(
    req: HttpRequest,
    store: web::Data<ConfigStore>,
    sessions: web::Data<SessionStore>,
    hooks: web::Data<EventHooks>,
) -> Result<HttpResponse> {
    let snapshot = store.current();
    let machine = HandshakeStateMachine::from_snapshot(&snapshot, hooks.get_ref().clone());

    let cancel = CancellationScope::new();
    let _guard = cancel.drop_guard();

    let inbound = InboundRequest::from_http_request(&req);
    let sign_in = SessionSignIn::new(&sessions);
    let outcome = machine.run(&inbound, &sign_in, &cancel).await;

    match outcome.result {
        Ok(ticket) => {
            let Some(session_id) = sign_in.session_id() else {
                warn!("[{}] Handshake completed without a session", outcome.id);
                return Ok(ResponseBuilder::redirect("/").with_error("sign_in_rejected").build());
            };
            let location = post_auth_location(ticket.redirect());
            debug!("[{}] Redirecting signed-in user to {location}", outcome.id);
            Ok(ResponseBuilder::redirect(location)
                .with_cookie(sessions.session_cookie(&session_id))
                .build())
        }
        Err(FailureReason::NoCredential) => Ok(ResponseBuilder::unauthorized()
            .with_error_code(FailureReason::NoCredential.code())
            .with_message("No Passage credential found on the request")
            .build()),
        Err(reason) => Ok(ResponseBuilder::redirect("/")
            .with_cookie(sessions.expired_cookie())
            .with_error(reason.code())
            .build()),
    }
}

/// Only same-origin relative paths are followed after sign-in
fn post_auth_location(redirect: Option<&str>) -> &str {
    match redirect {
        Some(location) if is_relative_path(location) => location,
        Some(location) => {
            warn!("Ignoring non-relative post-auth redirect: {location}");
            "/"
        }
        None => "/",
    }
}

fn is_relative_path(location: &str) -> bool {
    location.starts_with('/')
        && !location.starts_with("//")
        && !location.contains('\\')
        && !location.contains(':')
        && !location.chars().any(char::is_control)
}
