// End-to-end handshakes against the mock Passage API
mod common;

use async_trait::async_trait;
use common::{auth_result_body, jwt, jwt_for, user_body, MockPassage};
use passage_auth::handshake::{SignInError, Stage};
use passage_auth::{
    CancellationScope, ConfigStore, EventHooks, FailureReason, HandshakeStateMachine,
    InboundRequest, SignIn, Ticket,
};
use serde_json::json;
use std::sync::Mutex;

#[derive(Default)]
struct RecordingSignIn {
    tickets: Mutex<Vec<Ticket>>,
}

#[async_trait]
impl SignIn for RecordingSignIn {
    async fn sign_in(&self, ticket: &Ticket) -> Result<(), SignInError> {
        self.tickets.lock().unwrap().push(ticket.clone());
        Ok(())
    }
}

fn machine(mock: &MockPassage, app_id: &str) -> HandshakeStateMachine {
    let store = ConfigStore::new(mock.configuration(app_id).with_api_key("server-key")).unwrap();
    HandshakeStateMachine::from_snapshot(&store.current(), EventHooks::new())
}

#[actix_web::test]
async fn test_magic_link_produces_ticket() {
    let mock = MockPassage::start().await;
    let token = jwt_for("u1");
    mock.respond(
        "PATCH",
        "/apps/app1/magic-link/activate/",
        200,
        auth_result_body(&token),
    );
    mock.respond("GET", "/apps/app1/users/u1/", 200, user_body("u1", "a@b.com"));

    let sign_in = RecordingSignIn::default();
    let request = InboundRequest::new().with_query("psg_magic_link", "abc123");
    let outcome = machine(&mock, "app1")
        .run(&request, &sign_in, &CancellationScope::new())
        .await;

    let ticket = outcome.result.expect("handshake should succeed");
    assert_eq!(ticket.principal.find("NameIdentifier"), Some("u1"));
    assert_eq!(ticket.principal.find("Email"), Some("a@b.com"));
    assert_eq!(ticket.redirect(), Some("/dashboard"));
    assert_eq!(outcome.trace.last(), Some(&Stage::Completed));
    assert_eq!(sign_in.tickets.lock().unwrap().len(), 1);

    let activate = mock.requests_to("magic-link/activate");
    assert_eq!(activate.len(), 1);
    assert_eq!(activate[0].body, Some(json!({ "magic_link": "abc123" })));
    assert!(activate[0].authorization.is_none());

    // User lookup is authorised with the freshly issued access token
    let lookup = mock.requests_to("/users/u1/");
    assert_eq!(lookup.len(), 1);
    assert_eq!(lookup[0].authorization, Some(format!("Bearer {token}")));

    mock.stop().await;
}

#[actix_web::test]
async fn test_verify_link_uses_activation_exchange() {
    let mock = MockPassage::start().await;
    mock.respond(
        "PATCH",
        "/apps/app1/magic-link/activate/",
        200,
        auth_result_body(&jwt_for("u2")),
    );
    mock.respond("GET", "/apps/app1/users/u2/", 200, user_body("u2", "v@b.com"));

    let request = InboundRequest::new().with_query("psg_verify_link", "verify-1");
    let outcome = machine(&mock, "app1")
        .run(&request, &RecordingSignIn::default(), &CancellationScope::new())
        .await;

    assert_eq!(outcome.result.unwrap().subject(), Some("u2"));
    assert_eq!(
        mock.requests_to("magic-link/activate")[0].body,
        Some(json!({ "magic_link": "verify-1" }))
    );
    mock.stop().await;
}

#[actix_web::test]
async fn test_no_credential_makes_no_network_call() {
    let mock = MockPassage::start().await;
    let sign_in = RecordingSignIn::default();

    let outcome = machine(&mock, "app1")
        .run(
            &InboundRequest::new().with_query("unrelated", "1"),
            &sign_in,
            &CancellationScope::new(),
        )
        .await;

    assert_eq!(outcome.result, Err(FailureReason::NoCredential));
    assert_eq!(outcome.trace, vec![Stage::Start, Stage::Failed]);
    assert!(mock.requests().is_empty());
    assert!(sign_in.tickets.lock().unwrap().is_empty());
    mock.stop().await;
}

#[actix_web::test]
async fn test_rejected_exchange_carries_provider_message() {
    let mock = MockPassage::start().await;
    mock.respond(
        "PATCH",
        "/apps/app1/magic-link/activate/",
        401,
        json!({ "error": "invalid token" }),
    );

    let outcome = machine(&mock, "app1")
        .run(
            &InboundRequest::new().with_query("psg_magic_link", "stale"),
            &RecordingSignIn::default(),
            &CancellationScope::new(),
        )
        .await;

    assert_eq!(
        outcome.result,
        Err(FailureReason::ProviderRejected {
            status: Some(401),
            message: "invalid token".to_string(),
        })
    );
    assert!(mock.requests_to("/users/").is_empty());
    mock.stop().await;
}

#[actix_web::test]
async fn test_missing_user_is_distinct_from_rejection() {
    let mock = MockPassage::start().await;
    mock.respond(
        "PATCH",
        "/apps/app1/magic-link/activate/",
        200,
        auth_result_body(&jwt_for("ghost")),
    );
    mock.respond(
        "GET",
        "/apps/app1/users/ghost/",
        404,
        json!({ "error": "user not found" }),
    );

    let outcome = machine(&mock, "app1")
        .run(
            &InboundRequest::new().with_query("psg_magic_link", "abc"),
            &RecordingSignIn::default(),
            &CancellationScope::new(),
        )
        .await;

    assert_eq!(
        outcome.result,
        Err(FailureReason::UserNotFound("ghost".to_string()))
    );
    mock.stop().await;
}

#[actix_web::test]
async fn test_bearer_cookie_skips_exchange() {
    let mock = MockPassage::start().await;
    let token = jwt_for("u3");
    mock.respond("GET", "/apps/app1/users/u3/", 200, user_body("u3", "c@b.com"));

    let outcome = machine(&mock, "app1")
        .run(
            &InboundRequest::new().with_cookie("psg_auth_token", &token),
            &RecordingSignIn::default(),
            &CancellationScope::new(),
        )
        .await;

    assert_eq!(outcome.result.unwrap().subject(), Some("u3"));
    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].authorization, Some(format!("Bearer {token}")));
    mock.stop().await;
}

#[actix_web::test]
async fn test_magic_link_wins_over_cookie() {
    let mock = MockPassage::start().await;
    mock.respond(
        "PATCH",
        "/apps/app1/magic-link/activate/",
        200,
        auth_result_body(&jwt_for("from-link")),
    );
    mock.respond(
        "GET",
        "/apps/app1/users/from-link/",
        200,
        user_body("from-link", "l@b.com"),
    );

    let request = InboundRequest::new()
        .with_query("psg_magic_link", "abc")
        .with_cookie("psg_auth_token", &jwt_for("from-cookie"));
    let outcome = machine(&mock, "app1")
        .run(&request, &RecordingSignIn::default(), &CancellationScope::new())
        .await;

    assert_eq!(outcome.result.unwrap().subject(), Some("from-link"));
    assert!(mock.requests_to("from-cookie").is_empty());
    mock.stop().await;
}

#[actix_web::test]
async fn test_tampered_token_is_not_rejected() {
    let mock = MockPassage::start().await;
    // Well-formed but signed by nobody
    let forged = jwt(&json!({ "sub": "u4" }));
    mock.respond("GET", "/apps/app1/users/u4/", 200, user_body("u4", "d@b.com"));

    let outcome = machine(&mock, "app1")
        .run(
            &InboundRequest::new().with_cookie("psg_auth_token", &forged),
            &RecordingSignIn::default(),
            &CancellationScope::new(),
        )
        .await;

    assert_eq!(outcome.result.unwrap().subject(), Some("u4"));
    mock.stop().await;
}

#[actix_web::test]
async fn test_unreachable_provider() {
    let store = ConfigStore::new(
        passage_auth::Configuration::new("app1")
            .with_base_urls("http://127.0.0.1:9/v1", "http://127.0.0.1:9/v1"),
    )
    .unwrap();
    let machine = HandshakeStateMachine::from_snapshot(&store.current(), EventHooks::new());

    let outcome = machine
        .run(
            &InboundRequest::new().with_query("psg_magic_link", "abc"),
            &RecordingSignIn::default(),
            &CancellationScope::new(),
        )
        .await;

    assert!(matches!(outcome.result, Err(FailureReason::Unreachable(_))));
}

#[actix_web::test]
async fn test_cancellation_aborts_outstanding_call() {
    let mock = MockPassage::start().await;
    mock.respond(
        "PATCH",
        "/apps/app1/magic-link/activate/",
        200,
        auth_result_body(&jwt_for("u5")),
    );
    mock.respond("GET", "/apps/app1/users/u5/", 200, user_body("u5", "e@b.com"));
    let gate = mock.gate("magic-link/activate");

    let machine = machine(&mock, "app1");
    let cancel = CancellationScope::new();
    let canceller = cancel.clone();
    let arrived = gate.arrived.clone();
    actix_web::rt::spawn(async move {
        arrived.notified().await;
        canceller.cancel();
    });

    let sign_in = RecordingSignIn::default();
    let outcome = machine
        .run(
            &InboundRequest::new().with_query("psg_magic_link", "abc"),
            &sign_in,
            &cancel,
        )
        .await;

    assert_eq!(outcome.result, Err(FailureReason::Cancelled));
    assert!(mock.requests_to("/users/").is_empty());
    assert!(sign_in.tickets.lock().unwrap().is_empty());

    gate.release.notify_one();
    mock.stop().await;
}

#[actix_web::test]
async fn test_user_with_null_collections_resolves() {
    let mock = MockPassage::start().await;
    let token = jwt_for("u6");
    mock.respond(
        "GET",
        "/apps/app1/users/u6/",
        200,
        json!({ "user": {
            "id": "u6",
            "email": "f@b.com",
            "status": "active",
            "user_metadata": null,
            "webauthn_types": null
        } }),
    );

    let outcome = machine(&mock, "app1")
        .run(
            &InboundRequest::new().with_cookie("psg_auth_token", &token),
            &RecordingSignIn::default(),
            &CancellationScope::new(),
        )
        .await;

    let ticket = outcome.result.expect("user with null collections should resolve");
    assert_eq!(ticket.principal.find("Email"), Some("f@b.com"));
    mock.stop().await;
}
