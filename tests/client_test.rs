// PassageClient requests and error classification against the mock API
mod common;

use common::{auth_result_body, jwt, user_body, MockPassage};
use passage_auth::client::{CreateUser, UpdateUser};
use passage_auth::{ApiErrorKind, CancellationScope, PassageClient};
use serde_json::json;

#[actix_web::test]
async fn test_invalid_identifier_never_reaches_network() {
    let mock = MockPassage::start().await;
    let client = PassageClient::new(&mock.configuration("app1")).unwrap();
    let cancel = CancellationScope::new();

    for identifier in ["", "not-an-email", "12345", "+1", "a@", "@b.com"] {
        let err = client
            .authentication()
            .get_magic_link(identifier, &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::InvalidArgument, "{identifier}");
    }
    assert!(mock.requests().is_empty());
    mock.stop().await;
}

#[actix_web::test]
async fn test_valid_identifiers_are_sent() {
    let mock = MockPassage::start().await;
    mock.respond(
        "POST",
        "/apps/app1/login/magic-link/",
        201,
        json!({ "magic_link": { "id": "ml1", "identifier": "a@b.com", "type": "login", "ttl": 300 } }),
    );
    let client = PassageClient::new(&mock.configuration("app1")).unwrap();
    let cancel = CancellationScope::new();

    let link = client
        .authentication()
        .get_magic_link("a@b.com", &cancel)
        .await
        .unwrap();
    assert_eq!(link.id, "ml1");

    client
        .authentication()
        .get_magic_link("+15555550100", &cancel)
        .await
        .unwrap();

    let sent = mock.requests_to("login/magic-link");
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].method, "POST");
    assert_eq!(sent[0].body, Some(json!({ "identifier": "a@b.com" })));
    assert_eq!(sent[1].body, Some(json!({ "identifier": "+15555550100" })));
    mock.stop().await;
}

#[actix_web::test]
async fn test_get_user_is_idempotent() {
    let mock = MockPassage::start().await;
    mock.respond("GET", "/apps/app1/users/u1/", 200, user_body("u1", "a@b.com"));
    let client = PassageClient::new(&mock.configuration("app1")).unwrap();
    let cancel = CancellationScope::new();

    let first = client
        .management()
        .get_user("u1", Some("bearer-1"), &cancel)
        .await
        .unwrap();
    let second = client
        .management()
        .get_user("u1", Some("bearer-1"), &cancel)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.email.as_deref(), Some("a@b.com"));
    assert!(first.created_at.is_some());
    let requests = mock.requests_to("/users/u1/");
    assert_eq!(requests.len(), 2);
    assert!(requests
        .iter()
        .all(|r| r.authorization.as_deref() == Some("Bearer bearer-1")));
    mock.stop().await;
}

#[actix_web::test]
async fn test_management_requires_a_bearer() {
    let mock = MockPassage::start().await;
    let client = PassageClient::new(&mock.configuration("app1")).unwrap();

    let err = client
        .management()
        .list_users(&CancellationScope::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Fatal);
    assert!(mock.requests().is_empty());
    mock.stop().await;
}

#[actix_web::test]
async fn test_management_uses_api_key() {
    let mock = MockPassage::start().await;
    mock.respond(
        "GET",
        "/apps/app1/users/",
        200,
        json!({ "users": [ { "id": "u1" }, { "id": "u2" } ] }),
    );
    mock.respond("DELETE", "/apps/app1/users/u1/tokens/", 200, json!({}));
    let client =
        PassageClient::new(&mock.configuration("app1").with_api_key("server-key")).unwrap();
    let cancel = CancellationScope::new();

    let users = client.management().list_users(&cancel).await.unwrap();
    assert_eq!(users.len(), 2);
    client
        .management()
        .revoke_user_refresh_tokens("u1", &cancel)
        .await
        .unwrap();

    for request in mock.requests() {
        assert_eq!(request.authorization.as_deref(), Some("Bearer server-key"));
    }
    assert_eq!(mock.requests_to("/tokens/")[0].method, "DELETE");
    mock.stop().await;
}

#[actix_web::test]
async fn test_user_writes() {
    let mock = MockPassage::start().await;
    mock.respond(
        "POST",
        "/apps/app1/users/",
        201,
        user_body("new", "new@b.com"),
    );
    mock.respond(
        "PATCH",
        "/apps/app1/users/new/",
        200,
        user_body("new", "changed@b.com"),
    );
    mock.respond("DELETE", "/apps/app1/users/new/", 200, json!({}));
    let client = PassageClient::new(&mock.configuration("app1").with_api_key("k")).unwrap();
    let cancel = CancellationScope::new();

    let err = client
        .management()
        .create_user(&CreateUser::default(), &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::InvalidArgument);
    assert!(mock.requests().is_empty());

    let created = client
        .management()
        .create_user(
            &CreateUser {
                email: Some("new@b.com".to_string()),
                ..CreateUser::default()
            },
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(created.id, "new");

    let updated = client
        .management()
        .update_user(
            "new",
            &UpdateUser {
                email: Some("changed@b.com".to_string()),
                ..UpdateUser::default()
            },
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(updated.email.as_deref(), Some("changed@b.com"));

    client.management().delete_user("new", &cancel).await.unwrap();

    let methods: Vec<String> = mock.requests().into_iter().map(|r| r.method).collect();
    assert_eq!(methods, vec!["POST", "PATCH", "DELETE"]);
    mock.stop().await;
}

#[actix_web::test]
async fn test_error_bodies_are_classified() {
    let mock = MockPassage::start().await;
    mock.respond("GET", "/apps/app1/users/missing/", 404, json!({ "error": "no such user" }));
    mock.respond_raw("GET", "/apps/app1/users/broken/", 502, "upstream exploded");
    mock.respond("GET", "/apps/app1/users/garbled/", 200, json!({ "unexpected": true }));
    let client = PassageClient::new(&mock.configuration("app1").with_api_key("k")).unwrap();
    let cancel = CancellationScope::new();
    let management = client.management();

    let not_found = management.get_user("missing", None, &cancel).await.unwrap_err();
    assert_eq!(not_found.kind, ApiErrorKind::NotFound);
    assert_eq!(not_found.status, Some(404));
    assert_eq!(not_found.provider_message.as_deref(), Some("no such user"));

    let rejected = management.get_user("broken", None, &cancel).await.unwrap_err();
    assert_eq!(rejected.kind, ApiErrorKind::ProviderRejected);
    assert_eq!(rejected.provider_message.as_deref(), Some("upstream exploded"));

    let fatal = management.get_user("garbled", None, &cancel).await.unwrap_err();
    assert_eq!(fatal.kind, ApiErrorKind::Fatal);
    mock.stop().await;
}

#[actix_web::test]
async fn test_token_refresh_is_cached_until_near_expiry() {
    let mock = MockPassage::start().await;
    let exp = chrono::Utc::now().timestamp() + 3600;
    mock.respond(
        "POST",
        "/apps/app1/tokens/",
        200,
        auth_result_body(&jwt(&json!({ "sub": "u1", "exp": exp }))),
    );
    let client = PassageClient::new(&mock.configuration("app1")).unwrap();
    let cancel = CancellationScope::new();

    let first = client
        .authentication()
        .get_token(Some("refresh-1"), &cancel)
        .await
        .unwrap();
    let second = client
        .authentication()
        .get_token(Some("refresh-1"), &cancel)
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(mock.requests_to("/tokens/").len(), 1);
    assert_eq!(
        mock.requests_to("/tokens/")[0].body,
        Some(json!({ "refresh_token": "refresh-1" }))
    );

    // A client rebuilt from the same configuration starts with an empty cache
    let rebuilt = PassageClient::new(&mock.configuration("app1")).unwrap();
    rebuilt
        .authentication()
        .get_token(Some("refresh-1"), &cancel)
        .await
        .unwrap();
    assert_eq!(mock.requests_to("/tokens/").len(), 2);
    mock.stop().await;
}

#[actix_web::test]
async fn test_anonymous_tokens_are_never_shared() {
    let mock = MockPassage::start().await;
    let exp = chrono::Utc::now().timestamp() + 3600;
    mock.respond(
        "POST",
        "/apps/app1/tokens/",
        200,
        auth_result_body(&jwt(&json!({ "sub": "anon", "exp": exp }))),
    );
    let client = PassageClient::new(&mock.configuration("app1")).unwrap();
    let cancel = CancellationScope::new();

    client.authentication().get_token(None, &cancel).await.unwrap();
    client.authentication().get_token(None, &cancel).await.unwrap();
    client
        .authentication()
        .get_token(Some(""), &cancel)
        .await
        .unwrap();

    let sent = mock.requests_to("/tokens/");
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|r| r.body == Some(json!({}))));
    assert!(sent.iter().all(|r| r.authorization.is_none()));
    mock.stop().await;
}

#[actix_web::test]
async fn test_webauthn_payloads_are_relayed_verbatim() {
    let mock = MockPassage::start().await;
    let challenge = json!({ "handshake": { "id": "h1", "challenge": { "publicKey": { "rpId": "example.com" } } } });
    mock.respond("POST", "/apps/app1/login/webauthn/start/", 200, challenge.clone());
    mock.respond(
        "POST",
        "/apps/app1/login/webauthn/finish/",
        200,
        auth_result_body("opaque-token"),
    );
    let client = PassageClient::new(&mock.configuration("app1")).unwrap();
    let cancel = CancellationScope::new();

    let started = client
        .authentication()
        .webauthn_login_start(None, &cancel)
        .await
        .unwrap();
    assert_eq!(started.0, challenge);

    let assertion = json!({ "handshake_id": "h1", "handshake_response": { "rawId": "abc" } });
    let auth = client
        .authentication()
        .webauthn_login_finish(&assertion, &cancel)
        .await
        .unwrap();
    assert_eq!(auth.access_token, "opaque-token");
    assert_eq!(mock.requests_to("webauthn/finish")[0].body, Some(assertion));
    mock.stop().await;
}

#[actix_web::test]
async fn test_app_lookups() {
    let mock = MockPassage::start().await;
    mock.respond(
        "GET",
        "/apps/app1/",
        200,
        json!({ "app": { "id": "app1", "name": "Demo" } }),
    );
    mock.respond("GET", "/apps/other/", 404, json!({ "error": "app not found" }));
    mock.respond(
        "GET",
        "/apps/",
        200,
        json!({ "apps": [ { "id": "app1", "name": "Demo" } ] }),
    );
    let client = PassageClient::new(&mock.configuration("app1").with_api_key("k")).unwrap();
    let cancel = CancellationScope::new();

    let public = client.authentication().get_app(None, &cancel).await.unwrap();
    assert_eq!(public.name, "Demo");
    let missing = client
        .authentication()
        .get_app(Some("other"), &cancel)
        .await
        .unwrap_err();
    assert_eq!(missing.kind, ApiErrorKind::NotFound);

    let admin = client.management().get_app(&cancel).await.unwrap();
    assert_eq!(admin.id, "app1");
    let apps = client.management().list_apps(&cancel).await.unwrap();
    assert_eq!(apps.len(), 1);

    let requests = mock.requests();
    assert!(requests[0].authorization.is_none());
    assert!(requests[1].authorization.is_none());
    assert_eq!(requests[2].authorization.as_deref(), Some("Bearer k"));
    assert_eq!(requests[3].authorization.as_deref(), Some("Bearer k"));
    mock.stop().await;
}

#[actix_web::test]
async fn test_devices_keys_and_events() {
    let mock = MockPassage::start().await;
    mock.respond(
        "GET",
        "/apps/app1/users/u1/devices/",
        200,
        json!({ "devices": [ { "id": "d1", "friendly_name": "Laptop" } ] }),
    );
    mock.respond("DELETE", "/apps/app1/users/u1/devices/d1/", 200, json!({}));
    mock.respond(
        "GET",
        "/apps/app1/api-keys/",
        200,
        json!({ "api_keys": [ { "id": "k1", "name": "server" } ] }),
    );
    mock.respond(
        "GET",
        "/apps/app1/events/",
        200,
        json!({ "events": [ { "type": "login", "user_id": "u1" } ] }),
    );
    let client = PassageClient::new(&mock.configuration("app1").with_api_key("k")).unwrap();
    let cancel = CancellationScope::new();
    let management = client.management();

    let devices = management.list_user_devices("u1", &cancel).await.unwrap();
    assert_eq!(devices[0].friendly_name.as_deref(), Some("Laptop"));
    management.delete_user_device("u1", "d1", &cancel).await.unwrap();

    let keys = management.list_api_keys(&cancel).await.unwrap();
    assert_eq!(keys[0].name, "server");
    let events = management.list_events(&cancel).await.unwrap();
    assert_eq!(events[0]["type"], "login");

    assert_eq!(mock.requests_to("/devices/d1/")[0].method, "DELETE");
    mock.stop().await;
}
