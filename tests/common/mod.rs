// In-process stand-in for the Passage Authentication and Management APIs
#![allow(dead_code)]

use actix_web::{dev::ServerHandle, web, App, HttpRequest, HttpResponse, HttpServer};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use passage_auth::Configuration;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

/// Holds requests whose path contains `path_fragment` until released
pub struct Gate {
    path_fragment: String,
    pub arrived: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[derive(Default)]
struct MockState {
    requests: Mutex<Vec<RecordedRequest>>,
    routes: Mutex<HashMap<(String, String), (u16, String)>>,
    gate: Mutex<Option<Arc<Gate>>>,
}

pub struct MockPassage {
    state: web::Data<MockState>,
    pub base_url: String,
    handle: ServerHandle,
}

impl MockPassage {
    /// Start the mock on an ephemeral port; must run inside an actix system
    pub async fn start() -> Self {
        let state = web::Data::new(MockState::default());
        let app_state = state.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(app_state.clone())
                .default_service(web::to(handle_request))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("bind mock server");
        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        Self {
            state,
            base_url: format!("http://{addr}/v1"),
            handle,
        }
    }

    /// A configuration pointing both API bases at this mock
    pub fn configuration(&self, app_id: &str) -> Configuration {
        Configuration::new(app_id).with_base_urls(self.base_url.clone(), self.base_url.clone())
    }

    /// Serve `body` with `status` for `method` + `path` (path below `/v1`)
    pub fn respond(&self, method: &str, path: &str, status: u16, body: Value) {
        self.respond_raw(method, path, status, &body.to_string());
    }

    pub fn respond_raw(&self, method: &str, path: &str, status: u16, body: &str) {
        self.state.routes.lock().unwrap().insert(
            (method.to_string(), format!("/v1{path}")),
            (status, body.to_string()),
        );
    }

    /// Hold every request whose path contains `path_fragment`
    pub fn gate(&self, path_fragment: &str) -> Arc<Gate> {
        let gate = Arc::new(Gate {
            path_fragment: path_fragment.to_string(),
            arrived: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        });
        *self.state.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path_fragment: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.path.contains(path_fragment))
            .collect()
    }

    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}

async fn handle_request(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<MockState>,
) -> HttpResponse {
    let recorded = RecordedRequest {
        method: req.method().to_string(),
        path: req.path().to_string(),
        authorization: req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).ok(),
    };
    state.requests.lock().unwrap().push(recorded.clone());

    let gate = state
        .gate
        .lock()
        .unwrap()
        .as_ref()
        .filter(|gate| recorded.path.contains(&gate.path_fragment))
        .cloned();
    if let Some(gate) = gate {
        gate.arrived.notify_one();
        gate.release.notified().await;
    }

    let route = state
        .routes
        .lock()
        .unwrap()
        .get(&(recorded.method.clone(), recorded.path.clone()))
        .cloned();
    match route {
        Some((status, body)) => HttpResponse::build(
            actix_web::http::StatusCode::from_u16(status).expect("valid status"),
        )
        .content_type("application/json")
        .body(body),
        None => HttpResponse::NotFound().json(json!({ "error": "route not mocked" })),
    }
}

/// An unsigned compact JWT with the given claims
pub fn jwt(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

pub fn jwt_for(subject: &str) -> String {
    let exp = chrono::Utc::now().timestamp() + 3600;
    jwt(&json!({ "sub": subject, "exp": exp }))
}

pub fn auth_result_body(access_token: &str) -> Value {
    json!({
        "auth_result": {
            "auth_token": access_token,
            "refresh_token": "refresh-1",
            "refresh_token_expiration": 1_900_000_000,
            "redirect_url": "/dashboard"
        }
    })
}

pub fn user_body(id: &str, email: &str) -> Value {
    json!({
        "user": {
            "id": id,
            "email": email,
            "email_verified": true,
            "phone": "",
            "status": "active",
            "created_at": "2024-01-02T03:04:05Z",
            "updated_at": "2024-01-03T03:04:05Z",
            "last_login_at": "2024-01-04T03:04:05Z",
            "login_count": 3,
            "user_metadata": {},
            "webauthn": false,
            "webauthn_types": []
        }
    })
}
