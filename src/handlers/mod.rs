// HTTP request handlers for the Passage host
pub mod callback;
pub mod health;
pub mod passage;
pub mod session;


use actix_web::web;

pub use callback::passage_callback;
pub use health::health;
pub use passage::{
    request_magic_link, webauthn_login_finish, webauthn_login_start, webauthn_register_finish,
    webauthn_register_start,
};
pub use session::{passage_sign_out, passage_userinfo, SessionSignIn, SessionStore};

/// Mount every route; the callback lives at the configured path
///
/// Expects `ConfigStore`, `SessionStore` and `EventHooks` as app data.
pub fn configure_services(cfg: &mut web::ServiceConfig, callback_path: &str) {
    cfg.route(callback_path, web::get().to(passage_callback))
        .route("/auth/passage/magic-link", web::post().to(request_magic_link))
        .route(
            "/auth/passage/webauthn/login/start",
            web::post().to(webauthn_login_start),
        )
        .route(
            "/auth/passage/webauthn/login/finish",
            web::post().to(webauthn_login_finish),
        )
        .route(
            "/auth/passage/webauthn/register/start",
            web::post().to(webauthn_register_start),
        )
        .route(
            "/auth/passage/webauthn/register/finish",
            web::post().to(webauthn_register_finish),
        )
        .route("/auth/passage/userinfo", web::get().to(passage_userinfo))
        .route("/auth/passage/sign_out", web::get().to(passage_sign_out))
        .route("/auth/passage/sign_out", web::post().to(passage_sign_out))
        .route("/ping", web::get().to(health));
}
