#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use log::{info, warn};
use passage_auth::{configure_services, ConfigStore, EventHooks, PassageSettings, SessionStore};
use std::time::Duration;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings = PassageSettings::load().context("Failed to load settings")?;
    let config = settings
        .to_configuration()
        .context("Invalid Passage configuration")?;
    let store = web::Data::new(ConfigStore::new(config).context("Failed to build Passage client")?);

    if let Some(interval) = settings.reload_interval() {
        spawn_settings_reload(store.clone(), interval);
    }

    start_server(store, &settings).await
}

/// Start the HTTP server
///
/// # Errors
///
/// Returns an error if:
/// - Server binding fails
/// - Server fails to start
async fn start_server(store: web::Data<ConfigStore>, settings: &PassageSettings) -> anyhow::Result<()> {
    let bind_address = settings.get_bind_address();
    let callback_path = store.current().config.callback_path.clone();
    print_startup_info(&bind_address, &callback_path, settings);

    let sessions = web::Data::new(SessionStore::new(settings.cookies.secure));
    let hooks = web::Data::new(EventHooks::new());

    HttpServer::new(move || {
        let callback_path = callback_path.clone();
        App::new()
            .app_data(store.clone())
            .app_data(sessions.clone())
            .app_data(hooks.clone())
            .wrap(Logger::default())
            .configure(move |cfg| configure_services(cfg, &callback_path))
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {bind_address}"))?
    .run()
    .await
    .context("Server error")
}

/// Periodically re-read settings and swap the configuration when it changed
///
/// Routes are mounted once, so a changed callback path only takes effect on
/// restart.
fn spawn_settings_reload(store: web::Data<ConfigStore>, interval: Duration) {
    info!("🔄 Reloading settings every {}s", interval.as_secs());
    actix_web::rt::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let config = match PassageSettings::reload().and_then(|s| s.to_configuration()) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Settings reload skipped: {e}");
                    continue;
                }
            };
            let mounted_path = store.current().config.callback_path.clone();
            if config.callback_path != mounted_path {
                warn!(
                    "Callback path changed to {} - restart required, still serving {mounted_path}",
                    config.callback_path
                );
            }
            if let Err(e) = store.update(config) {
                warn!("Settings reload rejected: {e}");
            }
        }
    });
}

fn print_startup_info(bind_address: &str, callback_path: &str, settings: &PassageSettings) {
    println!("Starting Passage authentication host on http://{bind_address}");
    println!("Passage app: {}", settings.passage.app_id);
    println!();
    println!("Passage endpoints:");
    println!("  GET  {callback_path} - Magic link / auth token callback");
    println!("  POST /auth/passage/magic-link - Send a magic link");
    println!("  POST /auth/passage/webauthn/login/start|finish - Passkey login");
    println!("  POST /auth/passage/webauthn/register/start|finish - Passkey registration");
    println!("  GET  /auth/passage/userinfo - Current session claims");
    println!("  GET|POST /auth/passage/sign_out - Clear session");
    println!();
    println!("System endpoints:");
    println!("  GET  /ping - Health check");
}
