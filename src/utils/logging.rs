// Centralized log lines for the handshake and configuration lifecycle.
// Token values are never logged; only presence and length.
use log::{debug, info, warn};

use crate::client::AuthResult;
use crate::config::Configuration;
use crate::handshake::{Credential, FailureReason};

pub struct LoggingHelper;

impl LoggingHelper {
    /// Log the Passage app a client or store was configured for
    pub fn log_passage_configured(config: &Configuration) {
        info!(
            "✅ Passage configured (app {}, scheme {}, callback {})",
            config.app_id, config.sign_in_scheme, config.callback_path
        );
        if config.api_key().is_none() {
            warn!("⚠️  No Passage API key configured - Management API calls will need a bearer token");
        }
    }

    /// Log a configuration swap
    pub fn log_config_reloaded(generation: u64, app_id: &str) {
        info!("🔄 Passage configuration reloaded (generation {generation}, app {app_id})");
    }

    /// Log handshake start
    pub fn log_handshake_start(handshake_id: &str, generation: Option<u64>) {
        match generation {
            Some(generation) => {
                debug!("[{handshake_id}] Handshake started (configuration generation {generation})");
            }
            None => debug!("[{handshake_id}] Handshake started"),
        }
    }

    /// Log the classifier result
    pub fn log_credential_classified(handshake_id: &str, credential: &Credential) {
        debug!("[{handshake_id}] Credential classified as {credential:?}");
    }

    /// Log exchange start
    pub fn log_exchange_start(handshake_id: &str, credential_kind: &str) {
        info!("[{handshake_id}] 🔄 Exchanging {credential_kind} with Passage");
    }

    /// Log exchange summary
    pub fn log_exchange_summary(handshake_id: &str, auth: &AuthResult) {
        debug!(
            "[{handshake_id}] Exchange summary: access_token={} chars, refresh_token={}, redirect_url={}",
            auth.access_token.len(),
            if auth.refresh_token.is_some() { "present" } else { "missing" },
            auth.redirect_url.as_deref().unwrap_or("none")
        );
    }

    /// Log user lookup
    pub fn log_user_lookup(handshake_id: &str, subject: &str) {
        debug!("[{handshake_id}] Resolving Passage user {subject}");
    }

    /// Log ticket issued
    pub fn log_ticket_issued(handshake_id: &str, subject: &str, claim_count: usize) {
        info!("[{handshake_id}] Successfully signed in Passage user {subject} ({claim_count} claims)");
    }

    /// Log a failed handshake; soft failures stay at debug
    pub fn log_handshake_failed(handshake_id: &str, reason: &FailureReason) {
        if reason.is_soft() {
            debug!("[{handshake_id}] Handshake skipped: {reason}");
        } else {
            warn!("[{handshake_id}] ❌ Handshake failed: {reason}");
        }
    }
}
