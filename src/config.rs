//! Immutable Passage configuration and the hot-swappable store holding it
//!
//! A `Configuration` is never mutated once built. `ConfigStore::update` builds
//! a fresh `PassageClient` from the new value and swaps the pair in a single
//! pointer replacement. Handshakes call `current()` once at start and keep the
//! returned `Arc` for their whole lifetime, so a reload never changes the app
//! id, API key or base URLs an in-flight handshake is using.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use thiserror::Error;

use crate::client::PassageClient;
use crate::utils::logging::LoggingHelper;

pub const DEFAULT_SIGN_IN_SCHEME: &str = "Passage";
pub const DEFAULT_CALLBACK_PATH: &str = "/signin-passage";
pub const DEFAULT_AUTH_API_URL: &str = "https://auth.passage.id/v1";
pub const DEFAULT_MANAGEMENT_API_URL: &str = "https://api.passage.id/v1";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Passage app id is required")]
    MissingAppId,
    #[error("Invalid {name} '{url}': {reason}")]
    InvalidUrl {
        name: &'static str,
        url: String,
        reason: String,
    },
    #[error("Callback path must start with '/': '{0}'")]
    InvalidCallbackPath(String),
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
    #[error("Failed to load settings: {0}")]
    Load(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub app_id: String,
    /// Required for Management API calls that have no bearer of their own
    pub api_key: Option<String>,
    pub sign_in_scheme: String,
    /// Copy the issued tokens into the ticket properties
    pub save_tokens: bool,
    pub callback_path: String,
    /// Cookie the web component stores its auth token in
    pub cookie_name: String,
    pub auth_api_url: String,
    pub management_api_url: String,
    pub request_timeout: Duration,
}

impl Configuration {
    /// Configuration for `app_id` with every other field at its default
    #[must_use]
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            api_key: None,
            sign_in_scheme: DEFAULT_SIGN_IN_SCHEME.to_string(),
            save_tokens: false,
            callback_path: DEFAULT_CALLBACK_PATH.to_string(),
            cookie_name: crate::utils::cookie_utils::AUTH_TOKEN_COOKIE.to_string(),
            auth_api_url: DEFAULT_AUTH_API_URL.to_string(),
            management_api_url: DEFAULT_MANAGEMENT_API_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Point both API bases at one host, e.g. a local mock
    #[must_use]
    pub fn with_base_urls(
        mut self,
        auth_api_url: impl Into<String>,
        management_api_url: impl Into<String>,
    ) -> Self {
        self.auth_api_url = auth_api_url.into();
        self.management_api_url = management_api_url.into();
        self
    }

    /// Check the values a client cannot work without
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The app id is empty
    /// - Either API base URL does not parse as an absolute http(s) URL
    /// - The callback path is not absolute
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_id.trim().is_empty() {
            return Err(ConfigError::MissingAppId);
        }
        validate_base_url("auth_api_url", &self.auth_api_url)?;
        validate_base_url("management_api_url", &self.management_api_url)?;
        if !self.callback_path.starts_with('/') {
            return Err(ConfigError::InvalidCallbackPath(self.callback_path.clone()));
        }
        Ok(())
    }

    /// The API key with blank values treated as absent
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.trim().is_empty())
    }
}

fn validate_base_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        name,
        url: value.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidUrl {
            name,
            url: value.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

/// A configuration together with the client built from it
#[derive(Debug)]
pub struct ClientSnapshot {
    pub config: Arc<Configuration>,
    pub client: PassageClient,
    /// Incremented on every swap
    pub generation: u64,
}

/// Holder of the current `ClientSnapshot`
///
/// The lock only guards the pointer swap; it is never held across an await.
#[derive(Debug)]
pub struct ConfigStore {
    current: RwLock<Arc<ClientSnapshot>>,
    http: reqwest::Client,
}

impl ConfigStore {
    /// Build a store for an initial configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: Configuration) -> Result<Self, ConfigError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("passage-auth/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        LoggingHelper::log_passage_configured(&config);
        let snapshot = ClientSnapshot {
            client: PassageClient::with_http_client(&config, http.clone()),
            config: Arc::new(config),
            generation: 0,
        };
        Ok(Self {
            current: RwLock::new(Arc::new(snapshot)),
            http,
        })
    }

    /// The snapshot new handshakes should use
    #[must_use]
    pub fn current(&self) -> Arc<ClientSnapshot> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*current)
    }

    /// Swap in a new configuration
    ///
    /// Returns `Ok(false)` without touching the store when `config` equals the
    /// current one. Otherwise a new client is built (sharing the connection
    /// pool) and replaces the old snapshot; holders of the old snapshot are
    /// unaffected.
    ///
    /// # Errors
    ///
    /// Returns an error if the new configuration is invalid; the current
    /// snapshot stays in place.
    pub fn update(&self, config: Configuration) -> Result<bool, ConfigError> {
        config.validate()?;

        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if *current.config == config {
            return Ok(false);
        }

        let generation = current.generation + 1;
        LoggingHelper::log_config_reloaded(generation, &config.app_id);
        *current = Arc::new(ClientSnapshot {
            client: PassageClient::with_http_client(&config, self.http.clone()),
            config: Arc::new(config),
            generation,
        });
        Ok(true)
    }
}
