//! Typed client for the Passage Authentication and Management APIs
//!
//! A `PassageClient` is built from one `Configuration` and never mutated; a
//! configuration change produces a new client (see `ConfigStore`). Cloning is
//! cheap and clones share the connection pool and token cache.

pub mod authentication;
pub mod error;
pub mod management;
pub mod models;
mod token_cache;
mod transport;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

pub use authentication::AuthenticationApi;
pub use error::{ApiError, ApiErrorKind};
pub use management::ManagementApi;
pub use models::{
    AllowedIdentifier, ApiKey, App, AuthResult, Challenge, CreateUser, Device, Layouts,
    LayoutElement, MagicLink, UpdateUser, User, UserStatus,
};

use crate::cancel::CancellationScope;
use crate::config::Configuration;
use token_cache::TokenCache;
use transport::Transport;

#[derive(Clone)]
pub struct PassageClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Transport,
    app_id: String,
    api_key: Option<String>,
    auth_api_url: String,
    management_api_url: String,
    token_cache: TokenCache,
}

impl fmt::Debug for PassageClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassageClient")
            .field("app_id", &self.inner.app_id)
            .field("api_key", &self.inner.api_key.as_ref().map(|_| "<redacted>"))
            .field("auth_api_url", &self.inner.auth_api_url)
            .field("management_api_url", &self.inner.management_api_url)
            .finish_non_exhaustive()
    }
}

impl PassageClient {
    /// Build a client with its own connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &Configuration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ApiError::fatal("Failed to build HTTP client", e.to_string()))?;
        Ok(Self::with_http_client(config, http))
    }

    /// Build a client on an existing connection pool
    #[must_use]
    pub fn with_http_client(config: &Configuration, http: reqwest::Client) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport: Transport::new(http, config.request_timeout),
                app_id: config.app_id.clone(),
                api_key: config.api_key().map(ToString::to_string),
                auth_api_url: config.auth_api_url.clone(),
                management_api_url: config.management_api_url.clone(),
                token_cache: TokenCache::default(),
            }),
        }
    }

    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.inner.app_id
    }

    /// Unauthenticated end-user operations
    #[must_use]
    pub fn authentication(&self) -> AuthenticationApi<'_> {
        AuthenticationApi::new(&self.inner)
    }

    /// Bearer-authenticated administrative operations
    #[must_use]
    pub fn management(&self) -> ManagementApi<'_> {
        ManagementApi::new(&self.inner)
    }
}

/// The API calls a handshake depends on
///
/// Implemented by `PassageClient`; the seam lets the state machine run against
/// any identity backend.
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Redeem a magic link (or verify link) token for an `AuthResult`
    ///
    /// # Errors
    /// Returns an error if:
    /// - The provider rejects the token
    /// - The provider cannot be reached
    /// - The scope is cancelled while the call is outstanding
    async fn complete_magic_link(
        &self,
        token: &str,
        cancel: &CancellationScope,
    ) -> Result<AuthResult, ApiError>;

    /// Look up a user with `bearer` as the Authorization credential
    ///
    /// # Errors
    /// Returns an error if:
    /// - The user does not exist (`NotFound`)
    /// - The provider rejects the bearer
    /// - The provider cannot be reached
    /// - The scope is cancelled while the call is outstanding
    async fn get_user(
        &self,
        user_id: &str,
        bearer: &str,
        cancel: &CancellationScope,
    ) -> Result<User, ApiError>;
}

#[async_trait]
impl IdentityApi for PassageClient {
    async fn complete_magic_link(
        &self,
        token: &str,
        cancel: &CancellationScope,
    ) -> Result<AuthResult, ApiError> {
        self.authentication().complete_magic_link(token, cancel).await
    }

    async fn get_user(
        &self,
        user_id: &str,
        bearer: &str,
        cancel: &CancellationScope,
    ) -> Result<User, ApiError> {
        self.management().get_user(user_id, Some(bearer), cancel).await
    }
}
