//! Management API: administrative operations authenticated with a bearer
//!
//! The bearer is the explicit token passed to an operation when it takes one,
//! otherwise the configured API key. With neither, the call fails with
//! `Fatal` before any request is built.

use reqwest::Method;
use serde_json::Value;

use super::models::{
    ApiKey, ApiKeysEnvelope, App, AppEnvelope, AppsEnvelope, CreateUser, Device,
    DevicesEnvelope, EventsEnvelope, UpdateUser, User, UserEnvelope, UsersEnvelope,
};
use super::transport::{endpoint, ApiRequest};
use super::{ApiError, ClientInner};
use crate::cancel::CancellationScope;

#[derive(Clone, Copy)]
pub struct ManagementApi<'a> {
    inner: &'a ClientInner,
}

impl<'a> ManagementApi<'a> {
    pub(super) fn new(inner: &'a ClientInner) -> Self {
        Self { inner }
    }

    fn bearer(&self, explicit: Option<&'a str>) -> Result<&'a str, ApiError> {
        explicit
            .filter(|token| !token.is_empty())
            .or(self.inner.api_key.as_deref())
            .ok_or_else(|| {
                ApiError::fatal(
                    "Management API call requires a bearer",
                    "no bearer token supplied and no API key configured",
                )
            })
    }

    fn app_url(&self, path: &[&str]) -> String {
        let mut segments = vec!["apps", self.inner.app_id.as_str()];
        segments.extend_from_slice(path);
        endpoint(&self.inner.management_api_url, &segments)
    }

    fn user_request(
        &self,
        method: Method,
        user_id: &str,
        suffix: &[&str],
        bearer: &'a str,
        context: String,
    ) -> ApiRequest<'a> {
        let mut path = vec!["users", user_id];
        path.extend_from_slice(suffix);
        ApiRequest::new(method, self.app_url(&path), context).bearer(bearer)
    }

    /// Full app settings, including fields hidden from the Authentication API
    ///
    /// # Errors
    ///
    /// Returns `Fatal` without a bearer, `NotFound` for an unknown app,
    /// otherwise the usual API errors.
    pub async fn get_app(&self, cancel: &CancellationScope) -> Result<App, ApiError> {
        let bearer = self.bearer(None)?;
        let request = ApiRequest::new(
            Method::GET,
            self.app_url(&[]),
            format!("Failed to get app '{}'", self.inner.app_id),
        )
        .bearer(bearer);
        let envelope: AppEnvelope = self.inner.transport.send_json(request, cancel).await?;
        Ok(envelope.app)
    }

    /// Every app the bearer can administer
    ///
    /// # Errors
    ///
    /// Returns `Fatal` without a bearer, otherwise the usual API errors.
    pub async fn list_apps(&self, cancel: &CancellationScope) -> Result<Vec<App>, ApiError> {
        let bearer = self.bearer(None)?;
        let request = ApiRequest::new(
            Method::GET,
            endpoint(&self.inner.management_api_url, &["apps"]),
            "Failed to list apps",
        )
        .bearer(bearer);
        let envelope: AppsEnvelope = self.inner.transport.send_json(request, cancel).await?;
        Ok(envelope.apps)
    }

    /// Fetch one user
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the user does not exist, `Fatal` without a
    /// bearer, otherwise the usual API errors.
    pub async fn get_user(
        &self,
        user_id: &str,
        bearer: Option<&'a str>,
        cancel: &CancellationScope,
    ) -> Result<User, ApiError> {
        let bearer = self.bearer(bearer)?;
        let request = self.user_request(
            Method::GET,
            user_id,
            &[],
            bearer,
            format!("Failed to get user '{user_id}'"),
        );
        let envelope: UserEnvelope = self.inner.transport.send_json(request, cancel).await?;
        Ok(envelope.user)
    }

    /// # Errors
    ///
    /// Returns `Fatal` without a bearer, otherwise the usual API errors.
    pub async fn list_users(&self, cancel: &CancellationScope) -> Result<Vec<User>, ApiError> {
        let bearer = self.bearer(None)?;
        let request =
            ApiRequest::new(Method::GET, self.app_url(&["users"]), "Failed to list users")
                .bearer(bearer);
        let envelope: UsersEnvelope = self.inner.transport.send_json(request, cancel).await?;
        Ok(envelope.users)
    }

    /// Create a user; at least one of e-mail or phone must be set
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when neither identifier is set, `Fatal`
    /// without a bearer, otherwise the usual API errors.
    pub async fn create_user(
        &self,
        user: &CreateUser,
        cancel: &CancellationScope,
    ) -> Result<User, ApiError> {
        let has_email = user.email.as_deref().is_some_and(|email| !email.is_empty());
        let has_phone = user.phone.as_deref().is_some_and(|phone| !phone.is_empty());
        if !has_email && !has_phone {
            return Err(ApiError::invalid_argument(
                "Creating a user requires an email address or phone number",
            ));
        }

        let bearer = self.bearer(None)?;
        let body = serde_json::to_value(user)
            .map_err(|e| ApiError::fatal("Failed to encode user", e.to_string()))?;
        let request =
            ApiRequest::new(Method::POST, self.app_url(&["users"]), "Failed to create user")
                .bearer(bearer)
                .json(body);
        let envelope: UserEnvelope = self.inner.transport.send_json(request, cancel).await?;
        Ok(envelope.user)
    }

    /// Update a user; unset fields are left as they are
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown user, `Fatal` without a bearer,
    /// otherwise the usual API errors.
    pub async fn update_user(
        &self,
        user_id: &str,
        update: &UpdateUser,
        cancel: &CancellationScope,
    ) -> Result<User, ApiError> {
        let bearer = self.bearer(None)?;
        let body = serde_json::to_value(update)
            .map_err(|e| ApiError::fatal("Failed to encode user update", e.to_string()))?;
        let request = self
            .user_request(
                Method::PATCH,
                user_id,
                &[],
                bearer,
                format!("Failed to update user '{user_id}'"),
            )
            .json(body);
        let envelope: UserEnvelope = self.inner.transport.send_json(request, cancel).await?;
        Ok(envelope.user)
    }

    /// # Errors
    ///
    /// Returns `NotFound` for an unknown user, `Fatal` without a bearer,
    /// otherwise the usual API errors.
    pub async fn delete_user(
        &self,
        user_id: &str,
        cancel: &CancellationScope,
    ) -> Result<(), ApiError> {
        let bearer = self.bearer(None)?;
        let request = self.user_request(
            Method::DELETE,
            user_id,
            &[],
            bearer,
            format!("Failed to delete user '{user_id}'"),
        );
        self.inner.transport.send_unit(request, cancel).await
    }

    /// # Errors
    ///
    /// Returns `NotFound` for an unknown user, `Fatal` without a bearer,
    /// otherwise the usual API errors.
    pub async fn activate_user(
        &self,
        user_id: &str,
        cancel: &CancellationScope,
    ) -> Result<User, ApiError> {
        self.set_user_status(user_id, "activate", cancel).await
    }

    /// # Errors
    ///
    /// Returns `NotFound` for an unknown user, `Fatal` without a bearer,
    /// otherwise the usual API errors.
    pub async fn deactivate_user(
        &self,
        user_id: &str,
        cancel: &CancellationScope,
    ) -> Result<User, ApiError> {
        self.set_user_status(user_id, "deactivate", cancel).await
    }

    async fn set_user_status(
        &self,
        user_id: &str,
        action: &str,
        cancel: &CancellationScope,
    ) -> Result<User, ApiError> {
        let bearer = self.bearer(None)?;
        let request = self.user_request(
            Method::PATCH,
            user_id,
            &[action],
            bearer,
            format!("Failed to {action} user '{user_id}'"),
        );
        let envelope: UserEnvelope = self.inner.transport.send_json(request, cancel).await?;
        Ok(envelope.user)
    }

    /// `WebAuthn` devices registered to a user
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown user, `Fatal` without a bearer,
    /// otherwise the usual API errors.
    pub async fn list_user_devices(
        &self,
        user_id: &str,
        cancel: &CancellationScope,
    ) -> Result<Vec<Device>, ApiError> {
        let bearer = self.bearer(None)?;
        let request = self.user_request(
            Method::GET,
            user_id,
            &["devices"],
            bearer,
            format!("Failed to list devices for user '{user_id}'"),
        );
        let envelope: DevicesEnvelope = self.inner.transport.send_json(request, cancel).await?;
        Ok(envelope.devices)
    }

    /// # Errors
    ///
    /// Returns `NotFound` for an unknown user or device, `Fatal` without a
    /// bearer, otherwise the usual API errors.
    pub async fn delete_user_device(
        &self,
        user_id: &str,
        device_id: &str,
        cancel: &CancellationScope,
    ) -> Result<(), ApiError> {
        let bearer = self.bearer(None)?;
        let request = self.user_request(
            Method::DELETE,
            user_id,
            &["devices", device_id],
            bearer,
            format!("Failed to delete device '{device_id}' for user '{user_id}'"),
        );
        self.inner.transport.send_unit(request, cancel).await
    }

    /// Sign the user out everywhere by revoking all their refresh tokens
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown user, `Fatal` without a bearer,
    /// otherwise the usual API errors.
    pub async fn revoke_user_refresh_tokens(
        &self,
        user_id: &str,
        cancel: &CancellationScope,
    ) -> Result<(), ApiError> {
        let bearer = self.bearer(None)?;
        let request = self.user_request(
            Method::DELETE,
            user_id,
            &["tokens"],
            bearer,
            format!("Failed to revoke refresh tokens for user '{user_id}'"),
        );
        self.inner.transport.send_unit(request, cancel).await
    }

    /// # Errors
    ///
    /// Returns `Fatal` without a bearer, otherwise the usual API errors.
    pub async fn list_api_keys(&self, cancel: &CancellationScope) -> Result<Vec<ApiKey>, ApiError> {
        let bearer = self.bearer(None)?;
        let request =
            ApiRequest::new(Method::GET, self.app_url(&["api-keys"]), "Failed to list API keys")
                .bearer(bearer);
        let envelope: ApiKeysEnvelope = self.inner.transport.send_json(request, cancel).await?;
        Ok(envelope.api_keys)
    }

    /// Audit events for the app, returned as the provider sends them
    ///
    /// # Errors
    ///
    /// Returns `Fatal` without a bearer, otherwise the usual API errors.
    pub async fn list_events(&self, cancel: &CancellationScope) -> Result<Vec<Value>, ApiError> {
        let bearer = self.bearer(None)?;
        let request = ApiRequest::new(Method::GET, self.app_url(&["events"]), "Failed to list events")
            .bearer(bearer);
        let envelope: EventsEnvelope = self.inner.transport.send_json(request, cancel).await?;
        Ok(envelope.events)
    }
}
