use log::debug;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use super::error::ApiError;
use crate::cancel::CancellationScope;

/// One outbound Passage API call
pub(crate) struct ApiRequest<'a> {
    pub method: Method,
    pub url: String,
    pub bearer: Option<&'a str>,
    pub body: Option<Value>,
    /// Prefix for error messages, e.g. "Failed to get user 'u1'"
    pub context: String,
}

impl<'a> ApiRequest<'a> {
    pub fn new(method: Method, url: String, context: impl Into<String>) -> Self {
        Self {
            method,
            url,
            bearer: None,
            body: None,
            context: context.into(),
        }
    }

    #[must_use]
    pub fn bearer(mut self, token: &'a str) -> Self {
        self.bearer = Some(token);
        self
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Shared send/classify protocol for every API call
///
/// Build → send → on non-2xx parse `{error}` or keep the raw body → decode.
/// The whole exchange is raced against the caller's cancellation scope.
#[derive(Clone)]
pub(crate) struct Transport {
    http: reqwest::Client,
    timeout: Duration,
}

impl Transport {
    pub fn new(http: reqwest::Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    /// Send and decode a JSON response body
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest<'_>,
        cancel: &CancellationScope,
    ) -> Result<T, ApiError> {
        let context = request.context.clone();
        let body = self.send(request, cancel).await?;
        serde_json::from_str(&body)
            .map_err(|e| ApiError::fatal(context, format!("Invalid response body: {e}")))
    }

    /// Send and discard the response body
    pub async fn send_unit(
        &self,
        request: ApiRequest<'_>,
        cancel: &CancellationScope,
    ) -> Result<(), ApiError> {
        self.send(request, cancel).await.map(|_| ())
    }

    async fn send(
        &self,
        request: ApiRequest<'_>,
        cancel: &CancellationScope,
    ) -> Result<String, ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::cancelled(request.context));
        }

        let context = request.context.clone();
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("Cancelled in flight: {context}");
                Err(ApiError::cancelled(context))
            }
            result = self.execute(request) => result,
        }
    }

    async fn execute(&self, request: ApiRequest<'_>) -> Result<String, ApiError> {
        debug!("Passage API {} {}", request.method, request.url);

        let mut builder = self
            .http
            .request(request.method, &request.url)
            .timeout(self.timeout)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::from_transport(request.context.clone(), &e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::from_transport(request.context.clone(), &e))?;

        if status.is_success() {
            Ok(body)
        } else {
            debug!("Passage API returned {status}: {}", request.context);
            Err(ApiError::from_response(request.context, status.as_u16(), &body))
        }
    }
}

/// Join a base URL and path segments, percent-encoding each segment
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> String {
    let mut url = base.trim_end_matches('/').to_string();
    for segment in segments {
        url.push('/');
        url.push_str(&urlencoding::encode(segment));
    }
    url.push('/');
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_has_trailing_slash() {
        assert_eq!(
            endpoint("https://auth.passage.id/v1/", &["apps", "app1", "tokens"]),
            "https://auth.passage.id/v1/apps/app1/tokens/"
        );
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        assert_eq!(
            endpoint("http://localhost/v1", &["apps", "a/b", "users", "u 1"]),
            "http://localhost/v1/apps/a%2Fb/users/u%201/"
        );
    }
}
