//! JSON REST client for the Portal backend.

use crate::credentials::CredentialProvider;
use crate::{AuthError, AuthResult};
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use url::Url;

fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// Decoded response of a successful call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// `Null` for an empty body, `String` for a body that is not JSON.
    pub body: Value,
}

/// Backend client. Paths are resolved against the base URL, and the
/// default headers of the credential provider are attached to every request.
#[derive(Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: Url,
    credentials: Arc<dyn CredentialProvider>,
}

impl ApiClient {
    /// Create a client for `base_url` (for example `http://localhost:8000/api/`).
    pub fn new(base_url: Url, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self::with_http_client(reqwest::Client::new(), base_url, credentials)
    }

    pub fn with_http_client(
        http_client: reqwest::Client,
        mut base_url: Url,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            http_client,
            base_url,
            credentials,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an endpoint path relative to the base URL.
    pub fn endpoint(&self, path: &str) -> AuthResult<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Build an endpoint from raw segments under the base URL, with a
    /// trailing slash. Each segment is percent-encoded, so a segment holding
    /// `/` or `?` stays a single segment.
    pub fn endpoint_segments(&self, segments: &[&str]) -> AuthResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AuthError::Config(format!("API URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments)
            .push("");
        Ok(url)
    }

    pub async fn get(&self, path: &str) -> AuthResult<ApiResponse> {
        let request = self.request(Method::GET, self.endpoint(path)?);
        self.send(request, Method::GET, path).await
    }

    pub async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> AuthResult<ApiResponse> {
        let request = self.request(Method::POST, self.endpoint(path)?).json(body);
        self.send(request, Method::POST, path).await
    }

    /// POST an `application/x-www-form-urlencoded` body.
    pub async fn post_form<B: Serialize + ?Sized>(&self, path: &str, form: &B) -> AuthResult<ApiResponse> {
        let request = self.request(Method::POST, self.endpoint(path)?).form(form);
        self.send(request, Method::POST, path).await
    }

    pub async fn put_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> AuthResult<ApiResponse> {
        self.put_json_url(self.endpoint(path)?, body).await
    }

    /// PUT to an already resolved URL, see [`ApiClient::endpoint_segments`].
    pub async fn put_json_url<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> AuthResult<ApiResponse> {
        let path = url.path().to_string();
        let request = self.request(Method::PUT, url).json(body);
        self.send(request, Method::PUT, &path).await
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .headers(self.credentials.default_headers())
            .header(ACCEPT, HeaderValue::from_static("application/json"))
    }

    async fn send(&self, request: RequestBuilder, method: Method, path: &str) -> AuthResult<ApiResponse> {
        tracing::debug!(method = %method, path, "Sending API request");

        let response = request.send().await.map_err(|e| {
            tracing::warn!(method = %method, path, error = %e, "API request failed");
            if e.is_connect() {
                AuthError::NetworkUnavailable
            } else if e.is_timeout() {
                AuthError::Timeout
            } else {
                AuthError::Http(e)
            }
        })?;

        let status = response.status();
        let text = response.text().await?;
        let body = parse_body(&text);

        if !status.is_success() {
            let body_summary = summarize_response_body(&text);
            tracing::warn!(
                method = %method,
                path,
                status = %status,
                body_summary = %body_summary,
                "API request rejected"
            );
            return Err(AuthError::Api {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(method = %method, path, status = %status, "API request succeeded");
        Ok(ApiResponse {
            status: status.as_u16(),
            body,
        })
    }
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
