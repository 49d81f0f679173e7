//! Default request headers shared between the session and the HTTP client.

use crate::{AuthError, AuthResult};
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::sync::Arc;

/// Supplies the headers attached to every outgoing API request.
///
/// The transport queries this per request, so a login or logout is visible
/// to the very next call without rebuilding the client.
pub trait CredentialProvider: Send + Sync {
    fn default_headers(&self) -> HeaderMap;
}

/// Process-wide default header set.
///
/// Cloning shares the underlying map. The session store installs and
/// removes `Authorization` here; [`crate::ApiClient`] reads it.
#[derive(Debug, Clone, Default)]
pub struct DefaultHeaders {
    headers: Arc<RwLock<HeaderMap>>,
}

impl DefaultHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `Authorization: Bearer <token>`.
    pub fn install_bearer(&self, token: &str) -> AuthResult<()> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            AuthError::InvalidCredential("token is not a valid header value".to_string())
        })?;
        value.set_sensitive(true);
        self.headers.write().insert(AUTHORIZATION, value);
        Ok(())
    }

    /// Remove `Authorization`. Returns whether it was present.
    pub fn clear_authorization(&self) -> bool {
        self.headers.write().remove(AUTHORIZATION).is_some()
    }

    /// Current `Authorization` value, if it is valid UTF-8.
    pub fn authorization(&self) -> Option<String> {
        self.headers
            .read()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }

    /// Set an arbitrary default header.
    pub fn insert(&self, name: reqwest::header::HeaderName, value: HeaderValue) {
        self.headers.write().insert(name, value);
    }
}

impl CredentialProvider for DefaultHeaders {
    fn default_headers(&self) -> HeaderMap {
        self.headers.read().clone()
    }
}
