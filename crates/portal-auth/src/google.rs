//! Google identity credential exchange.
//!
//! The sign-in widget hands over a JWT. The backend accepts it either raw
//! (form field `token`, verified server-side) or pre-decoded into the
//! identity claims as JSON. Both shapes go to the same endpoint and answer
//! with the usual `{access, user}` envelope.

use crate::notify::Notifier;
use crate::router::Route;
use crate::{ApiClient, AuthError, AuthResult, LoginPayload, SessionStore};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const GOOGLE_LOGIN_PATH: &str = "google_login/";

/// Opaque JWT issued by the Google sign-in widget.
#[derive(Clone, PartialEq, Eq)]
pub struct GoogleCredential(String);

impl fmt::Debug for GoogleCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GoogleCredential(len={})", self.0.len())
    }
}

impl GoogleCredential {
    pub fn new(credential: impl Into<String>) -> Self {
        Self(credential.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the payload segment. The signature is not checked here; the
    /// backend is the verifier.
    pub fn decode_identity(&self) -> AuthResult<GoogleIdentity> {
        let mut segments = self.0.split('.');
        let payload = match (segments.next(), segments.next(), segments.next()) {
            (Some(_), Some(payload), Some(_)) if !payload.is_empty() => payload,
            _ => {
                return Err(AuthError::InvalidCredential(
                    "expected three dot-separated segments".to_string(),
                ))
            }
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| AuthError::InvalidCredential(format!("payload is not base64url: {e}")))?;
        let identity: GoogleIdentity = serde_json::from_slice(&bytes)
            .map_err(|e| AuthError::InvalidCredential(format!("payload is not valid claims: {e}")))?;

        if identity.email.trim().is_empty() {
            return Err(AuthError::InvalidCredential("credential has no email claim".to_string()));
        }
        Ok(identity)
    }
}

/// Identity claims forwarded in the decoded request shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleIdentity {
    pub email: String,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
}

/// The two request shapes accepted by the exchange endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum GoogleLoginRequest {
    /// Form-encoded `token=<credential>`.
    RawToken(GoogleCredential),
    /// JSON `{email, given_name, family_name}`.
    Decoded(GoogleIdentity),
}

impl GoogleLoginRequest {
    pub fn raw(credential: GoogleCredential) -> Self {
        GoogleLoginRequest::RawToken(credential)
    }

    pub fn decoded(credential: &GoogleCredential) -> AuthResult<Self> {
        Ok(GoogleLoginRequest::Decoded(credential.decode_identity()?))
    }
}

/// Send the credential to the backend and return the login envelope.
pub async fn exchange_google_credential(
    api: &ApiClient,
    request: &GoogleLoginRequest,
) -> AuthResult<LoginPayload> {
    let response = match request {
        GoogleLoginRequest::RawToken(credential) => {
            api.post_form(GOOGLE_LOGIN_PATH, &[("token", credential.as_str())])
                .await?
        }
        GoogleLoginRequest::Decoded(identity) => api.post_json(GOOGLE_LOGIN_PATH, identity).await?,
    };
    Ok(LoginPayload::from_value(&response.body))
}

/// Full Google sign-in: exchange, log in, notify.
///
/// Returns the route to show next, or `None` when the sign-in failed. No
/// error escapes; failures are logged and surfaced as a notification.
pub async fn login_with_google(
    api: &ApiClient,
    session: &SessionStore,
    notifier: &dyn Notifier,
    request: &GoogleLoginRequest,
) -> Option<Route> {
    let shape = match request {
        GoogleLoginRequest::RawToken(_) => "raw_token",
        GoogleLoginRequest::Decoded(_) => "decoded",
    };

    match exchange_google_credential(api, request).await {
        Ok(payload) => {
            session.login(&payload);
            if session.is_authenticated() {
                tracing::info!(shape, "Google sign-in succeeded");
                notifier.success("Sign In successful!");
                Some(Route::Profile)
            } else {
                tracing::warn!(shape, "Google exchange returned no access token");
                notifier.error("Error during login");
                None
            }
        }
        Err(e) => {
            tracing::error!(shape, error = %e, detail = ?e.api_message(), "Error during login");
            notifier.error("Error during login");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn jwt(claims: serde_json::Value) -> GoogleCredential {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        GoogleCredential::new(format!("{header}.{payload}.c2lnbmF0dXJl"))
    }

    #[test]
    fn test_decode_identity() {
        let credential = jwt(json!({
            "iss": "https://accounts.google.com",
            "email": "ada@example.com",
            "given_name": "Ada",
            "family_name": "Lovelace"
        }));

        let identity = credential.decode_identity().unwrap();
        assert_eq!(
            identity,
            GoogleIdentity {
                email: "ada@example.com".to_string(),
                given_name: "Ada".to_string(),
                family_name: "Lovelace".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_tolerates_padding_and_missing_names() {
        let header = URL_SAFE_NO_PAD.encode(b"{}");
        let payload = base64::engine::general_purpose::URL_SAFE.encode(br#"{"email":"a@b.c"}"#);
        let credential = GoogleCredential::new(format!("{header}.{payload}.sig"));

        let identity = credential.decode_identity().unwrap();
        assert_eq!(identity.email, "a@b.c");
        assert_eq!(identity.given_name, "");
    }

    #[test]
    fn test_decode_rejects_malformed() {
        for raw in ["", "only-one", "a.b", "a.!!!.c", "a..c"] {
            let err = GoogleCredential::new(raw).decode_identity().unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredential(_)), "{raw}");
        }

        let no_email = jwt(json!({"given_name": "Ada"}));
        assert!(no_email.decode_identity().is_err());
    }

    #[test]
    fn test_debug_hides_credential() {
        let credential = GoogleCredential::new("header.payload.signature");
        assert_eq!(format!("{credential:?}"), "GoogleCredential(len=24)");
    }

    #[test]
    fn test_decoded_request_shape() {
        let credential = jwt(json!({"email": "ada@example.com", "given_name": "Ada", "family_name": "L"}));
        let GoogleLoginRequest::Decoded(identity) = GoogleLoginRequest::decoded(&credential).unwrap()
        else {
            panic!("expected decoded request");
        };
        assert_eq!(
            serde_json::to_value(identity).unwrap(),
            json!({"email": "ada@example.com", "given_name": "Ada", "family_name": "L"})
        );
    }
}
