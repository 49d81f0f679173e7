//! Password and passcode account endpoints, and the sign-in flow that ties
//! them to the session throttle.

use crate::notify::Notifier;
use crate::router::Route;
use crate::{ApiClient, AuthError, AuthResult, LoginPayload, SessionStore, SignInAction};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

const SIGN_IN_PATH: &str = "sign_in/";
const SIGN_ON_PATH: &str = "sign_on/";
const SEND_VERIFICATION_CODE_PATH: &str = "send_verification_code/";
const SEND_PASSCODE_PATH: &str = "send_passcode/";
const RESET_PASSWORD_PATH: &str = "verify_passcode_and_reset_password/";
const UPDATE_PASSWORD_PATH: &str = "update_password/";

/// Default subject of the password-reset email.
pub const RESET_EMAIL_SUBJECT: &str = "Portal password reset code";

/// Credentials accepted by `sign_in/`.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SignInCredentials {
    Password { email: String, password: String },
    Passcode { email: String, passcode: String },
}

impl SignInCredentials {
    pub fn password(email: impl Into<String>, password: impl Into<String>) -> Self {
        SignInCredentials::Password {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn passcode(email: impl Into<String>, passcode: impl Into<String>) -> Self {
        SignInCredentials::Passcode {
            email: email.into(),
            passcode: passcode.into(),
        }
    }

    pub fn email(&self) -> &str {
        match self {
            SignInCredentials::Password { email, .. } | SignInCredentials::Passcode { email, .. } => email,
        }
    }
}

impl fmt::Debug for SignInCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            SignInCredentials::Password { .. } => "Password",
            SignInCredentials::Passcode { .. } => "Passcode",
        };
        f.debug_struct(kind)
            .field("email", &self.email())
            .finish_non_exhaustive()
    }
}

/// Registration form for `sign_on/`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct SignOnRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl fmt::Debug for SignOnRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignOnRequest")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish_non_exhaustive()
    }
}

/// Thin typed wrapper over the account endpoints.
#[derive(Clone)]
pub struct AccountApi {
    api: ApiClient,
}

impl AccountApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn client(&self) -> &ApiClient {
        &self.api
    }

    pub async fn sign_in(&self, credentials: &SignInCredentials) -> AuthResult<LoginPayload> {
        let response = self.api.post_json(SIGN_IN_PATH, credentials).await?;
        Ok(LoginPayload::from_value(&response.body))
    }

    /// Register a new account. The backend answers with a login envelope.
    pub async fn sign_on(&self, request: &SignOnRequest) -> AuthResult<LoginPayload> {
        let response = self.api.post_json(SIGN_ON_PATH, request).await?;
        Ok(LoginPayload::from_value(&response.body))
    }

    /// Ask the backend for an email verification code ahead of sign-on.
    /// Returns the `passcode` echoed by the backend, if any.
    pub async fn send_verification_code(&self, email: &str) -> AuthResult<Option<String>> {
        let response = self
            .api
            .post_json(SEND_VERIFICATION_CODE_PATH, &serde_json::json!({ "email": email }))
            .await?;
        Ok(string_field(&response.body, "passcode"))
    }

    /// Email a one-time passcode usable for sign-in or password reset.
    pub async fn send_passcode(&self, email: &str, subject: &str) -> AuthResult<Option<String>> {
        let response = self
            .api
            .post_json(
                SEND_PASSCODE_PATH,
                &serde_json::json!({ "email": email, "subject_email": subject }),
            )
            .await?;
        Ok(string_field(&response.body, "message"))
    }

    pub async fn reset_password(&self, passcode: &str, new_password: &str) -> AuthResult<Option<String>> {
        let response = self
            .api
            .post_json(
                RESET_PASSWORD_PATH,
                &serde_json::json!({ "passcode": passcode, "new_password": new_password }),
            )
            .await?;
        Ok(string_field(&response.body, "message"))
    }

    /// Change the password of the signed-in account.
    pub async fn update_password(&self, current_password: &str, new_password: &str) -> AuthResult<Option<String>> {
        let response = self
            .api
            .post_json(
                UPDATE_PASSWORD_PATH,
                &serde_json::json!({
                    "current_password": current_password,
                    "new_password": new_password
                }),
            )
            .await?;
        Ok(string_field(&response.body, "message"))
    }
}

fn string_field(body: &Value, key: &str) -> Option<String> {
    body.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Message shown while sign-in is locked out.
pub fn lockout_message(remaining_secs: u32) -> String {
    format!("Too many attempts. Try again in {remaining_secs} seconds.")
}

/// Password or passcode sign-in gated by the session throttle.
///
/// While throttled no request is sent. Only a rejection from the backend
/// (a 4xx answer) counts as a retry; when that retry starts a lockout the
/// warning names its length. Outages and malformed replies are reported
/// without touching the throttle.
pub async fn sign_in_with_password(
    account: &AccountApi,
    session: &SessionStore,
    notifier: &dyn Notifier,
    credentials: &SignInCredentials,
) -> Option<Route> {
    if session.is_throttled() {
        let remaining = session.remaining_secs();
        tracing::info!(remaining_secs = remaining, "Sign-in blocked by lockout");
        notifier.warning(&lockout_message(remaining));
        return None;
    }

    let error = match account.sign_in(credentials).await {
        Ok(payload) => {
            session.login(&payload);
            if session.is_authenticated() {
                tracing::info!("Password sign-in succeeded");
                notifier.success("Sign In successful!");
                return Some(Route::Profile);
            }
            tracing::warn!("Sign-in response carried no usable access token");
            notifier.error("Error during login");
            return None;
        }
        Err(e) => e,
    };

    if !is_rejection(&error) {
        tracing::warn!(error = %error, transient = error.is_transient(), "Sign-in request failed");
        notifier.error(&error.api_message().unwrap_or_else(|| "Error during login".to_string()));
        return None;
    }

    tracing::warn!(error = %error, "Sign-in rejected");
    session.attempt_sign_in(SignInAction::Retry);
    if session.is_throttled() {
        notifier.warning(&lockout_message(session.remaining_secs()));
    } else {
        notifier.error(
            &error
                .api_message()
                .unwrap_or_else(|| "Invalid credentials".to_string()),
        );
    }
    None
}

/// The backend looked at the credentials and said no.
fn is_rejection(error: &AuthError) -> bool {
    error.status().is_some_and(|status| (400..500).contains(&status))
}

/// Registration flow: create the account and sign straight in.
pub async fn register_account(
    account: &AccountApi,
    session: &SessionStore,
    notifier: &dyn Notifier,
    request: &SignOnRequest,
) -> Option<Route> {
    match account.sign_on(request).await {
        Ok(payload) => {
            session.login(&payload);
            if session.is_authenticated() {
                tracing::info!("Account created");
                notifier.success("Account created successfully!");
                Some(Route::Profile)
            } else {
                notifier.error("Error during sign on");
                None
            }
        }
        Err(e) if e.status() == Some(409) => {
            let message = e
                .api_message()
                .unwrap_or_else(|| "The email is already registered.".to_string());
            notifier.warning(&message);
            None
        }
        Err(e) => {
            tracing::error!(error = %e, "Sign on failed");
            notifier.error(&e.api_message().unwrap_or_else(|| "Error during sign on".to_string()));
            None
        }
    }
}
