//! Cached directory of user profiles.
//!
//! Loads the profile list once, resolves the signed-in user's entry, and
//! refreshes itself after creating or updating a profile.

use portal_auth::{ApiClient, AuthError, SessionStore};
use portal_storage::Profile;
use serde_json::Value;
use thiserror::Error;

const USERS_PATH: &str = "users/";
const CREATE_PROFILE_PATH: &str = "create_profile/";
const UPDATE_PROFILE_PATH: &str = "update_profile";

/// Errors from directory operations.
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("Profile form has no id")]
    MissingId,
    #[error("Profile id cannot be used in a URL: {0}")]
    InvalidId(String),
    #[error("Unexpected users payload: {0}")]
    Payload(String),
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// In-memory copy of the backend's profile list.
pub struct UserDirectory {
    api: ApiClient,
    users: Vec<Profile>,
    data_loaded: bool,
    current_user: Option<Profile>,
}

impl UserDirectory {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            users: Vec::new(),
            data_loaded: false,
            current_user: None,
        }
    }

    pub fn users(&self) -> &[Profile] {
        &self.users
    }

    pub fn is_loaded(&self) -> bool {
        self.data_loaded
    }

    /// Directory entry of the signed-in user, as of the last load.
    pub fn current_user(&self) -> Option<&Profile> {
        self.current_user.as_ref()
    }

    /// Load the list unless it is already loaded.
    pub async fn init(&mut self, session: &SessionStore) {
        if !self.data_loaded {
            self.fetch_users(session).await;
        }
    }

    /// Mark the cached list stale so the next fetch hits the backend.
    pub fn invalidate(&mut self) {
        self.data_loaded = false;
    }

    /// Fetch `users/`. A no-op while loaded.
    ///
    /// A payload that is not a list leaves the directory empty but loaded;
    /// a failed request leaves it empty and unloaded so the next call
    /// retries. Neither is reported to the caller.
    pub async fn fetch_users(&mut self, session: &SessionStore) {
        if self.data_loaded {
            return;
        }

        match self.api.get(USERS_PATH).await {
            Ok(response) => {
                self.users = parse_users(response.body).unwrap_or_else(|e| {
                    tracing::error!(error = %e, "Failed to parse users payload");
                    Vec::new()
                });
                self.data_loaded = true;
                self.set_current_user(session);
                tracing::debug!(count = self.users.len(), "Users loaded");
            }
            Err(e) => {
                tracing::error!(error = %e, "Error fetching users data");
                self.users.clear();
                self.data_loaded = false;
            }
        }
    }

    /// First entry whose `id` loosely equals `id`.
    pub fn user_by_id(&self, id: &Value) -> Option<&Profile> {
        self.users
            .iter()
            .find(|user| user.get("id").is_some_and(|user_id| loose_id_eq(user_id, id)))
    }

    /// Resolve the session profile's id against the loaded list.
    pub fn set_current_user(&mut self, session: &SessionStore) {
        self.current_user = session
            .profile_id()
            .and_then(|id| self.user_by_id(&id).cloned());
    }

    /// Create a profile. Returns the HTTP status, or `None` on failure.
    pub async fn create_user(&mut self, session: &SessionStore, form: &Profile) -> Option<u16> {
        match self.try_create_user(session, form).await {
            Ok(status) => Some(status),
            Err(e) => {
                tracing::error!(error = %e, "Error creating user");
                None
            }
        }
    }

    /// Update the profile named by `form["id"]`. Returns the HTTP status, or
    /// `None` on failure.
    pub async fn update_user(&mut self, session: &SessionStore, form: &Profile) -> Option<u16> {
        match self.try_update_user(session, form).await {
            Ok(status) => Some(status),
            Err(e) => {
                tracing::error!(error = %e, "Error updating user");
                None
            }
        }
    }

    pub async fn try_create_user(&mut self, session: &SessionStore, form: &Profile) -> DirectoryResult<u16> {
        let response = self.api.post_json(CREATE_PROFILE_PATH, form).await?;
        self.reload(session).await;
        Ok(response.status)
    }

    pub async fn try_update_user(&mut self, session: &SessionStore, form: &Profile) -> DirectoryResult<u16> {
        let id = form
            .get("id")
            .and_then(id_segment)
            .ok_or(DirectoryError::MissingId)?;
        if id == "." || id == ".." {
            return Err(DirectoryError::InvalidId(id));
        }
        let url = self.api.endpoint_segments(&[UPDATE_PROFILE_PATH, id.as_str()])?;
        let response = self.api.put_json_url(url, form).await?;
        self.reload(session).await;
        Ok(response.status)
    }

    /// Look up a user, fetching first if needed.
    pub async fn require_user(&mut self, session: &SessionStore, id: &Value) -> DirectoryResult<Profile> {
        self.init(session).await;
        self.user_by_id(id)
            .cloned()
            .ok_or_else(|| DirectoryError::UserNotFound(id_segment(id).unwrap_or_else(|| id.to_string())))
    }

    async fn reload(&mut self, session: &SessionStore) {
        self.invalidate();
        self.fetch_users(session).await;
    }
}

/// Accepts a JSON list, or a string holding one.
fn parse_users(body: Value) -> DirectoryResult<Vec<Profile>> {
    let body = match body {
        Value::String(text) => serde_json::from_str::<Value>(&text)
            .map_err(|e| DirectoryError::Payload(format!("JSON parse error: {e}")))?,
        other => other,
    };

    match body {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(profile) => Some(profile),
                _ => None,
            })
            .collect()),
        Value::Null => Ok(Vec::new()),
        other => Err(DirectoryError::Payload(format!("expected a list, got {other}"))),
    }
}

/// Ids compare by value across numbers and numeric strings, so `7 == "7"`.
pub fn loose_id_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            s.trim().parse::<f64>().ok() == n.as_f64()
        }
        _ => a == b,
    }
}

fn id_segment(id: &Value) -> Option<String> {
    match id {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}
