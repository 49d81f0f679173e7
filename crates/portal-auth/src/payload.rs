//! Login response envelope.

use portal_storage::Profile;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `{access, user}` envelope returned by every credential exchange.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoginPayload {
    #[serde(
        rename = "access",
        alias = "accessToken",
        alias = "access_token",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub access_token: Option<String>,
    #[serde(
        rename = "refresh",
        alias = "refresh_token",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<Profile>,
}

impl LoginPayload {
    pub fn new(access_token: impl Into<String>, user: Profile) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: None,
            user: Some(user),
        }
    }

    /// Extract the envelope field by field. Anything of the wrong shape is
    /// dropped, so a malformed response becomes a payload without a token.
    pub fn from_value(value: &Value) -> Self {
        let string_field = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| value.get(*key).and_then(Value::as_str))
                .map(str::to_string)
        };

        Self {
            access_token: string_field(&["access", "accessToken", "access_token"]),
            refresh_token: string_field(&["refresh", "refresh_token"]),
            user: value.get("user").and_then(Value::as_object).cloned(),
        }
    }

    /// Non-empty access token, if any.
    pub fn token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|token| !token.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_backend_envelope() {
        let payload = LoginPayload::from_value(&json!({
            "refresh": "r1",
            "access": "a1",
            "user": {"id": 7, "email": "ada@example.com"}
        }));

        assert_eq!(payload.token(), Some("a1"));
        assert_eq!(payload.refresh_token.as_deref(), Some("r1"));
        assert_eq!(payload.user.unwrap().get("id"), Some(&json!(7)));
    }

    #[test]
    fn test_from_camel_case_envelope() {
        let payload = LoginPayload::from_value(&json!({"accessToken": "a2", "user": {}}));
        assert_eq!(payload.token(), Some("a2"));
    }

    #[test]
    fn test_malformed_envelopes_have_no_token() {
        for value in [
            json!(null),
            json!("text"),
            json!([1, 2]),
            json!({"access": 42, "user": "nobody"}),
            json!({"access": ""}),
        ] {
            let payload = LoginPayload::from_value(&value);
            assert_eq!(payload.token(), None, "{value}");
            assert!(payload.user.is_none(), "{value}");
        }
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let payload = LoginPayload::new("a3", Profile::new());
        let encoded = serde_json::to_value(&payload).unwrap();
        assert_eq!(encoded, json!({"access": "a3", "user": {}}));

        let decoded: LoginPayload =
            serde_json::from_value(json!({"access_token": "a4", "user": null})).unwrap();
        assert_eq!(decoded.token(), Some("a4"));
        assert!(decoded.user.is_none());
    }
}
