//! Typed access to the persisted session fields.

use crate::{KeyValueStore, StorageKeys, StorageResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Public attributes of the authenticated user, as returned by the backend.
pub type Profile = serde_json::Map<String, serde_json::Value>;

/// Sign-in throttle counters, persisted as three decimal strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleCounters {
    /// Counted sign-in attempts since the last reset.
    pub attempt_count: u32,
    /// Base used to compute the next lockout duration.
    pub accumulated_backoff_secs: u32,
    /// Seconds left in the current lockout; 0 means not throttled.
    pub remaining_secs: u32,
}

/// High-level API over the five session keys of a [`KeyValueStore`].
///
/// Values are stored as strings; the profile is a JSON document. Reads are
/// lenient: a value that does not parse comes back as the field's default.
#[derive(Clone)]
pub struct SessionVault {
    storage: Arc<dyn KeyValueStore>,
}

impl SessionVault {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// The underlying store.
    pub fn storage(&self) -> &Arc<dyn KeyValueStore> {
        &self.storage
    }

    // ==========================================
    // Token
    // ==========================================

    /// Stored bearer token. An empty string counts as absent.
    pub fn token(&self) -> StorageResult<Option<String>> {
        Ok(self
            .storage
            .get(StorageKeys::TOKEN)?
            .filter(|token| !token.is_empty()))
    }

    pub fn set_token(&self, token: &str) -> StorageResult<()> {
        self.storage.set(StorageKeys::TOKEN, token)
    }

    // ==========================================
    // Profile
    // ==========================================

    /// Stored profile. Missing, `null`, or malformed JSON yields an empty mapping.
    pub fn profile(&self) -> StorageResult<Profile> {
        let Some(raw) = self.storage.get(StorageKeys::USER_AUTH)? else {
            return Ok(Profile::new());
        };

        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(serde_json::Value::Object(profile)) => Ok(profile),
            Ok(serde_json::Value::Null) => Ok(Profile::new()),
            Ok(other) => {
                tracing::warn!(kind = %json_kind(&other), "Stored profile is not an object, ignoring");
                Ok(Profile::new())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stored profile is not valid JSON, ignoring");
                Ok(Profile::new())
            }
        }
    }

    pub fn set_profile(&self, profile: &Profile) -> StorageResult<()> {
        let encoded = serde_json::to_string(profile)
            .map_err(|e| crate::StorageError::Encoding(e.to_string()))?;
        self.storage.set(StorageKeys::USER_AUTH, &encoded)
    }

    // ==========================================
    // Throttle counters
    // ==========================================

    /// Stored counters. Each unparsable or negative value reads as 0.
    pub fn counters(&self) -> StorageResult<ThrottleCounters> {
        Ok(ThrottleCounters {
            attempt_count: self.read_counter(StorageKeys::SIGN_IN_TRIES)?,
            accumulated_backoff_secs: self.read_counter(StorageKeys::SIGN_IN_SECONDS_ACCUMULATED)?,
            remaining_secs: self.read_counter(StorageKeys::SIGN_IN_SECONDS_REMAINING)?,
        })
    }

    pub fn set_counters(&self, counters: &ThrottleCounters) -> StorageResult<()> {
        self.storage.set(
            StorageKeys::SIGN_IN_TRIES,
            &counters.attempt_count.to_string(),
        )?;
        self.storage.set(
            StorageKeys::SIGN_IN_SECONDS_REMAINING,
            &counters.remaining_secs.to_string(),
        )?;
        self.storage.set(
            StorageKeys::SIGN_IN_SECONDS_ACCUMULATED,
            &counters.accumulated_backoff_secs.to_string(),
        )
    }

    fn read_counter(&self, key: &str) -> StorageResult<u32> {
        let Some(raw) = self.storage.get(key)? else {
            return Ok(0);
        };
        let value = match raw.trim().parse::<i64>() {
            Ok(value) => value.clamp(0, u32::MAX as i64) as u32,
            Err(_) => {
                tracing::debug!(key, raw = %raw, "Stored counter is not an integer, using 0");
                0
            }
        };
        Ok(value)
    }

    // ==========================================
    // Clear
    // ==========================================

    /// Remove every session key. Every key is attempted even if one fails;
    /// the first failure is returned.
    pub fn clear_session(&self) -> StorageResult<()> {
        let mut first_error = None;
        for key in StorageKeys::ALL {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!(key, error = %e, "Failed to remove session key");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use serde_json::json;

    fn vault_with_store() -> (SessionVault, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (SessionVault::new(store.clone()), store)
    }

    #[test]
    fn test_empty_store_defaults() {
        let (vault, _) = vault_with_store();
        assert_eq!(vault.token().unwrap(), None);
        assert!(vault.profile().unwrap().is_empty());
        assert_eq!(vault.counters().unwrap(), ThrottleCounters::default());
    }

    #[test]
    fn test_empty_token_reads_as_absent() {
        let (vault, _) = vault_with_store();
        vault.set_token("").unwrap();
        assert_eq!(vault.token().unwrap(), None);
    }

    #[test]
    fn test_profile_roundtrip() {
        let (vault, store) = vault_with_store();
        let profile = json!({"id": 7, "first_name": "Ada", "email": "ada@example.com"})
            .as_object()
            .cloned()
            .unwrap();

        vault.set_profile(&profile).unwrap();

        assert_eq!(vault.profile().unwrap(), profile);
        assert!(store.get(StorageKeys::USER_AUTH).unwrap().unwrap().contains("\"id\":7"));
    }

    #[test]
    fn test_malformed_profile_reads_as_empty() {
        let (vault, store) = vault_with_store();

        store.set(StorageKeys::USER_AUTH, "{broken").unwrap();
        assert!(vault.profile().unwrap().is_empty());

        store.set(StorageKeys::USER_AUTH, "[1,2]").unwrap();
        assert!(vault.profile().unwrap().is_empty());

        store.set(StorageKeys::USER_AUTH, "null").unwrap();
        assert!(vault.profile().unwrap().is_empty());
    }

    #[test]
    fn test_counters_roundtrip_as_decimal_strings() {
        let (vault, store) = vault_with_store();
        let counters = ThrottleCounters {
            attempt_count: 6,
            accumulated_backoff_secs: 120,
            remaining_secs: 87,
        };

        vault.set_counters(&counters).unwrap();

        assert_eq!(vault.counters().unwrap(), counters);
        assert_eq!(store.get(StorageKeys::SIGN_IN_TRIES).unwrap(), Some("6".to_string()));
        assert_eq!(
            store.get(StorageKeys::SIGN_IN_SECONDS_ACCUMULATED).unwrap(),
            Some("120".to_string())
        );
    }

    #[test]
    fn test_unparsable_and_negative_counters_read_as_zero() {
        let (vault, store) = vault_with_store();
        store.set(StorageKeys::SIGN_IN_TRIES, "three").unwrap();
        store.set(StorageKeys::SIGN_IN_SECONDS_REMAINING, "-1").unwrap();
        store.set(StorageKeys::SIGN_IN_SECONDS_ACCUMULATED, " 60 ").unwrap();

        let counters = vault.counters().unwrap();
        assert_eq!(counters.attempt_count, 0);
        assert_eq!(counters.remaining_secs, 0);
        assert_eq!(counters.accumulated_backoff_secs, 60);
    }

    #[test]
    fn test_clear_session_removes_all_five_keys() {
        let (vault, store) = vault_with_store();
        vault.set_token("tok").unwrap();
        vault.set_profile(&Profile::new()).unwrap();
        vault
            .set_counters(&ThrottleCounters {
                attempt_count: 3,
                accumulated_backoff_secs: 60,
                remaining_secs: 60,
            })
            .unwrap();
        store.set("unrelated", "kept").unwrap();

        vault.clear_session().unwrap();

        for key in StorageKeys::ALL {
            assert!(!store.has(key).unwrap(), "{key} should be removed");
        }
        assert!(store.has("unrelated").unwrap());

        // Idempotent
        vault.clear_session().unwrap();
        assert_eq!(store.len(), 1);
    }
}
