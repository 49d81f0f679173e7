//! Configuration management for the Portal client.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Default backend API root. Endpoint paths such as `users/` are joined onto it.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/";

/// OAuth client id handed to the identity-provider widget (compile-time override via
/// `PORTAL_GOOGLE_CLIENT_ID`).
pub const DEFAULT_GOOGLE_CLIENT_ID: &str = match option_env!("PORTAL_GOOGLE_CLIENT_ID") {
    Some(id) => id,
    None => "portal-dev.apps.googleusercontent.com",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable overriding `log_level`.
pub const ENV_LOG_LEVEL: &str = "PORTAL_LOG_LEVEL";

/// Environment variable overriding `api_base_url`.
pub const ENV_API_URL: &str = "PORTAL_API_URL";

/// Client configuration, stored as JSON at `~/.portal/config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Backend API root URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Client id of the third-party identity provider.
    #[serde(default = "default_google_client_id")]
    pub google_client_id: String,
    /// Whether logging out also zeroes the sign-in throttle counters.
    ///
    /// Off by default: attempts are counted before authentication, so a
    /// logout should not hand an attacker a fresh set of free retries.
    #[serde(default)]
    pub logout_clears_throttle: bool,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_google_client_id() -> String {
    DEFAULT_GOOGLE_CLIENT_ID.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_base_url: default_api_base_url(),
            google_client_id: default_google_client_id(),
            logout_clears_throttle: false,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from a variable lookup. Blank values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(log_level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = log_level;
        }
        if let Some(api_url) = lookup(ENV_API_URL) {
            self.api_base_url = api_url;
        }
    }

    /// The API root as a parsed URL, always ending in `/` so relative
    /// endpoint paths join underneath it.
    pub fn api_base_url(&self) -> CoreResult<Url> {
        let mut raw = self.api_base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw)?;
        if url.cannot_be_a_base() {
            return Err(CoreError::Config(format!(
                "API URL cannot be used as a base: {}",
                self.api_base_url
            )));
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.google_client_id, DEFAULT_GOOGLE_CLIENT_ID);
        assert!(!config.logout_clears_throttle);
    }

    #[test]
    fn test_config_load_from_file_fills_missing_fields() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");

        std::fs::write(&config_path, r#"{ "log_level": "debug" }"#).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert!(!config.logout_clears_throttle);
    }

    #[test]
    fn test_config_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config {
            log_level: "trace".to_string(),
            api_base_url: "https://portal.example.com/api/".to_string(),
            google_client_id: "client-123".to_string(),
            logout_clears_throttle: true,
        };
        config.save(&paths).unwrap();

        let loaded = Config::load_from_file(&paths.config_file()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.google_client_id, DEFAULT_GOOGLE_CLIENT_ID);
    }

    #[test]
    fn test_config_load_rejects_malformed_file() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        paths.ensure_dirs().unwrap();
        std::fs::write(paths.config_file(), "{not json").unwrap();

        assert!(matches!(Config::load(&paths), Err(CoreError::Json(_))));
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::default();
        config.apply_overrides(|name| match name {
            ENV_LOG_LEVEL => Some("debug".to_string()),
            ENV_API_URL => Some(" https://api.example.com/v2 ".to_string()),
            _ => None,
        });

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.api_base_url, "https://api.example.com/v2");
    }

    #[test]
    fn test_apply_overrides_ignores_blank_values() {
        let mut config = Config::default();
        config.apply_overrides(|_| Some("   ".to_string()));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_api_base_url_gets_trailing_slash() {
        let config = Config {
            api_base_url: "https://api.example.com/v2".to_string(),
            ..Config::default()
        };
        let url = config.api_base_url().unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v2/");
        assert_eq!(
            url.join("users/").unwrap().as_str(),
            "https://api.example.com/v2/users/"
        );
    }

    #[test]
    fn test_config_invalid_url() {
        let config = Config {
            api_base_url: "not a valid url".to_string(),
            ..Config::default()
        };
        assert!(config.api_base_url().is_err());
    }
}
