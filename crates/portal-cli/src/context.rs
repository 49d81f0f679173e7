//! Per-invocation wiring: paths, config, session and API client.

use anyhow::{Context, Result};
use portal_auth::{ApiClient, DefaultHeaders, LogoutPolicy, SessionStore, ThrottleConfig};
use portal_config::{Config, Paths};
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a command needs.
pub struct AppContext {
    pub paths: Paths,
    pub config: Config,
    pub session: SessionStore,
    pub api: ApiClient,
}

/// Resolve paths and load config. Runs before logging is initialized.
pub fn load_config(base_dir: Option<PathBuf>) -> Result<(Paths, Config)> {
    let paths = match base_dir {
        Some(dir) => Paths::with_base_dir(dir),
        None => Paths::new().context("Could not determine the Portal data directory")?,
    };
    paths.ensure_dirs()?;
    let config = Config::load(&paths)
        .with_context(|| format!("Failed to load {}", paths.config_file().display()))?;
    Ok((paths, config))
}

impl AppContext {
    /// Rehydrate the session and build an API client that shares its headers.
    pub fn open(paths: Paths, config: Config) -> Result<Self> {
        let vault = portal_storage::open_session_vault(&paths.session_store_file())
            .with_context(|| format!("Failed to open {}", paths.session_store_file().display()))?;

        let logout_policy = if config.logout_clears_throttle {
            LogoutPolicy::ClearThrottle
        } else {
            LogoutPolicy::KeepThrottle
        };

        let headers = DefaultHeaders::new();
        let session = SessionStore::with_options(
            vault,
            headers.clone(),
            ThrottleConfig::default(),
            logout_policy,
        );
        let api = ApiClient::new(config.api_base_url()?, Arc::new(headers));

        tracing::debug!(
            api = %api.base_url(),
            store = %paths.session_store_file().display(),
            "Context ready"
        );

        Ok(Self {
            paths,
            config,
            session,
            api,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_auth::LoginPayload;
    use portal_storage::Profile;

    #[tokio::test]
    async fn test_context_persists_session_under_base_dir() {
        let dir = tempfile::tempdir().unwrap();

        let (paths, config) = load_config(Some(dir.path().to_path_buf())).unwrap();
        let ctx = AppContext::open(paths, config).unwrap();
        ctx.session.login(&LoginPayload::new("t", Profile::new()));
        assert!(ctx.paths.session_store_file().exists());
        drop(ctx);

        let (paths, config) = load_config(Some(dir.path().to_path_buf())).unwrap();
        let reopened = AppContext::open(paths, config).unwrap();
        assert!(reopened.session.is_authenticated());
        assert_eq!(reopened.session.logout_policy(), LogoutPolicy::KeepThrottle);
    }

    #[tokio::test]
    async fn test_logout_policy_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let (paths, mut config) = load_config(Some(dir.path().to_path_buf())).unwrap();
        config.logout_clears_throttle = true;

        let ctx = AppContext::open(paths, config).unwrap();
        assert_eq!(ctx.session.logout_policy(), LogoutPolicy::ClearThrottle);
    }
}
