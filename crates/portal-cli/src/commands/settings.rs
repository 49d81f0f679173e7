//! `portal config` commands.

use crate::output::{self, OutputFormat};
use anyhow::{Context, Result};
use portal_config::{Config, Paths};

/// Print the effective configuration, environment overrides included.
pub async fn config_show(paths: &Paths, config: &Config, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => output::print_value(&serde_json::json!({
            "config": config,
            "config_file": paths.config_file(),
            "session_store": paths.session_store_file(),
            "log_file": paths.log_file(),
        })),
        OutputFormat::Text => {
            output::print_heading("Configuration");
            output::print_row("API", &config.api_base_url);
            output::print_row("Google client", &config.google_client_id);
            output::print_row("Log level", &config.log_level);
            output::print_row(
                "Logout resets",
                if config.logout_clears_throttle { "yes" } else { "no" },
            );

            output::print_heading("Files");
            output::print_row("Config", &paths.config_file().display().to_string());
            output::print_row("Session", &paths.session_store_file().display().to_string());
            output::print_row("Log", &paths.log_file().display().to_string());
        }
    }
    Ok(())
}

/// Changes accepted by `portal config set`.
#[derive(Debug, Default)]
pub struct ConfigChanges {
    pub api_url: Option<String>,
    pub google_client_id: Option<String>,
    pub log_level: Option<String>,
    pub logout_clears_throttle: Option<bool>,
}

/// Write changes to the config file. Environment overrides are not persisted.
pub async fn config_set(paths: &Paths, changes: ConfigChanges, format: &OutputFormat) -> Result<()> {
    let config_file = paths.config_file();
    let mut config = if config_file.exists() {
        Config::load_from_file(&config_file)
            .with_context(|| format!("Failed to read {}", config_file.display()))?
    } else {
        Config::default()
    };

    apply_changes(&mut config, changes)?;
    config.save(paths)?;

    output::print_success(&format!("Saved {}", config_file.display()), format);
    Ok(())
}

fn apply_changes(config: &mut Config, changes: ConfigChanges) -> Result<()> {
    if let Some(api_url) = changes.api_url {
        config.api_base_url = api_url;
        config.api_base_url()?;
    }
    if let Some(client_id) = changes.google_client_id {
        config.google_client_id = client_id;
    }
    if let Some(level) = changes.log_level {
        config.log_level = portal_config::parse_level(&level).as_str().to_ascii_lowercase();
    }
    if let Some(clears) = changes.logout_clears_throttle {
        config.logout_clears_throttle = clears;
    }
    Ok(())
}
