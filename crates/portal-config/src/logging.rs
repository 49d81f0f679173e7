//! Logging initialization for the client.
//!
//! Thin wrapper over the observability crate: every Portal process writes
//! structured JSONL to `~/.portal/logs/portal.jsonl` and mirrors it to stderr
//! when asked.

use crate::Paths;
use observability::LogConfig;

const SERVICE_NAME: &str = "portal";

/// Initialize the logging system.
///
/// * `level` - Default log level (trace, debug, info, warn, error); `RUST_LOG` wins.
/// * `also_stderr` - Mirror log lines to stderr.
///
/// ```ignore
/// init_logging("info", &paths, false);
/// tracing::info!("portal started");
/// ```
pub fn init_logging(level: &str, paths: &Paths, also_stderr: bool) {
    observability::init_with_config(LogConfig {
        service_name: SERVICE_NAME.into(),
        default_level: parse_level(level).as_str().to_ascii_lowercase(),
        log_path: Some(paths.log_file()),
        also_stderr,
    });
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
