//! Configuration, filesystem paths, and logging bootstrap for Portal.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, DEFAULT_API_BASE_URL, DEFAULT_GOOGLE_CLIENT_ID, DEFAULT_LOG_LEVEL, ENV_API_URL,
    ENV_LOG_LEVEL,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
