//! CLI command implementations.

mod account;
mod auth;
mod navigation;
mod settings;
mod users;

pub use account::{change_password, forgot_password, reset_password, sign_on};
pub use auth::{google_login, logout, sign_in, status};
pub use navigation::open;
pub use settings::{config_set, config_show, ConfigChanges};
pub use users::{users_create, users_list, users_me, users_show, users_update};

use anyhow::Result;
use std::io::{self, Write};

/// Read one trimmed line from stdin.
fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Use `value` if given, otherwise prompt. Empty input is an error.
fn value_or_prompt(value: Option<String>, label: &str, name: &str) -> Result<String> {
    let value = match value {
        Some(value) => value.trim().to_string(),
        None => prompt(label)?,
    };
    if value.is_empty() {
        anyhow::bail!("{} is required", name);
    }
    Ok(value)
}

/// Read a secret without echo. Empty input is an error.
fn secret(label: &str, name: &str) -> Result<String> {
    let value = rpassword::prompt_password(label)?;
    if value.is_empty() {
        anyhow::bail!("{} is required", name);
    }
    Ok(value)
}

/// Read a new password twice.
fn new_password() -> Result<String> {
    let password = secret("New password: ", "Password")?;
    let confirmation = rpassword::prompt_password("Confirm password: ")?;
    if password != confirmation {
        anyhow::bail!("Passwords do not match");
    }
    Ok(password)
}
