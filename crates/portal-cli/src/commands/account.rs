//! Account commands: registration and password management.

use super::{new_password, secret, value_or_prompt};
use crate::context::AppContext;
use crate::output::{self, CliNotifier, OutputFormat};
use anyhow::Result;
use portal_auth::{register_account, AccountApi, SignOnRequest, RESET_EMAIL_SUBJECT};

/// Register a new account and sign in.
pub async fn sign_on(
    ctx: &AppContext,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    verify: bool,
    format: &OutputFormat,
) -> Result<()> {
    let account = AccountApi::new(ctx.api.clone());
    let email = value_or_prompt(email, "Email: ", "Email")?;

    if verify {
        let expected = account.send_verification_code(&email).await.map_err(|e| {
            anyhow::anyhow!(e.api_message().unwrap_or_else(|| e.to_string()))
        })?;
        output::print_info(&format!("A verification code was sent to {}", email), format);
        let entered = value_or_prompt(None, "Verification code: ", "Verification code")?;
        if expected.as_deref() != Some(entered.as_str()) {
            anyhow::bail!("Verification code does not match");
        }
    }

    let request = SignOnRequest {
        email,
        first_name: value_or_prompt(first_name, "First name: ", "First name")?,
        last_name: value_or_prompt(last_name, "Last name: ", "Last name")?,
        password: new_password()?,
    };

    let notifier = CliNotifier::new(*format);
    register_account(&account, &ctx.session, &notifier, &request).await;
    Ok(())
}

/// Email a one-time passcode for password reset or passcode sign-in.
pub async fn forgot_password(ctx: &AppContext, email: Option<String>, format: &OutputFormat) -> Result<()> {
    let email = value_or_prompt(email, "Email: ", "Email")?;
    let account = AccountApi::new(ctx.api.clone());

    match account.send_passcode(&email, RESET_EMAIL_SUBJECT).await {
        Ok(message) => {
            output::print_success(message.as_deref().unwrap_or("Password code sent"), format);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to send passcode");
            output::print_error(&e.api_message().unwrap_or_else(|| e.to_string()), format);
        }
    }
    Ok(())
}

/// Set a new password using an emailed passcode.
pub async fn reset_password(ctx: &AppContext, passcode: Option<String>, format: &OutputFormat) -> Result<()> {
    let passcode = value_or_prompt(passcode, "Passcode: ", "Passcode")?;
    let password = new_password()?;
    let account = AccountApi::new(ctx.api.clone());

    match account.reset_password(&passcode, &password).await {
        Ok(message) => {
            output::print_success(message.as_deref().unwrap_or("Password reset successful"), format);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Password reset failed");
            output::print_error(&e.api_message().unwrap_or_else(|| e.to_string()), format);
        }
    }
    Ok(())
}

/// Change the password of the signed-in account.
pub async fn change_password(ctx: &AppContext, format: &OutputFormat) -> Result<()> {
    if !ctx.session.is_authenticated() {
        output::print_error("Not signed in. Run 'portal sign-in' first", format);
        return Ok(());
    }

    let current = secret("Current password: ", "Current password")?;
    let password = new_password()?;
    let account = AccountApi::new(ctx.api.clone());

    match account.update_password(&current, &password).await {
        Ok(message) => {
            output::print_success(message.as_deref().unwrap_or("Password updated successfully"), format);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Password change failed");
            output::print_error(&e.api_message().unwrap_or_else(|| e.to_string()), format);
        }
    }
    Ok(())
}
