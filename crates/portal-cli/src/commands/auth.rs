//! Session commands: status, sign-in, Google sign-in, logout.

use super::{secret, value_or_prompt};
use crate::context::AppContext;
use crate::output::{self, CliNotifier, OutputFormat};
use anyhow::Result;
use portal_auth::{
    lockout_message, login_with_google, sign_in_with_password, AccountApi, GoogleCredential,
    GoogleLoginRequest, SessionSnapshot, SignInAction, SignInCredentials,
};
use std::io::{self, Write};

/// Show the session and throttle state.
pub async fn status(ctx: &AppContext, format: &OutputFormat) -> Result<()> {
    let snapshot = ctx.session.snapshot();

    match format {
        OutputFormat::Json => output::print_value(&serde_json::json!({
            "session": snapshot,
            "api_base_url": ctx.api.base_url().as_str(),
            "store": ctx.paths.session_store_file(),
        })),
        OutputFormat::Text => {
            output::print_heading("Session");
            if snapshot.is_authenticated {
                output::print_row("Signed in", "yes");
                output::print_row("User", &output::field(&snapshot.profile, "email"));
                output::print_row("Id", &output::field(&snapshot.profile, "id"));
            } else {
                output::print_row("Signed in", "no");
            }

            output::print_heading("Sign-in throttle");
            output::print_row("Attempts", &snapshot.attempt_count.to_string());
            output::print_row("Backoff", &format!("{}s", snapshot.accumulated_backoff_secs));
            if snapshot.is_throttled {
                let until = chrono::Local::now()
                    + chrono::Duration::seconds(i64::from(snapshot.remaining_secs));
                output::print_row(
                    "Locked",
                    &format!(
                        "{}s remaining (until {})",
                        snapshot.remaining_secs,
                        until.format("%H:%M:%S")
                    ),
                );
            } else {
                output::print_row("Locked", "no");
            }

            output::print_heading("Backend");
            output::print_row("API", ctx.api.base_url().as_str());
        }
    }
    Ok(())
}

/// Password or passcode sign-in. An active lockout is waited out unless
/// `wait` is false; the countdown only advances while a process runs it.
pub async fn sign_in(
    ctx: &AppContext,
    email: Option<String>,
    use_passcode: bool,
    wait: bool,
    format: &OutputFormat,
) -> Result<()> {
    if ctx.session.is_authenticated() {
        let email = output::field(&ctx.session.profile(), "email");
        output::print_success(&format!("Already signed in as {}", email), format);
        return Ok(());
    }

    // Resume any lockout persisted by a previous run
    ctx.session.attempt_sign_in(SignInAction::Initial);

    if ctx.session.is_throttled() {
        if !wait {
            output::print_warning(
                &format!(
                    "{} Rerun without --no-wait to wait it out.",
                    lockout_message(ctx.session.remaining_secs())
                ),
                format,
            );
            return Ok(());
        }
        wait_for_lockout(ctx, format).await;
    }

    let email = value_or_prompt(email, "Email: ", "Email")?;
    let credentials = if use_passcode {
        SignInCredentials::passcode(email, secret("Passcode: ", "Passcode")?)
    } else {
        SignInCredentials::password(email, secret("Password: ", "Password")?)
    };

    let account = AccountApi::new(ctx.api.clone());
    let notifier = CliNotifier::new(*format);
    if let Some(route) = sign_in_with_password(&account, &ctx.session, &notifier, &credentials).await {
        tracing::debug!(route = %route, "Sign-in finished");
        if *format == OutputFormat::Text {
            output::print_row("Signed in as", &output::field(&ctx.session.profile(), "email"));
        }
    }
    Ok(())
}

/// Block until the lockout ends, showing the countdown in text mode.
async fn wait_for_lockout(ctx: &AppContext, format: &OutputFormat) {
    if *format == OutputFormat::Text {
        ctx.session.set_change_callback(Box::new(|snapshot: &SessionSnapshot| {
            eprint!("\rLocked, {:>4}s remaining ", snapshot.remaining_secs);
            let _ = io::stderr().flush();
        }));
    }

    let opened = ctx.session.wait_until_open().await;
    if *format == OutputFormat::Text {
        eprintln!();
    }
    if !opened {
        tracing::warn!("Lockout countdown is not running");
    }
}

/// Exchange a Google ID token for a session.
pub async fn google_login(
    ctx: &AppContext,
    credential: Option<String>,
    decode: bool,
    format: &OutputFormat,
) -> Result<()> {
    let Some(credential) = credential.filter(|c| !c.trim().is_empty()) else {
        anyhow::bail!(
            "A Google ID token is required (--credential or PORTAL_GOOGLE_CREDENTIAL), issued for client {}",
            ctx.config.google_client_id
        );
    };
    let credential = GoogleCredential::new(credential);

    let request = if decode {
        GoogleLoginRequest::decoded(&credential)?
    } else {
        GoogleLoginRequest::raw(credential)
    };

    let notifier = CliNotifier::new(*format);
    if login_with_google(&ctx.api, &ctx.session, &notifier, &request)
        .await
        .is_some()
        && *format == OutputFormat::Text
    {
        output::print_row("Signed in as", &output::field(&ctx.session.profile(), "email"));
    }
    Ok(())
}

/// Drop the session.
pub async fn logout(ctx: &AppContext, format: &OutputFormat) -> Result<()> {
    let was_authenticated = ctx.session.is_authenticated();
    ctx.session.logout();
    if was_authenticated {
        output::print_success("Logged out successfully", format);
    } else {
        output::print_success("Not signed in", format);
    }
    Ok(())
}
