//! User directory commands.

use crate::context::AppContext;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use portal_storage::Profile;
use portal_users::UserDirectory;
use serde_json::Value;

fn require_session(ctx: &AppContext, format: &OutputFormat) -> bool {
    if ctx.session.is_authenticated() {
        return true;
    }
    output::print_error("Not signed in. Run 'portal sign-in' first", format);
    false
}

fn print_profile(profile: &Profile, format: &OutputFormat) {
    match format {
        OutputFormat::Json => output::print_value(profile),
        OutputFormat::Text => {
            for (key, _) in profile.iter() {
                output::print_row(key, &output::field(profile, key));
            }
        }
    }
}

/// List all profiles.
pub async fn users_list(ctx: &AppContext, format: &OutputFormat) -> Result<()> {
    if !require_session(ctx, format) {
        return Ok(());
    }

    let mut directory = UserDirectory::new(ctx.api.clone());
    directory.init(&ctx.session).await;
    if !directory.is_loaded() {
        anyhow::bail!("Could not load users from {}", ctx.api.base_url());
    }

    match format {
        OutputFormat::Json => output::print_value(&directory.users()),
        OutputFormat::Text => {
            if directory.users().is_empty() {
                println!("No users.");
                return Ok(());
            }
            println!("{:<8} {:<32} NAME", "ID", "EMAIL");
            output::print_divider();
            for user in directory.users() {
                println!(
                    "{:<8} {:<32} {} {}",
                    output::field(user, "id"),
                    output::field(user, "email"),
                    output::field(user, "first_name"),
                    output::field(user, "last_name"),
                );
            }
        }
    }
    Ok(())
}

/// Show one profile by id.
pub async fn users_show(ctx: &AppContext, id: String, format: &OutputFormat) -> Result<()> {
    if !require_session(ctx, format) {
        return Ok(());
    }

    let mut directory = UserDirectory::new(ctx.api.clone());
    let user = directory.require_user(&ctx.session, &Value::String(id)).await?;
    print_profile(&user, format);
    Ok(())
}

/// Show the directory entry of the signed-in user.
pub async fn users_me(ctx: &AppContext, format: &OutputFormat) -> Result<()> {
    if !require_session(ctx, format) {
        return Ok(());
    }

    let mut directory = UserDirectory::new(ctx.api.clone());
    directory.init(&ctx.session).await;
    match directory.current_user() {
        Some(user) => print_profile(user, format),
        None => {
            // Fall back to the profile stored at sign-in
            output::print_warning("Signed-in user is not in the directory", format);
            print_profile(&ctx.session.profile(), format);
        }
    }
    Ok(())
}

/// Create a profile from the given fields.
pub async fn users_create(ctx: &AppContext, form: Profile, format: &OutputFormat) -> Result<()> {
    if !require_session(ctx, format) {
        return Ok(());
    }

    let mut directory = UserDirectory::new(ctx.api.clone());
    let status = directory.try_create_user(&ctx.session, &form).await?;
    output::print_success(&format!("User created ({})", status), format);
    Ok(())
}

/// Update a profile. Unset fields keep their current values.
pub async fn users_update(ctx: &AppContext, id: String, changes: Profile, format: &OutputFormat) -> Result<()> {
    if !require_session(ctx, format) {
        return Ok(());
    }

    let mut directory = UserDirectory::new(ctx.api.clone());
    let mut form = directory.require_user(&ctx.session, &Value::String(id)).await?;
    form.extend(changes);

    let status = directory.try_update_user(&ctx.session, &form).await?;
    output::print_success(&format!("User updated ({})", status), format);
    Ok(())
}
