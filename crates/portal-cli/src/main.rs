//! Portal CLI - sign in to the Portal backend and browse user profiles.

mod commands;
mod context;
mod output;

use clap::{Parser, Subcommand};
use portal_auth::Route;
use portal_storage::Profile;
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;

/// Portal CLI - Manage your Portal session and user profiles.
#[derive(Parser)]
#[command(name = "portal")]
#[command(about = "Portal CLI for authentication and user profiles")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error). Defaults to the config value
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Data directory (defaults to ~/.portal)
    #[arg(long, env = "PORTAL_HOME", global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show session and sign-in throttle state
    Status,

    /// Sign in with email and password
    SignIn {
        /// Account email
        #[arg(short, long)]
        email: Option<String>,
        /// Use an emailed passcode instead of the password
        #[arg(long)]
        passcode: bool,
        /// Give up on an active lockout instead of waiting it out
        #[arg(long)]
        no_wait: bool,
    },

    /// Sign in with a Google ID token
    GoogleLogin {
        /// Google ID token (JWT)
        #[arg(long, env = "PORTAL_GOOGLE_CREDENTIAL", hide_env_values = true)]
        credential: Option<String>,
        /// Send the decoded identity instead of the raw token
        #[arg(long)]
        decode: bool,
    },

    /// Logout and clear the stored session
    Logout,

    /// Create a new account
    SignOn {
        #[arg(short, long)]
        email: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        /// Confirm the email with a verification code first
        #[arg(long)]
        verify: bool,
    },

    /// Email a password reset passcode
    ForgotPassword {
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Set a new password with an emailed passcode
    ResetPassword {
        #[arg(long)]
        passcode: Option<String>,
    },

    /// Change the password of the signed-in account
    ChangePassword,

    /// Resolve a route through the sign-in guard
    Open {
        /// Route name or path (home, sign_in, sign_on, profile, forget_password)
        route: Route,
    },

    /// Browse and edit user profiles
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// List users
    List,
    /// Show a user
    Show {
        /// User ID
        id: String,
    },
    /// Show the signed-in user
    Me,
    /// Create a profile
    Create {
        #[arg(short, long)]
        email: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        /// Extra fields as key=value
        #[arg(long = "set", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },
    /// Update a profile
    Update {
        /// User ID
        id: String,
        #[arg(short, long)]
        email: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        /// Extra fields as key=value
        #[arg(long = "set", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Change configuration values
    Set {
        /// Backend API root URL
        #[arg(long)]
        api_url: Option<String>,
        /// Google OAuth client id
        #[arg(long)]
        google_client_id: Option<String>,
        /// Default log level
        #[arg(long)]
        log_level: Option<String>,
        /// Whether logout also resets the sign-in throttle
        #[arg(long)]
        logout_clears_throttle: Option<bool>,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

/// Build a profile form from named fields. Unset fields are left out.
fn profile_form(
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    fields: Vec<(String, String)>,
) -> Profile {
    let mut form = Profile::new();
    for (key, value) in fields {
        form.insert(key, Value::String(value));
    }
    let named = [
        ("email", email),
        ("first_name", first_name),
        ("last_name", last_name),
    ];
    for (key, value) in named {
        if let Some(value) = value {
            form.insert(key.to_string(), Value::String(value));
        }
    }
    form
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let (paths, config) = context::load_config(cli.base_dir)?;

    let log_level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    portal_config::init_logging(log_level, &paths, false);
    debug!(base_dir = %paths.base_dir().display(), "Portal CLI starting");

    let format = cli.format;
    let command = match cli.command {
        // Config commands must work even when the stored config is unusable
        Commands::Config { command } => {
            return match command {
                ConfigCommands::Show => commands::config_show(&paths, &config, &format).await,
                ConfigCommands::Set {
                    api_url,
                    google_client_id,
                    log_level,
                    logout_clears_throttle,
                } => {
                    let changes = commands::ConfigChanges {
                        api_url,
                        google_client_id,
                        log_level,
                        logout_clears_throttle,
                    };
                    commands::config_set(&paths, changes, &format).await
                }
            };
        }
        other => other,
    };

    let ctx = context::AppContext::open(paths, config)?;

    match command {
        Commands::Status => commands::status(&ctx, &format).await,
        Commands::SignIn {
            email,
            passcode,
            no_wait,
        } => commands::sign_in(&ctx, email, passcode, !no_wait, &format).await,
        Commands::GoogleLogin { credential, decode } => {
            commands::google_login(&ctx, credential, decode, &format).await
        }
        Commands::Logout => commands::logout(&ctx, &format).await,
        Commands::SignOn {
            email,
            first_name,
            last_name,
            verify,
        } => commands::sign_on(&ctx, email, first_name, last_name, verify, &format).await,
        Commands::ForgotPassword { email } => commands::forgot_password(&ctx, email, &format).await,
        Commands::ResetPassword { passcode } => {
            commands::reset_password(&ctx, passcode, &format).await
        }
        Commands::ChangePassword => commands::change_password(&ctx, &format).await,
        Commands::Open { route } => commands::open(&ctx, route, &format).await,
        Commands::Users { command } => match command {
            UserCommands::List => commands::users_list(&ctx, &format).await,
            UserCommands::Show { id } => commands::users_show(&ctx, id, &format).await,
            UserCommands::Me => commands::users_me(&ctx, &format).await,
            UserCommands::Create {
                email,
                first_name,
                last_name,
                fields,
            } => {
                let form = profile_form(Some(email), first_name, last_name, fields);
                commands::users_create(&ctx, form, &format).await
            }
            UserCommands::Update {
                id,
                email,
                first_name,
                last_name,
                fields,
            } => {
                let changes = profile_form(email, first_name, last_name, fields);
                commands::users_update(&ctx, id, changes, &format).await
            }
        },
        Commands::Config { .. } => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("phone=555 0100").unwrap(),
            ("phone".to_string(), "555 0100".to_string())
        );
        assert_eq!(parse_key_value("note=a=b").unwrap().1, "a=b");
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_profile_form_named_fields_win() {
        let form = profile_form(
            Some("a@b.c".into()),
            None,
            Some("Lovelace".into()),
            vec![("email".into(), "x@y.z".into()), ("phone".into(), "1".into())],
        );
        assert_eq!(form["email"], "a@b.c");
        assert_eq!(form["last_name"], "Lovelace");
        assert_eq!(form["phone"], "1");
        assert!(!form.contains_key("first_name"));
    }

    #[test]
    fn test_sign_in_waits_unless_told_not_to() {
        let cli = Cli::try_parse_from(["portal", "sign-in", "-e", "a@b.c"]).unwrap();
        assert!(matches!(cli.command, Commands::SignIn { no_wait: false, .. }));

        let cli = Cli::try_parse_from(["portal", "sign-in", "--no-wait"]).unwrap();
        assert!(matches!(cli.command, Commands::SignIn { no_wait: true, .. }));
    }

    #[test]
    fn test_open_parses_route_names_and_paths() {
        let cli = Cli::try_parse_from(["portal", "open", "sign-in"]).unwrap();
        assert!(matches!(cli.command, Commands::Open { route: Route::SignIn }));

        let cli = Cli::try_parse_from(["portal", "--format", "json", "open", "/profile"]).unwrap();
        assert!(matches!(cli.command, Commands::Open { route: Route::Profile }));
        assert_eq!(cli.format, output::OutputFormat::Json);

        assert!(Cli::try_parse_from(["portal", "open", "nowhere"]).is_err());
    }
}
