//! CLI command definitions and dispatch for the `flc` binary.
//!
//! Uses clap derive macros for argument parsing. Commands are grouped by
//! area (`flc services list`, `flc orders show 12`), with the session
//! commands at the top level (`flc login`, `flc whoami`).

pub mod auth;
pub mod orders;
pub mod services;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use console::style;

use freelance_types::error::ApiError;

/// Browse services and manage orders on the freelance marketplace.
#[derive(Parser)]
#[command(name = "flc", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export tracing spans to stdout through OpenTelemetry.
    #[arg(long, global = true, hide = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with email and password.
    Login {
        /// Account email (prompted when omitted; defaults to the remembered email).
        #[arg(long)]
        email: Option<String>,

        /// Password (prompted securely when omitted).
        #[arg(long, env = "FREELANCE_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Keep the session for this process only.
        #[arg(long)]
        no_remember: bool,
    },

    /// Sign in with a third-party provider authorization code.
    #[command(name = "social-login")]
    SocialLogin {
        /// Provider: wechat, qq or alipay.
        provider: String,

        /// Authorization code returned by the provider.
        #[arg(long)]
        code: String,

        /// OAuth state echoed by the provider.
        #[arg(long)]
        state: Option<String>,

        /// Redirect URI used when requesting the code.
        #[arg(long)]
        redirect_uri: Option<String>,
    },

    /// Create a new account (interactive).
    Register {
        /// Register as a freelancer instead of a client.
        #[arg(long)]
        freelancer: bool,
    },

    /// Sign out and forget the stored session.
    Logout,

    /// Show the signed-in user.
    Whoami {
        /// Re-validate the session against the backend.
        #[arg(long)]
        check: bool,
    },

    /// Refresh the access token now.
    Refresh,

    /// Update profile fields of the signed-in user.
    Profile {
        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        bio: Option<String>,
    },

    /// Password reset and change.
    Password {
        #[command(subcommand)]
        action: auth::PasswordCommand,
    },

    /// Email verification.
    Verify {
        #[command(subcommand)]
        action: auth::VerifyCommand,
    },

    /// Browse and search service listings.
    #[command(alias = "svc")]
    Services {
        #[command(subcommand)]
        action: services::ServicesCommand,
    },

    /// View and manage your orders.
    Orders {
        #[command(subcommand)]
        action: orders::OrdersCommand,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Render an error the way every command reports failures.
///
/// Validation failures list one line per field; an expired session adds a
/// hint to sign in again.
pub fn print_api_error(err: &ApiError, json: bool) {
    if json {
        let value = match err {
            ApiError::Validation(errors) => serde_json::json!({
                "error": "validation",
                "fields": errors.0,
            }),
            other => serde_json::json!({
                "error": other.to_string(),
                "status": other.status(),
            }),
        };
        eprintln!("{value}");
        return;
    }

    eprintln!();
    match err {
        ApiError::Validation(errors) => {
            eprintln!("  {} Please fix the following:", style("✗").red().bold());
            for (field, message) in &errors.0 {
                eprintln!("    {} {}", style(format!("{field}:")).bold(), message);
            }
        }
        ApiError::SessionExpired => {
            eprintln!("  {} {err}", style("✗").red().bold());
            eprintln!("     Sign in with: {}", style("flc login").yellow());
        }
        other => eprintln!("  {} {other}", style("✗").red().bold()),
    }
    eprintln!();
}

/// Stop with a hint when no session is held.
pub fn require_login(state: &crate::state::AppState) -> anyhow::Result<()> {
    if state.auth.is_authenticated() {
        return Ok(());
    }
    anyhow::bail!("Not signed in. Run `flc login` first.")
}

/// Shorten `s` to at most `max` characters, marking the cut with `...`.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
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
    fn test_parses_nested_commands() {
        let cli = Cli::try_parse_from(["flc", "--json", "services", "list", "--search", "logo"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Services { .. }));

        let cli = Cli::try_parse_from(["flc", "orders", "cancel", "12", "--reason", "late"]).unwrap();
        assert!(matches!(cli.command, Commands::Orders { .. }));

        let cli = Cli::try_parse_from(["flc", "orders", "create", "7", "--package", "2"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Orders {
                action: orders::OrdersCommand::Create {
                    service: 7,
                    package: 2,
                    requirements: None
                }
            }
        ));

        let cli = Cli::try_parse_from(["flc", "svc", "like", "7", "--undo"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Services {
                action: services::ServicesCommand::Like { id: 7, undo: true }
            }
        ));
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("网站设计与开发服务", 6), "网站设...");
    }
}
