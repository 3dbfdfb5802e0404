//! Session commands: login, social login, register, logout, whoami, profile,
//! password and email verification.

use anyhow::Result;
use clap::Subcommand;
use console::style;
use dialoguer::{Confirm, Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;

use freelance_core::auth::validation::{self, RegisterForm};
use freelance_types::auth::{
    LoginCredentials, PasswordChange, PasswordResetConfirm, PasswordStrength, RegisterData,
    SocialAuthData, SocialProvider,
};
use freelance_types::user::{User, UserPatch, UserType};

use super::require_login;
use crate::state::AppState;

#[derive(Subcommand)]
pub enum PasswordCommand {
    /// Email a password reset link.
    Reset {
        /// Account email.
        email: String,
    },

    /// Set a new password with the token from the reset email.
    Confirm {
        /// Reset token.
        token: String,
    },

    /// Change the password of the signed-in user.
    Change,
}

#[derive(Subcommand)]
pub enum VerifyCommand {
    /// Confirm an email address with the token from the verification email.
    Email {
        /// Verification token.
        token: String,
    },

    /// Send the verification email again.
    Resend,
}

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

fn print_user(user: &User, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(user)?);
        return Ok(());
    }
    println!();
    println!("  {}  {}", style("Name:").bold(), style(user.display_name()).cyan());
    println!("  {}  @{}", style("User:").bold(), user.username);
    println!("  {}  {}", style("Email:").bold(), user.email);
    println!("  {}  {}", style("Role:").bold(), user.user_type);
    println!(
        "  {}  {}",
        style("Verified:").bold(),
        if user.is_verified {
            style("yes").green()
        } else {
            style("no").yellow()
        }
    );
    if !user.is_profile_complete() {
        println!(
            "  {} Profile incomplete. Update it with: {}",
            style("i").blue().bold(),
            style("flc profile --first-name ... --last-name ...").yellow()
        );
    }
    println!();
    Ok(())
}

pub async fn login(
    state: &AppState,
    email: Option<String>,
    password: Option<String>,
    no_remember: bool,
    json: bool,
) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => {
            let mut input = Input::<String>::new().with_prompt("Email");
            if let Some(remembered) = state.auth.session().remembered_email {
                input = input.default(remembered);
            }
            input.interact_text()?
        }
    };
    let password = match password {
        Some(password) => password,
        None => Password::new().with_prompt("Password").interact()?,
    };

    let spinner = spinner("Signing in...");
    let result = state
        .auth
        .login(LoginCredentials::new(email, password, !no_remember))
        .await;
    spinner.finish_and_clear();
    let user = result?;

    if json {
        println!(
            "{}",
            serde_json::json!({"signed_in": true, "user": user, "remember_me": !no_remember})
        );
    } else {
        println!(
            "  {} Signed in as {}",
            style("✓").green().bold(),
            style(user.display_name()).cyan()
        );
        if no_remember {
            println!(
                "     {}",
                style("Session kept for this process only.").dim()
            );
        }
    }
    Ok(())
}

pub async fn social_login(
    state: &AppState,
    provider: &str,
    code: String,
    oauth_state: Option<String>,
    redirect_uri: Option<String>,
    json: bool,
) -> Result<()> {
    let provider: SocialProvider = provider.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let spinner = spinner(&format!("Signing in with {provider}..."));
    let result = state
        .auth
        .social_login(
            provider,
            SocialAuthData {
                code,
                state: oauth_state,
                redirect_uri,
            },
        )
        .await;
    spinner.finish_and_clear();
    let user = result?;

    if json {
        println!(
            "{}",
            serde_json::json!({"signed_in": true, "provider": provider, "user": user})
        );
    } else {
        println!(
            "  {} Signed in with {} as {}",
            style("✓").green().bold(),
            provider,
            style(user.display_name()).cyan()
        );
    }
    Ok(())
}

fn strength_label(strength: PasswordStrength) -> console::StyledObject<&'static str> {
    match strength {
        PasswordStrength::Weak => style("weak").red(),
        PasswordStrength::Medium => style("medium").yellow(),
        PasswordStrength::Strong => style("strong").green(),
    }
}

pub async fn register(state: &AppState, freelancer: bool, json: bool) -> Result<()> {
    let username: String = Input::new().with_prompt("Username").interact_text()?;
    let email: String = Input::new().with_prompt("Email").interact_text()?;
    let first_name: String = Input::new().with_prompt("First name").interact_text()?;
    let last_name: String = Input::new().with_prompt("Last name").interact_text()?;
    let phone: String = Input::new()
        .with_prompt("Mobile number (optional)")
        .allow_empty(true)
        .interact_text()?;
    let password = Password::new().with_prompt("Password").interact()?;

    let (strength, score) = validation::password_strength(&password);
    if !json {
        println!(
            "  Password strength: {} ({score}/9)",
            strength_label(strength)
        );
    }
    let confirm = Password::new().with_prompt("Confirm password").interact()?;
    let agree_to_terms = Confirm::new()
        .with_prompt("Do you accept the terms of service?")
        .default(false)
        .interact()?;

    let form = RegisterForm {
        data: RegisterData {
            username,
            email,
            password: SecretString::from(password),
            first_name,
            last_name,
            user_type: if freelancer {
                UserType::Freelancer
            } else {
                UserType::Client
            },
            phone: (!phone.trim().is_empty()).then(|| phone.trim().to_string()),
        },
        confirm_password: SecretString::from(confirm),
        agree_to_terms,
    };

    let spinner = spinner("Creating account...");
    let result = state.auth.register(form).await;
    spinner.finish_and_clear();
    let user = result?;

    if json {
        println!("{}", serde_json::json!({"registered": true, "user": user}));
    } else {
        println!(
            "  {} Welcome, {}! Check {} for a verification email.",
            style("✓").green().bold(),
            style(user.display_name()).cyan(),
            style(&user.email).bold()
        );
    }
    Ok(())
}

pub async fn logout(state: &AppState, json: bool) -> Result<()> {
    let was_signed_in = state.auth.is_authenticated();
    state.auth.logout().await;

    if json {
        println!("{}", serde_json::json!({"signed_out": true, "was_signed_in": was_signed_in}));
    } else if was_signed_in {
        println!("  {} Signed out", style("✓").green().bold());
    } else {
        println!("  {} No active session", style("i").blue().bold());
    }
    Ok(())
}

pub async fn whoami(state: &AppState, check: bool, json: bool) -> Result<()> {
    if check {
        let spinner = spinner("Checking session...");
        let result = state.auth.check_auth_status().await;
        spinner.finish_and_clear();
        if !result? {
            if json {
                println!("{}", serde_json::json!({"signed_in": false}));
            } else {
                println!("  {} Not signed in", style("i").blue().bold());
            }
            return Ok(());
        }
    }

    match state.auth.user().filter(|_| state.auth.is_authenticated()) {
        Some(user) => print_user(&user, json),
        None => {
            if json {
                println!("{}", serde_json::json!({"signed_in": false}));
            } else {
                println!(
                    "  {} Not signed in. Sign in with: {}",
                    style("i").blue().bold(),
                    style("flc login").yellow()
                );
            }
            Ok(())
        }
    }
}

pub async fn refresh(state: &AppState, json: bool) -> Result<()> {
    state.auth.refresh_access_token().await?;
    if json {
        println!("{}", serde_json::json!({"refreshed": true}));
    } else {
        println!("  {} Access token refreshed", style("✓").green().bold());
    }
    Ok(())
}

pub async fn update_profile(state: &AppState, patch: UserPatch, json: bool) -> Result<()> {
    require_login(state)?;
    if patch == UserPatch::default() {
        anyhow::bail!("Nothing to update. Pass at least one field, e.g. --bio \"...\"");
    }
    if !state.auth.update_profile(patch).await? {
        anyhow::bail!("Not signed in. Run `flc login` first.");
    }
    match state.auth.user() {
        Some(user) => print_user(&user, json),
        None => Ok(()),
    }
}

pub async fn handle_password_command(cmd: PasswordCommand, state: &AppState, json: bool) -> Result<()> {
    let message = match cmd {
        PasswordCommand::Reset { email } => {
            state.auth.request_password_reset(&email).await?;
            format!("If {email} has an account, a reset link is on its way")
        }
        PasswordCommand::Confirm { token } => {
            let new_password = prompt_new_password()?;
            state
                .auth
                .confirm_password_reset(PasswordResetConfirm {
                    token,
                    new_password,
                })
                .await?;
            "Password reset. Sign in with your new password".to_string()
        }
        PasswordCommand::Change => {
            require_login(state)?;
            let old_password = Password::new().with_prompt("Current password").interact()?;
            let new_password = prompt_new_password()?;
            state
                .auth
                .change_password(PasswordChange {
                    old_password: SecretString::from(old_password),
                    new_password,
                })
                .await?;
            "Password changed".to_string()
        }
    };

    if json {
        println!("{}", serde_json::json!({"ok": true, "message": message}));
    } else {
        println!("  {} {message}", style("✓").green().bold());
    }
    Ok(())
}

fn prompt_new_password() -> Result<SecretString> {
    let password = Password::new()
        .with_prompt("New password")
        .with_confirmation("Confirm new password", "Passwords do not match")
        .interact()?;
    let (strength, _) = validation::password_strength(&password);
    eprintln!("  Password strength: {}", strength_label(strength));
    Ok(SecretString::from(password))
}

pub async fn handle_verify_command(cmd: VerifyCommand, state: &AppState, json: bool) -> Result<()> {
    let message = match cmd {
        VerifyCommand::Email { token } => {
            state.auth.verify_email(&token).await?;
            "Email verified".to_string()
        }
        VerifyCommand::Resend => {
            require_login(state)?;
            state.auth.resend_verification().await?;
            "Verification email sent".to_string()
        }
    };

    if json {
        println!("{}", serde_json::json!({"ok": true, "message": message}));
    } else {
        println!("  {} {message}", style("✓").green().bold());
    }
    Ok(())
}
