//! Freelance marketplace command-line client.
//!
//! Binary name: `flc`
//!
//! Parses CLI arguments, wires the session and listing stores, then
//! dispatches to the command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;
use console::style;
use tokio::sync::broadcast;

use cli::{Cli, Commands};
use freelance_observe::{LogFormat, TracingOptions, init_tracing, shutdown_tracing};
use freelance_types::error::ApiError;
use freelance_types::event::SessionEvent;
use freelance_types::user::UserPatch;
use state::AppState;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut options = TracingOptions::from_verbosity(cli.verbose, cli.quiet);
    if cli.log_json {
        options.format = LogFormat::Json;
    }
    options.enable_otel = cli.otel;
    if let Err(e) = init_tracing(&options) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    let json = cli.json;
    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            match e.downcast_ref::<ApiError>() {
                Some(api_error) => cli::print_api_error(api_error, json),
                None => eprintln!("Error: {e:#}"),
            }
            1
        }
    };

    shutdown_tracing();
    std::process::exit(code);
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "flc", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init().await?;
    let mut events = state.events.subscribe();
    let json = cli.json;

    let result = dispatch(cli.command, &state, json).await;
    report_session_events(&mut events, json);
    result
}

async fn dispatch(command: Commands, state: &AppState, json: bool) -> anyhow::Result<()> {
    match command {
        Commands::Login {
            email,
            password,
            no_remember,
        } => cli::auth::login(state, email, password, no_remember, json).await,

        Commands::SocialLogin {
            provider,
            code,
            state: oauth_state,
            redirect_uri,
        } => cli::auth::social_login(state, &provider, code, oauth_state, redirect_uri, json).await,

        Commands::Register { freelancer } => cli::auth::register(state, freelancer, json).await,

        Commands::Logout => cli::auth::logout(state, json).await,

        Commands::Whoami { check } => cli::auth::whoami(state, check, json).await,

        Commands::Refresh => cli::auth::refresh(state, json).await,

        Commands::Profile {
            first_name,
            last_name,
            phone,
            bio,
        } => {
            let patch = UserPatch {
                first_name,
                last_name,
                phone,
                bio,
                ..Default::default()
            };
            cli::auth::update_profile(state, patch, json).await
        }

        Commands::Password { action } => cli::auth::handle_password_command(action, state, json).await,

        Commands::Verify { action } => cli::auth::handle_verify_command(action, state, json).await,

        Commands::Services { action } => {
            cli::services::handle_services_command(action, state, json).await
        }

        Commands::Orders { action } => cli::orders::handle_orders_command(action, state, json).await,

        Commands::Completions { .. } => Ok(()),
    }
}

/// Print a sign-in hint when the session was dropped during the command.
fn report_session_events(events: &mut broadcast::Receiver<SessionEvent>, json: bool) {
    let mut login_required = false;
    while let Ok(event) = events.try_recv() {
        tracing::debug!(?event, "session event");
        if matches!(event, SessionEvent::LoginRequired { .. }) {
            login_required = true;
        }
    }
    if login_required && !json {
        eprintln!(
            "  {} Session ended. Sign in again with: {}",
            style("i").blue().bold(),
            style("flc login").yellow()
        );
    }
}
