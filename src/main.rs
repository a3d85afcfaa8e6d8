use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use gotham::api::{Funnel, RateLimiter};
use gotham::auth::{TokenService, TokenVerifier, Vault};
use gotham::config::BackendConfig;
use gotham::controllers::{
    AuthController, ClockController, Controller, SecurityController, TeamController,
    WorkingTimeController,
};
use gotham::server;
use gotham::services::{
    MemoryClockRepository, MemoryTeamRepository, MemoryUserRepository,
    MemoryWorkingTimeRepository, NewUser, UserDirectory, UserRepository,
};
use gotham::state::{BackendState, StateHandle};

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(version, about = "Time-tracking API backend", long_about = None)]
struct Args {
    /// Path to the TOML config file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match BackendConfig::load(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::error!(path = %path.display(), error = %err, "failed to load config");
                return ExitCode::FAILURE;
            }
        },
        None => BackendConfig::default(),
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "backend failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: BackendConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = StateHandle::new();

    let vault = Vault::new(&config.auth.password.salt, config.auth.password.rounds);
    let users = Arc::new(MemoryUserRepository::new(vault));
    let tokens = Arc::new(TokenService::new(
        &config.auth.secret,
        chrono::Duration::seconds(config.auth.token_ttl_secs),
    ));
    let clocks = Arc::new(MemoryClockRepository::new());
    let working_times = Arc::new(MemoryWorkingTimeRepository::new());
    let teams = Arc::new(MemoryTeamRepository::new());

    if let Some(admin) = &config.auth.first_admin {
        let created = users
            .create(NewUser {
                username: admin.username.to_lowercase(),
                email: admin.email.clone(),
                password: admin.password.clone(),
                role: admin.role.clone(),
            })
            .await?;
        tracing::info!(username = %created.username, role = %created.role, "bootstrap admin created");
    }

    let controllers: Vec<Arc<dyn Controller>> = vec![
        Arc::new(AuthController::new(
            Arc::clone(&users) as Arc<dyn UserRepository>,
            Arc::clone(&tokens),
            &config.auth,
        )),
        Arc::new(SecurityController::new(
            Arc::clone(&users) as Arc<dyn UserRepository>,
            config.permissions.clone(),
            config.auth.username.clone(),
            config.auth.password.clone(),
        )),
        Arc::new(ClockController::new(
            Arc::clone(&users) as Arc<dyn UserDirectory>,
            Arc::clone(&clocks) as Arc<dyn gotham::services::ClockRepository>,
            Arc::clone(&working_times) as Arc<dyn gotham::services::WorkingTimeRepository>,
        )),
        Arc::new(WorkingTimeController::new(
            Arc::clone(&users) as Arc<dyn UserDirectory>,
            Arc::clone(&working_times) as Arc<dyn gotham::services::WorkingTimeRepository>,
        )),
        Arc::new(TeamController::new(
            Arc::clone(&teams) as Arc<dyn gotham::services::TeamRepository>,
            Arc::clone(&users) as Arc<dyn UserDirectory>,
        )),
    ];

    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limits.clone()));
    let reset_task = rate_limiter.spawn_reset_task();

    let funnel = Funnel::new(
        &controllers,
        config.permissions.clone(),
        Arc::clone(&tokens) as Arc<dyn TokenVerifier>,
        Arc::clone(&users) as Arc<dyn UserDirectory>,
        state.clone(),
        Arc::clone(&rate_limiter),
    )?;

    state.set(BackendState::Running);
    server::serve(&config.server, Arc::new(funnel), state).await?;

    reset_task.abort();
    tracing::info!("backend stopped");
    Ok(())
}
