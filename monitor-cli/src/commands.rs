//! Subcommand implementations

use crate::CliError;
use crate::cli::{CollectArgs, SelfTestArgs, ServeArgs};
use crate::collect::{self, CollectMode};
use crate::config::AppConfig;
use crate::selftest::{SelfTest, SelfTestPlan};
use libris_monitor_core::InMemoryLibrary;
use libris_monitor_server::AppState;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Per-request timeout of the self-test client
const SELF_TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Load the library data file
pub async fn load_library(path: &Path) -> Result<Arc<InMemoryLibrary>, CliError> {
    let library = InMemoryLibrary::from_json_file(path).await.map_err(|e| {
        CliError::configuration(format!(
            "Failed to load library data from {}: {e}",
            path.display()
        ))
    })?;
    info!("Loaded library data from {}", path.display());
    Ok(Arc::new(library))
}

/// Build the handler state for `config` over the data file at `data`
pub async fn build_state(config: &AppConfig, data: &Path) -> Result<Arc<AppState>, CliError> {
    let library = load_library(data).await?;
    let state = AppState::new(
        &config.monitoring,
        &config.auth,
        &config.server.environment,
        library,
    )?;
    Ok(Arc::new(state))
}

/// `serve`: run the monitoring API until Ctrl-C
pub async fn serve(mut config: AppConfig, args: ServeArgs) -> Result<(), CliError> {
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(data) = args.data {
        config.data.path = data;
    }
    if config.auth.api_keys.is_empty() && config.auth.jwt_secret.is_none() {
        warn!("No API keys or JWT secret configured; admin endpoints will reject every request");
    }

    let state = build_state(&config, &config.data.path).await?;
    info!(
        "Starting monitoring API ({} environment)",
        config.server.environment
    );
    libris_monitor_server::run(&config.server, state, shutdown_signal()).await?;
    Ok(())
}

/// `collect`: run one collection and print it to stdout
pub async fn collect(config: AppConfig, args: CollectArgs) -> Result<bool, CliError> {
    let data = args.data.clone().unwrap_or_else(|| config.data.path.clone());
    let state = build_state(&config, &data).await?;

    let mut stdout = std::io::stdout();
    collect::run(&state.reporter, CollectMode::from_args(&args), &mut stdout).await
}

/// `self-test`: check a live deployment and print the results
pub async fn self_test(args: SelfTestArgs) -> Result<bool, CliError> {
    let test = SelfTest::new(&args.url, &args.api_key, SELF_TEST_TIMEOUT)?;
    info!("Running self-test against {}", args.url);

    let report = test.run(SelfTestPlan::from_args(&args)).await;
    report.write_to(&mut std::io::stdout())?;
    Ok(report.passed())
}

/// Resolves on Ctrl-C
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}
