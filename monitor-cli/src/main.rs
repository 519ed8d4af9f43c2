//! `libris-monitor` binary

use anyhow::Context;
use clap::Parser;
use libris_monitor_cli::{AppConfig, Cli, Command, commands};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = AppConfig::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;
    config
        .logging
        .initialize()
        .context("failed to initialize logging")?;

    let success = match cli.command {
        Command::Serve(args) => {
            commands::serve(config, args).await?;
            true
        }
        Command::Collect(args) => commands::collect(config, args).await?,
        Command::SelfTest(args) => commands::self_test(args).await?,
    };

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
