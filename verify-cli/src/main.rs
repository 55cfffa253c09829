//! `verify` - operator CLI for email verification sessions.

#![allow(clippy::print_stdout, reason = "CLI tool outputs to stdout")]

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod config_commands;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    verify_core::modules::logger::init_logging(&cli.log_level).map_err(|e| anyhow::anyhow!(e))?;

    match cli.command {
        Commands::Watch { subject, api_key, id_token, project_id } => {
            commands::watch(&cli.config, &subject, &api_key, &id_token, &project_id).await
        },
        Commands::Simulate { verify_after, fail_transient, poll_interval_ms, max_attempts } => {
            let overrides =
                commands::SimulateOverrides { poll_interval_ms, max_attempts };
            commands::simulate(&cli.config, verify_after, fail_transient, overrides).await
        },
        Commands::Config { json, write } => {
            config_commands::show_config(&cli.config, json)?;
            if write {
                config_commands::write_config(&cli.config)?;
            }
            Ok(())
        },
    }
}
