//! Spoor CLI - capture wildlife field reports offline and push them when back online

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::auth_cmd::run_auth;
use crate::commands::common::resolve_db_path;
use crate::commands::config::run_config;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(
        "spoor=info"
            .parse()
            .map_err(|error| CliError::Config(format!("Invalid log directive: {error}")))?,
    );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    let db_path = || resolve_db_path(cli.db_path.clone());

    match cli.command {
        Commands::Add(args) => run_add(args, profile, &db_path()?).await?,
        Commands::List {
            limit,
            status,
            json,
        } => run_list(limit, status.map(Into::into), json, &db_path()?).await?,
        Commands::Edit { id, notes } => run_edit(&id, notes, &db_path()?).await?,
        Commands::Status { json } => run_status(json, &db_path()?).await?,
        Commands::Sync { watch, interval } => {
            run_sync(watch, interval, profile, &db_path()?).await?;
        }
        Commands::Config { command } => run_config(command, profile)?,
        Commands::Auth { command } => run_auth(command, profile).await?,
    }

    Ok(())
}
