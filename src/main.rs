// Entry point of the sales operations command line.
//
// **Architecture Overview:**
// - `core/` = Business logic (storage and API agnostic)
// - `infra/` = Implementations of core traits (Google APIs, Gemini, SQLite, files)
// - `cli/` = Argument parsing and command handlers
//
// This file loads the environment, sets up logging and hands the parsed
// command to the CLI layer.

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "cli/cli_layer.rs"]
mod cli;
mod config;
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{AppContext, Cli};
use crate::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Logs go to stderr; stdout carries command output.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sales_ops_automations=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    tracing::debug!(time_zone = %config.time_zone, data_dir = %config.data_dir.display(), "Configuration loaded");

    if !config.has_service_account() {
        tracing::debug!("No service account configured; Google commands will fail");
    }

    let ctx = AppContext::new(config);
    cli::run(cli.command, &ctx).await
}
