//! chatvault CLI - archive Microsoft Teams chats and render them as HTML
//!
//! `chatvault download` mirrors chats into `<output-dir>/data`;
//! `chatvault generate-html` renders them into `<output-dir>/html`.

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use chatvault_core::sync::SyncOptions;
use chatvault_core::ArchiveConfig;
use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::download::run_download;
use crate::commands::generate::run_generate_html;
use crate::error::CliError;

const DEFAULT_LOG_FILTER: &str = "chatvault=info";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    let config = ArchiveConfig::from_env()?.with_access_token(cli.token);
    tracing::debug!("Loaded configuration: {:?}", config);

    match cli.command {
        Commands::Download {
            force,
            trust_preview,
        } => {
            let options = SyncOptions {
                force,
                trust_last_message_preview: trust_preview,
            };
            run_download(&config, &cli.output_dir, options).await?;
        }
        Commands::GenerateHtml => {
            run_generate_html(&config, &cli.output_dir).await?;
        }
    }

    Ok(())
}
