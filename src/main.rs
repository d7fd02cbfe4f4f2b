//! Lectern CLI entry point.

use anyhow::Result;
use clap::Parser;
use lectern::cli::commands::{self, AskFlags};
use lectern::cli::{Cli, Commands};
use lectern::config::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_ref().map(PathBuf::from);
    let mut settings = Settings::load_from(config_path.as_ref())?;
    if let Some(url) = &cli.backend_url {
        settings.backend.base_url = url.clone();
    }

    // Initialize logging; -v flags win over the configured level
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("lectern={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Execute command
    match cli.command {
        Commands::Books => {
            commands::run_books(settings).await?;
        }

        Commands::Stats { book } => {
            commands::run_stats(&book, settings).await?;
        }

        Commands::Status { book } => {
            commands::run_status(&book, settings).await?;
        }

        Commands::Embed { book } => {
            commands::run_embed(&book, settings).await?;
        }

        Commands::Delete { book, yes } => {
            commands::run_delete(&book, yes, settings).await?;
        }

        Commands::Upload { path } => {
            commands::run_upload(&path, settings).await?;
        }

        Commands::Voices => {
            commands::run_voices(settings).await?;
        }

        Commands::Ask { question, books, voice, no_audio, play, download } => {
            let flags = AskFlags { books, voice, no_audio, play, download };
            commands::run_ask(&question, flags, settings).await?;
        }

        Commands::Search { query, books } => {
            commands::run_search(&query, &books, settings).await?;
        }

        Commands::Listen { books, voice } => {
            commands::run_listen(books, voice, settings).await?;
        }

        Commands::Health => {
            commands::run_health(&settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, settings, config_path)?;
        }
    }

    Ok(())
}
