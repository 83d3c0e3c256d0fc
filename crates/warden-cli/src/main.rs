//! Warden CLI - Import legacy punishment histories into one store.

use clap::Parser;
use tracing_subscriber::EnvFilter;
use warden_cli::commands;
use warden_cli::{Cli, Command, Config, Formatter};

#[tokio::main]
async fn main() {
    // Initialize tracing (log to stderr, stdout carries command output)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> warden_cli::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load or create config
    let mut config = Config::load().unwrap_or_else(|_| {
        let cfg = Config::default();
        cfg.save().ok();
        cfg
    });

    // Determine output format
    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);

    // Determine color setting
    let color_enabled = !cli.no_color && config.settings.color;

    // Create formatter
    let formatter = Formatter::new(format, color_enabled);

    // Flags and environment override the saved defaults
    let store = cli.store.unwrap_or_else(|| config.store.clone());
    let import_config = cli.config.unwrap_or_else(|| config.import_config.clone());

    match cli.command {
        Command::Import(args) => {
            commands::execute_import(args, &store, &import_config, &formatter).await?;
        }
        Command::Entries(args) => {
            commands::execute_entries(args, &store, &formatter).await?;
        }
        Command::History(args) => {
            commands::execute_history(args, &store, &formatter).await?;
        }
        Command::Config(args) => {
            commands::execute_config(args, &mut config, &formatter).await?;
        }
    }

    Ok(())
}
