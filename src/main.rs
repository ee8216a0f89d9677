use anyhow::{Context, Result};
use caltasks::config::AppConfig;
use caltasks::credentials::{CredentialManager, FileCredentialStore};
use caltasks::google::GoogleOAuth;
use caltasks::pipeline;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "caltasks")]
#[command(about = "Copy the events of an iCalendar feed into a new Google Tasks list")]
struct Cli {
    /// Config file (defaults to ~/.config/caltasks/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let http = reqwest::Client::new();
    let credentials = CredentialManager::new(
        FileCredentialStore::new(config.token_path()),
        GoogleOAuth::new(http.clone(), config.client_secret_path()),
    );

    let outcome = pipeline::run(&config, &http, &credentials).await?;

    if outcome.is_completed() {
        println!("{}", outcome);
    } else {
        eprintln!("{}", outcome);
    }

    Ok(())
}
