//! Recupero - fetch homework and calendar events from the school API.
//!
//! Writes `homework.json` and `events.json` into a data directory that the
//! `agenda` server watches.

mod client;
mod config;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use client::{ApiClient, DateRange, EVENTS, HOMEWORK};
use config::Credentials;

#[derive(Parser)]
#[command(name = "recupero")]
#[command(about = "Fetch homework and events from the school API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch homework and calendar events
    Fetch {
        /// Start date (YYYY-MM-DD)
        /// Default: 7 days ago
        #[arg(long)]
        from: Option<NaiveDate>,

        /// End date (YYYY-MM-DD)
        /// Default: 30 days from now
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Only verify the token, don't download
        #[arg(long)]
        dry_run: bool,

        /// Output directory for data files
        /// Default: ./data
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch {
            from,
            to,
            dry_run,
            output,
        } => {
            if let Err(e) = fetch_command(from, to, dry_run, output).await {
                error!(error = %e, "Fetch failed");
                return Err(e);
            }
        }
    }

    Ok(())
}

async fn fetch_command(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    dry_run: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let credentials = Credentials::from_env().context("Failed to load credentials")?;
    info!(api = %credentials.base_url, "Loaded credentials");

    let client = ApiClient::new(credentials)?;

    if dry_run {
        let profile = client.verify().await.context("Token check failed")?;
        let name = client::profile_name(&profile).unwrap_or("unknown user");
        info!(user = name, "Dry run completed successfully");
        return Ok(());
    }

    let today = chrono::Local::now().date_naive();
    let range = DateRange::resolve(from, to, today)?;
    info!(from = %range.from, to = %range.to, "Date range");

    let output_dir = output.unwrap_or_else(|| PathBuf::from("data"));
    if !output_dir.exists() {
        std::fs::create_dir_all(&output_dir).context("Failed to create output directory")?;
    }
    info!(path = %output_dir.display(), "Output directory");

    // Fetch both before writing so a failure leaves the old files intact
    let homework = client.fetch_collection(HOMEWORK, range).await?;
    let events = client.fetch_collection(EVENTS, range).await?;

    client::save_json(&homework, &output_dir.join(HOMEWORK.file_name))?;
    client::save_json(&events, &output_dir.join(EVENTS.file_name))?;

    Ok(())
}
