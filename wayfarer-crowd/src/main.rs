//! wayfarer-crowd - crowd forecast diagnostic runner
//!
//! Runs one aggregation against the configured BestTime and Gemini
//! accounts and prints the resulting `WeeklyForecast` (or `null`) as JSON.
//!
//! **Usage:**
//! ```bash
//! wayfarer-crowd --name "Louvre" --city Paris --timezone Europe/Paris
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wayfarer_crowd::{AttractionIdentity, CrowdConfig, ForecastOrchestrator};

/// Crowd forecast for one attraction
#[derive(Parser, Debug)]
#[clap(name = "wayfarer-crowd")]
#[clap(about = "Aggregate a weekly crowd forecast for one attraction")]
struct Args {
    /// Attraction name as stored
    #[clap(long)]
    name: String,

    /// Canonical name from a places lookup
    #[clap(long)]
    resolved_name: Option<String>,

    /// Street address
    #[clap(long)]
    address: Option<String>,

    /// City the attraction belongs to
    #[clap(long)]
    city: Option<String>,

    /// IANA timezone of the attraction (default UTC)
    #[clap(long)]
    timezone: Option<String>,

    /// Config file (default: $WAYFARER_CONFIG or the user config dir)
    #[clap(long, value_name = "FILE", env = "WAYFARER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = CrowdConfig::load_toml(args.config.as_deref())?;
    let log_level = CrowdConfig::log_level(&toml_config);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .init();

    info!(
        "Starting wayfarer-crowd v{} ({} {}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE"),
        env!("BUILD_TIMESTAMP")
    );

    let config = CrowdConfig::from_toml(&toml_config);
    let orchestrator = ForecastOrchestrator::from_config(&config)?;

    let mut attraction = AttractionIdentity::new(args.name);
    attraction.resolved_name = args.resolved_name;
    attraction.address = args.address;
    attraction.city_name = args.city;

    let forecast = orchestrator
        .aggregate_now(&attraction, args.timezone.as_deref())
        .await;

    println!("{}", serde_json::to_string_pretty(&forecast)?);
    Ok(())
}
