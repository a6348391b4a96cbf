//! CLI entry point for the air quality pipeline.
//!
//! Provides subcommands for collecting current readings from the upstream
//! API, cleaning stored raw batches, and printing data quality reports.

use anyhow::Result;
use aqi_pipeline::cleaning;
use aqi_pipeline::collector::AirQualityCollector;
use aqi_pipeline::config::Settings;
use aqi_pipeline::fetch::BasicClient;
use aqi_pipeline::storage::Storage;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "aqi_pipeline")]
#[command(about = "Collects and cleans city air quality data", long_about = None)]
struct Cli {
    /// Path to the JSON settings file
    #[arg(short, long, default_value = "config/settings.json", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch current readings for every configured city and store a raw batch
    Collect {
        /// Stop after storing the raw batch, skipping the cleaning pass
        #[arg(long, default_value_t = false)]
        raw_only: bool,
    },
    /// Run the cleaning pipeline over stored raw data
    Clean {
        /// Single raw batch filename to clean (default: every stored batch)
        #[arg(short, long)]
        batch: Option<String>,

        /// Filename for the cleaned dataset (default: timestamped)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Print a data quality report over stored raw data
    Report {
        /// Single raw batch filename to report on (default: every stored batch)
        #[arg(short, long)]
        batch: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/aqi_pipeline.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("aqi_pipeline.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(&cli.config)?;

    match cli.command {
        Commands::Collect { raw_only } => collect(settings, raw_only).await?,
        Commands::Clean { batch, output } => clean(settings, batch, output)?,
        Commands::Report { batch } => report(settings, batch)?,
    }

    Ok(())
}

/// Runs the full collection workflow: fetch every city, store the raw
/// batch, then (unless `raw_only`) clean it, store the cleaned dataset,
/// and log a quality summary.
#[tracing::instrument(skip(settings))]
async fn collect(settings: Settings, raw_only: bool) -> Result<()> {
    settings.validate()?;

    let storage = Storage::from_settings(&settings);
    let quality = settings.quality.clone();
    let timeout = Duration::from_secs(settings.collection.timeout_seconds);
    let client = BasicClient::new(timeout)?;
    let mut collector = AirQualityCollector::new(client, settings)?;

    info!("collecting raw data from API");
    let batch = collector.fetch_all().await;
    if batch.is_empty() {
        error!("no data collected");
        anyhow::bail!("no data collected for any configured city");
    }

    let raw_path = storage.store_raw(&batch, None)?;

    if !raw_only {
        let raw_name = raw_path
            .file_name()
            .and_then(OsStr::to_str)
            .ok_or_else(|| anyhow::anyhow!("unreadable raw batch path"))?;
        let raw_table = storage.load_raw(raw_name)?;
        let cleaned = cleaning::clean(&raw_table, &quality)?;
        storage.store_processed(&cleaned, None)?;

        let report = cleaning::report(&cleaned);
        info!(
            records = report.total_records,
            cities = report.distinct_cities,
            completeness = report.completeness,
            "data quality summary"
        );
    }

    let stats = collector.call_stats();
    info!(
        calls = stats.calls_made_today,
        max = stats.max_calls_per_day,
        "API usage today"
    );

    Ok(())
}

/// Cleans one batch, or every stored batch combined, and stores the result.
#[tracing::instrument(skip(settings))]
fn clean(settings: Settings, batch: Option<String>, output: Option<String>) -> Result<()> {
    let storage = Storage::from_settings(&settings);
    let table = match &batch {
        Some(name) => storage.load_raw(name)?,
        None => storage.load_all_raw()?,
    };
    if table.is_empty() {
        warn!("no raw data to clean");
        return Ok(());
    }

    let cleaned = cleaning::clean(&table, &settings.quality)?;
    let path = storage.store_processed(&cleaned, output.as_deref())?;

    let report = cleaning::report(&cleaned);
    info!(
        records = report.total_records,
        completeness = report.completeness,
        path = %path.display(),
        "cleaning complete"
    );

    Ok(())
}

/// Logs a quality report as pretty-printed JSON.
#[tracing::instrument(skip(settings))]
fn report(settings: Settings, batch: Option<String>) -> Result<()> {
    let storage = Storage::from_settings(&settings);
    let table = match &batch {
        Some(name) => storage.load_raw(name)?,
        None => storage.load_all_raw()?,
    };

    let report = cleaning::report(&table);
    info!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
