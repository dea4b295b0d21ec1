//! CLI entry point for the heat-stress pipeline.
//!
//! Provides the two pipeline stages as subcommands: aggregating sub-daily
//! observations into daily statistics, and characterizing daily statistics
//! into exposure categories, summary statistics, and plots.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use heatstress::analyzers::characterize;
use heatstress::analyzers::classify::ThresholdConfig;
use heatstress::{
    output::write_daily_csv,
    parser::read_raw_csv,
    stats::aggregate_daily,
};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// File name of the stage-1 artifact, fixed by the pipeline handoff.
const DAILY_STATS_FILE: &str = "daily_WBGT_THI_stats.csv";

#[derive(Parser)]
#[command(name = "heatstress")]
#[command(about = "Daily aggregation and exposure characterization of heat-stress data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate sub-daily WBGT/THI observations into daily statistics
    Aggregate {
        /// Input CSV file (sub-daily observations)
        #[arg(long)]
        input: PathBuf,

        /// Output directory for daily_WBGT_THI_stats.csv (created if absent)
        #[arg(long)]
        outdir: PathBuf,

        /// Parse ambiguous datetimes day-first (D/M/Y)
        #[arg(long, default_value_t = false)]
        dayfirst: bool,
    },
    /// Characterize daily statistics into categories, summary, and plots
    Characterize {
        /// Input daily statistics CSV (from the aggregate stage)
        #[arg(long)]
        input: PathBuf,

        /// Output directory for CSVs and the plots/ subfolder (created if absent)
        #[arg(long)]
        outdir: PathBuf,

        /// Optional JSON file overriding the exposure threshold tables
        #[arg(long)]
        thresholds: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/heatstress.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("heatstress.log"));

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

    match cli.command {
        Commands::Aggregate {
            input,
            outdir,
            dayfirst,
        } => {
            std::fs::create_dir_all(&outdir)?;

            let table = read_raw_csv(&input, dayfirst)?;
            if table.skipped_rows > 0 {
                warn!(skipped = table.skipped_rows, "malformed input rows skipped");
            }

            let daily = aggregate_daily(&table);
            let out_csv = outdir.join(DAILY_STATS_FILE);
            write_daily_csv(&out_csv, &table.indices, &daily)?;

            info!(
                readings = table.readings.len(),
                skipped = table.skipped_rows,
                days = daily.len(),
                path = %out_csv.display(),
                "aggregation complete"
            );
        }
        Commands::Characterize {
            input,
            outdir,
            thresholds,
        } => {
            let config = match thresholds {
                Some(path) => {
                    info!(path = %path.display(), "loading threshold tables");
                    ThresholdConfig::load(&path)?
                }
                None => ThresholdConfig::default(),
            };

            let report = characterize::run(&input, &outdir, &config)?;

            info!(
                days = report.days,
                skipped = report.skipped_rows,
                plots = report.plots,
                outdir = %outdir.display(),
                "characterization complete"
            );
        }
    }

    Ok(())
}
