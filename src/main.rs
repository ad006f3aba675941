//! CLI entry point for the e-bus fleet dashboard pipeline.
//!
//! Provides subcommands for summarizing a trip log, exporting the chart
//! datasets, streaming trajectory animation frames, and watching a dataset
//! for changes.

use anyhow::Result;
use clap::{Parser, Subcommand};
use ebus_fleet::animation::{AnimationConfig, AnimationDriver};
use ebus_fleet::loader::{FleetLoader, RowPolicy};
use ebus_fleet::output::{
    FleetSnapshot, JsonLinesSink, append_snapshot, export_all, print_json, print_pretty,
};
use ebus_fleet::stats::FleetStats;
use std::ffi::OsStr;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tokio::io::{AsyncWrite, BufWriter};
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "ebus_fleet")]
#[command(about = "Aggregates an e-bus fleet trip log into dashboard datasets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a trip-record CSV and print the fleet statistics
    Summary {
        /// Path to the df_final CSV (optionally .gz)
        #[arg(value_name = "RECORDS")]
        records: String,

        /// Print as JSON instead of debug format
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Write every chart dataset to CSV plus a JSON report
    Export {
        /// Path to the df_final CSV (optionally .gz)
        #[arg(value_name = "RECORDS")]
        records: String,

        /// Directory to write the datasets into
        #[arg(short = 'd', long, default_value = "dashboard")]
        output_dir: String,
    },
    /// Stream trajectory animation frames as JSON lines
    Animate {
        /// Path to the trips CSV (optionally .gz)
        #[arg(value_name = "TRIPS")]
        trips: String,

        /// Clock increment per frame, in seconds
        #[arg(long, default_value_t = 60)]
        time_step: i64,

        /// Trailing window drawn per frame, in seconds
        #[arg(long, default_value_t = 120)]
        trail_length: i64,

        /// Wall-clock delay between frames, in milliseconds
        #[arg(long, default_value_t = 100)]
        frame_delay_ms: u64,

        /// What to do with malformed trajectory rows
        #[arg(long, value_enum, default_value_t = RowPolicy::Abort)]
        on_bad_row: RowPolicy,

        /// File to write frames to (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Re-read a trip-record CSV periodically and log a summary when it changes
    Watch {
        /// Path to the df_final CSV (optionally .gz)
        #[arg(value_name = "RECORDS")]
        records: String,

        /// Check the file every X seconds
        #[arg(short = 'r', long, default_value_t = 60)]
        refresh_rate: u64,

        /// Number of checks (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 0)]
        num_checks: usize,

        /// Optional: CSV file to append a snapshot to on every change
        #[arg(long)]
        history: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/ebus_fleet.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("ebus_fleet.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let loader = FleetLoader::new();

    match cli.command {
        Commands::Summary { records, json } => {
            let rows = loader.trip_records(Path::new(&records))?;
            let stats = FleetStats::from_records(&rows);

            if json {
                print_json(&stats)?;
            } else {
                print_pretty(&stats);
            }
            log_summary(&stats);
        }
        Commands::Export {
            records,
            output_dir,
        } => {
            let rows = loader.trip_records(Path::new(&records))?;
            let stats = FleetStats::from_records(&rows);
            export_all(Path::new(&output_dir), &stats)?;
            log_summary(&stats);
        }
        Commands::Animate {
            trips,
            time_step,
            trail_length,
            frame_delay_ms,
            on_bad_row,
            output,
        } => {
            let config = AnimationConfig {
                time_step,
                trail_length,
                frame_delay: Duration::from_millis(frame_delay_ms),
            };
            let paths = loader.trip_paths(Path::new(&trips), on_bad_row)?;
            let driver = AnimationDriver::new(paths, config)?;

            let writer: FrameWriter = match output {
                Some(path) => Box::new(BufWriter::new(tokio::fs::File::create(path).await?)),
                None => Box::new(tokio::io::stdout()),
            };

            animate(driver, JsonLinesSink::new(writer)).await?;
        }
        Commands::Watch {
            records,
            refresh_rate,
            num_checks,
            history,
        } => {
            watch(&loader, &records, refresh_rate, num_checks, history.as_deref()).await?;
        }
    }

    Ok(())
}

fn log_summary(stats: &FleetStats) {
    info!(
        total_records = stats.total_records,
        electric = stats.electric_count(),
        electric_pct = stats.electric_pct(),
        models = stats.electric_models.len(),
        electric_co2_kg = stats.electric_emissions.total_kg(),
        non_electric_co2_kg = stats.non_electric_emissions.total_kg(),
        "Fleet summary"
    );
}

type FrameWriter = Box<dyn AsyncWrite + Unpin + Send>;

/// Runs the animation until it passes `max_time` or Ctrl+C stops it.
#[tracing::instrument(skip_all, fields(max_time = ?driver.max_time()))]
async fn animate(driver: AnimationDriver, sink: JsonLinesSink<FrameWriter>) -> Result<()> {
    let mut handle = driver.spawn(sink);

    let summary = tokio::select! {
        summary = handle.wait() => summary?,
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received, stopping animation");
            handle.stop();
            handle.wait().await?
        }
    };

    info!(
        frames = summary.frames_emitted,
        last_time = ?summary.last_time,
        stopped = summary.stopped,
        "Animation done"
    );
    Ok(())
}

/// Re-reads the dataset through the loader cache at a fixed interval.
#[tracing::instrument(skip(loader, history))]
async fn watch(
    loader: &FleetLoader,
    records: &str,
    refresh_rate: u64,
    num_checks: usize,
    history: Option<&str>,
) -> Result<()> {
    let path = Path::new(records);
    let mut check_count = 0;
    let mut last_seen: Option<SystemTime> = None;

    if num_checks == 0 {
        info!(refresh_rate, "Watching indefinitely. Press Ctrl+C to stop.");
    }

    loop {
        // Check if we've reached the limit (0 = infinite)
        if num_checks > 0 && check_count >= num_checks {
            break;
        }
        check_count += 1;

        let modified = std::fs::metadata(path).and_then(|m| m.modified());
        match modified {
            Ok(modified) if last_seen == Some(modified) => {
                info!(check = check_count, "Dataset unchanged");
            }
            Ok(modified) => match loader.trip_records(path) {
                Ok(rows) => {
                    let stats = FleetStats::from_records(&rows);
                    log_summary(&stats);
                    if let Some(history) = history {
                        if let Err(e) = append_snapshot(history, &FleetSnapshot::from(&stats)) {
                            error!(error = %e, "Failed to append history snapshot");
                        }
                    }
                    last_seen = Some(modified);
                }
                Err(e) => error!(error = %e, "Dataset load failed"),
            },
            Err(e) => warn!(error = %e, "Dataset not readable"),
        }

        if num_checks == 0 || check_count < num_checks {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl+C received, stopping watch");
                    break;
                }
                _ = tokio::time::sleep(Duration::from_secs(refresh_rate)) => {}
            }
        }
    }

    info!(checks = check_count, "Finished watching");
    Ok(())
}
