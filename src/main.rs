//! CLI entry point for rssi-logger
//!
//! Provides commands for:
//! - Listing serial ports a transceiver may be attached to
//! - Recording a timed log from a transceiver (or the built-in simulator)
//! - Computing RSSI statistics of a log and appending them to the summary table
//!
//! # Usage
//!
//! ```bash
//! rssi-logger ports
//! rssi-logger record --port /dev/ttyUSB0 --name site_a --duration 30 \
//!     --lat1 -22.412345 --long1 -45.449876
//! rssi-logger stats --name site_a
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rssi_logger::analysis::StatisticsExtractor;
use rssi_logger::config::{AppConfig, DEFAULT_CONFIG_PATH};
use rssi_logger::error::LoggerError;
use rssi_logger::logging;
use rssi_logger::session::{
    spawn_session, SessionConfig, SessionEvent, SessionSlot, SystemClock, Termination,
};
use rssi_logger::source::{list_ports, SerialOpener, SimulatedOpener, SourceOpener};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "rssi-logger")]
#[command(about = "Timed LoRa RSSI capture and statistics", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the configured log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Override the configured log format (pretty, compact, json)
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available serial ports
    Ports,

    /// Record a log from a transceiver
    Record {
        /// Serial port, e.g. "/dev/ttyUSB0" or "COM3" (extra words after the name are ignored)
        #[arg(long)]
        port: String,

        /// Log name; written to `<output_dir>/<name>.txt`
        #[arg(long)]
        name: String,

        /// Sampling time in seconds (defaults to the configured value)
        #[arg(long)]
        duration: Option<u32>,

        /// Transceiver 1 latitude
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        lat1: String,

        /// Transceiver 1 longitude
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        long1: String,

        /// Transceiver 2 latitude
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        lat2: String,

        /// Transceiver 2 longitude
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        long2: String,

        /// Read from a simulated transceiver instead of the serial port
        #[arg(long)]
        simulate: bool,

        /// Seed for the simulated transceiver's readings
        #[arg(long, requires = "simulate")]
        seed: Option<u64>,
    },

    /// Compute statistics of a recorded log and append them to the summary table
    Stats {
        /// Log name, without extension
        #[arg(long)]
        name: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let result = run(Cli::parse()).await;
    if let Err(e) = &result {
        if e
            .downcast_ref::<LoggerError>()
            .is_some_and(LoggerError::is_recoverable)
        {
            eprintln!("Check the arguments or the device and try again.");
        }
    }
    result
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load_from(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    if let Some(level) = cli.log_level {
        config.application.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.application.log_format = format;
    }
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;
    logging::init_from_config(&config).map_err(anyhow::Error::msg)?;

    match cli.command {
        Commands::Ports => show_ports(),
        Commands::Record {
            port,
            name,
            duration,
            lat1,
            long1,
            lat2,
            long2,
            simulate,
            seed,
        } => {
            let duration = duration.unwrap_or(config.acquisition.default_duration_secs);
            if !config.is_allowed_duration(duration) {
                bail!(
                    "sampling time {} s is not one of {:?}",
                    duration,
                    config.acquisition.allowed_durations_secs
                );
            }

            let session = SessionConfig::builder(port, name)
                .duration_secs(duration)
                .station1(lat1, long1)
                .station2(lat2, long2)
                .output_dir(config.storage.output_dir.clone())
                .build();

            if simulate {
                let opener = match seed {
                    Some(seed) => SimulatedOpener::new().with_seed(seed),
                    None => SimulatedOpener::new(),
                };
                record(session, opener).await
            } else {
                record(session, SerialOpener).await
            }
        }
        Commands::Stats { name, json } => show_stats(&config, &name, json),
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn show_ports() -> Result<()> {
    let ports = list_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{}", port);
    }
    Ok(())
}

async fn record<O>(session: SessionConfig, opener: O) -> Result<()>
where
    O: SourceOpener + 'static,
{
    let path = session.log_path();
    let slot = SessionSlot::new();
    let mut handle = spawn_session(&slot, session, opener, SystemClock::new())?;

    let stop = handle.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl+C received, finishing log");
            stop.request_stop();
        }
    });

    let mut shown = None;
    while let Some(event) = handle.next_event().await {
        match event {
            SessionEvent::Line(line) => {
                eprint!("\r");
                println!("{}", line);
            }
            SessionEvent::Progress(percent) => {
                let whole = percent.floor() as u32;
                if shown != Some(whole) {
                    shown = Some(whole);
                    eprint!("\rProgress: {:>3}%", whole);
                    std::io::stderr().flush().ok();
                }
            }
            SessionEvent::StateChanged(state) => debug!(?state, "Session state"),
            SessionEvent::Completed(_) => eprintln!(),
        }
    }

    let report = handle
        .wait()
        .await
        .with_context(|| format!("recording {}", path.display()))?;

    match report.termination {
        Termination::DeadlineReached => println!("Log completed: {}", report.path.display()),
        Termination::Interrupted => println!("Log stopped early: {}", report.path.display()),
    }
    println!(
        "{} lines in {:.1} s",
        report.lines_written,
        report.elapsed.as_secs_f64()
    );
    if report.write_failures > 0 {
        warn!(count = report.write_failures, "Some lines could not be written");
    }
    Ok(())
}

fn show_stats(config: &AppConfig, name: &str, json: bool) -> Result<()> {
    let extractor = StatisticsExtractor::from_config(config);
    let report = extractor.extract(name)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.mean_display);
        println!("{}", report.stdev_display);
        if !report.malformed.is_empty() {
            println!("{} malformed readings skipped", report.malformed.len());
        }
        println!("Saved to {}", extractor.table().path().display());
    }
    Ok(())
}
