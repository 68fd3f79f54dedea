//! ODS online monitor binary.
//!
//! Runs one reconciliation cycle against a posted remote ODS: fetch the
//! advertised records, keep the currently active ones, and fold them into
//! the local log file with deduplication. Intended to be invoked
//! periodically (e.g. from cron).
//!
//! # Usage
//!
//! ```bash
//! # Run with built-in defaults
//! cargo run --bin ods_monitor
//!
//! # Run with a TOML settings file
//! cargo run --bin ods_monitor -- monitor.toml
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log level (default: info)

use std::env;

use log::info;

use odsutils::config::MonitorConfig;
use odsutils::engine::Ods;
use odsutils::standard::LATEST;
use odsutils::tools::HttpFetch;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cfg = match env::args().nth(1) {
        Some(path) => MonitorConfig::from_file(&path)?,
        None => MonitorConfig::default(),
    };
    info!("monitoring {} into {}", cfg.url, cfg.logfile.display());

    let fetcher = HttpFetch::new()?;
    let mut ods = Ods::new(LATEST)?;
    let report = ods.online_monitor_cycle(&cfg, &fetcher)?;
    info!(
        "cycle complete: fetched {}, active {}, log now {}",
        report.fetched, report.active, report.log_records
    );
    Ok(())
}
