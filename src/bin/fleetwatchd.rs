//! Fleet liveness daemon.
//!
//! Usage:
//!
//! ```text
//! fleetwatchd [OPTIONS] [run|resync|summary|addresses]
//! ```
//!
//! `run` (the default) optionally resynchronises the status cache, then
//! ingests newline-delimited health events such as
//! `{"id": 7, "ipv4": "10.0.0.7:22", "status": true}` from standard input
//! until input closes or the process receives Ctrl-C. In-flight events are
//! drained before exit. The other commands print one JSON document per line
//! to standard output. Logs go to standard error.
//!
//! Failing to reach the registry database or the configured status cache at
//! boot is fatal: the error is logged and the process exits non-zero.

use clap::Parser;
use fleetwatch::config::{DaemonCommand, ServiceConfig};
use fleetwatch::server::ports::ServerRegistryError;
use fleetwatch::status::adapters::json_lines::JsonLinesSource;
use fleetwatch::status::domain::SampleWindow;
use fleetwatch::status::services::{FleetReportError, StatusIngestError, StatusResyncError};
use fleetwatch::telemetry;
use fleetwatch::wiring::{StartupError, StoreHandles};
use mockable::DefaultClock;
use serde::Serialize;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::BufReader;
use tokio::runtime::Builder;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Errors that end the daemon.
#[derive(Debug, Error)]
enum DaemonError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("status cache resync failed: {0}")]
    Resync(#[from] StatusResyncError),
    #[error(transparent)]
    Ingest(#[from] StatusIngestError),
    #[error("fleet summary failed: {0}")]
    Report(#[from] FleetReportError),
    #[error("address feed failed: {0}")]
    Registry(#[from] ServerRegistryError),
    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

/// One address feed entry as printed by `addresses`.
#[derive(Debug, Serialize)]
struct AddressLine {
    id: u64,
    target: String,
}

/// How long blocked stdin readers may delay process exit.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

fn main() -> ExitCode {
    let config = ServiceConfig::parse();
    if let Err(err) = telemetry::init(&config.log_filter) {
        let fallback = telemetry::init("info");
        warn!(
            error = %err,
            fallback_installed = fallback.is_ok(),
            "using default log filter"
        );
    }

    let runtime = match Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %err, "failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };
    let outcome = runtime.block_on(run(&config));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "fleetwatchd stopped with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &ServiceConfig) -> Result<(), DaemonError> {
    let stores = StoreHandles::connect(config).await?;

    match config.command() {
        DaemonCommand::Run => ingest(config, &stores).await,
        DaemonCommand::Resync => {
            let report = stores.resync().resync().await?;
            print_json(&report)
        }
        DaemonCommand::Summary {
            start,
            end,
            deadline_ms,
        } => {
            let window = SampleWindow::from_unix(start, end).map_err(FleetReportError::from)?;
            let summary = stores
                .report(config.uptime_server_cap)
                .summary_for(&window, deadline_ms.map(Duration::from_millis))
                .await?;
            print_json(&summary)
        }
        DaemonCommand::Addresses => {
            for address in stores.registry.list_addresses().await? {
                print_json(&AddressLine {
                    id: address.internal_id.value(),
                    target: address.target(),
                })?;
            }
            Ok(())
        }
    }
}

async fn ingest(config: &ServiceConfig, stores: &StoreHandles) -> Result<(), DaemonError> {
    if config.resync_on_start {
        stores.resync().resync().await?;
    }

    let shutdown = CancellationToken::new();
    let interrupt = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received; draining in-flight events");
                interrupt.cancel();
            }
            Err(err) => warn!(error = %err, "cannot listen for interrupts"),
        }
    });

    let ingestor = stores.ingestor(Arc::new(DefaultClock), config.ingest_workers);
    let mut source = JsonLinesSource::new(BufReader::new(tokio::io::stdin()));
    let report = ingestor.run(&mut source, shutdown).await?;
    info!(received = report.received, "ingestion finished");
    Ok(())
}

fn print_json(value: &impl Serialize) -> Result<(), DaemonError> {
    write_json(&mut std::io::stdout().lock(), value)
}

fn write_json(out: &mut impl Write, value: &impl Serialize) -> Result<(), DaemonError> {
    let line = serde_json::to_string(value)?;
    writeln!(out, "{line}")?;
    Ok(())
}
