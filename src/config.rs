//! Process configuration for the daemon.
//!
//! Every option can be given as a flag or through its environment variable.
//! The cache and log backends form the capability set: `disabled` wires an
//! explicit no-op adapter instead of removing the store from the call graph.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::num::{NonZeroU32, NonZeroUsize};

/// Backend for the status cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheBackend {
    /// Redis bitmap addressed by `--status-bitmap-key`.
    Redis,
    /// In-process paged bitmap; lost on restart.
    Memory,
    /// No-op cache.
    Disabled,
}

/// Backend for the status log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogBackend {
    /// `status_samples` table in the registry database.
    Postgres,
    /// In-process sample list; lost on restart.
    Memory,
    /// No-op log.
    Disabled,
}

/// Daemon configuration.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "fleetwatchd",
    version,
    about = "Tracks server liveness from external health events"
)]
pub struct ServiceConfig {
    /// `PostgreSQL` URL of the server registry.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Maximum registry connections.
    #[arg(long, env = "DATABASE_POOL_SIZE", default_value = "10")]
    pub database_pool_size: NonZeroU32,

    /// Redis URL for the status bitmap.
    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    pub redis_url: String,

    /// Redis key holding the status bitmap.
    #[arg(long, env = "STATUS_BITMAP_KEY", default_value = "server_status")]
    pub status_bitmap_key: String,

    /// Status cache backend.
    #[arg(long, env = "STATUS_CACHE", value_enum, default_value_t = CacheBackend::Redis)]
    pub status_cache: CacheBackend,

    /// Status log backend.
    #[arg(long, env = "STATUS_LOG", value_enum, default_value_t = LogBackend::Postgres)]
    pub status_log: LogBackend,

    /// Concurrent ingestion workers.
    #[arg(long, env = "INGEST_WORKERS", default_value = "10")]
    pub ingest_workers: NonZeroU32,

    /// Maximum distinct servers one uptime query may aggregate.
    #[arg(long, env = "UPTIME_SERVER_CAP", default_value = "10000")]
    pub uptime_server_cap: NonZeroUsize,

    /// Rebuild the status cache from the registry before ingesting.
    #[arg(
        long,
        env = "RESYNC_ON_START",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub resync_on_start: bool,

    /// `tracing` filter directives.
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_filter: String,

    /// Operation to perform; defaults to `run`.
    #[command(subcommand)]
    pub command: Option<DaemonCommand>,
}

impl ServiceConfig {
    /// Returns the selected operation.
    #[must_use]
    pub fn command(&self) -> DaemonCommand {
        self.command.clone().unwrap_or(DaemonCommand::Run)
    }
}

/// Daemon operations.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum DaemonCommand {
    /// Ingest newline-delimited health events from standard input until it
    /// closes or the process is interrupted.
    Run,
    /// Rebuild the status cache from the registry and print the report.
    Resync,
    /// Print the fleet summary for a window of Unix timestamps.
    Summary {
        /// Inclusive window start, in seconds.
        #[arg(long)]
        start: i64,
        /// Inclusive window end, in seconds.
        #[arg(long)]
        end: i64,
        /// Abort the uptime query after this many milliseconds.
        #[arg(long)]
        deadline_ms: Option<u64>,
    },
    /// Print the health-check address feed, one JSON object per line.
    Addresses,
}
