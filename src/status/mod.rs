//! Liveness tracking for registered servers.
//!
//! Health events from the external health checker flow through the
//! [`services::StatusIngestor`] into two independently failing stores: the
//! status cache (one bit per internal identifier) and the status log
//! (append-only samples). The [`services::UptimeAggregator`] reads the log,
//! and [`services::StatusResync`] rebuilds the cache from the registry.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
