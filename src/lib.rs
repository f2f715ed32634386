//! Fleetwatch: liveness tracking for a fleet of registered servers.
//!
//! An external health checker polls every registered endpoint and publishes
//! health events. This crate consumes those events and keeps three independently
//! failing stores eventually consistent under at-least-once delivery:
//!
//! - a relational registry, the source of truth for server records
//! - a bit-per-server status cache for fast online counts
//! - an append-only status log for windowed uptime analytics
//!
//! # Architecture
//!
//! Fleetwatch follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for the stores and the transport
//! - **Adapters**: `PostgreSQL`, Redis, in-memory, and no-op implementations
//!
//! # Modules
//!
//! - [`server`]: Registry records, search, and write-through administration
//! - [`status`]: Ingestion, uptime aggregation, resync, and fleet reports
//! - [`config`]: Daemon configuration and the store capability set
//! - [`wiring`]: Construction of the shared store handles
//! - [`telemetry`]: Log subscriber installation

pub mod config;
pub mod server;
pub mod status;
pub mod telemetry;
pub mod wiring;
