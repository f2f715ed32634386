//! Server registry for the fleet.
//!
//! The registry is the source of truth for every monitored endpoint. It
//! assigns the numeric internal identifier that keys the status bitmap and
//! the status log, and it exposes the address feed the external health
//! checker consumes. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
