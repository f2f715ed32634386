//! `PostgreSQL` adapter for the status log.

mod log;
mod models;
mod schema;

pub use log::{PostgresStatusLog, StatusPgPool};
