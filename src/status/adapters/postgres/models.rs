//! Diesel row models for status log persistence.

use super::schema::status_samples;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Insert model for status samples.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = status_samples)]
pub struct NewStatusSampleRow {
    /// Internal identifier of the sampled server.
    pub server_id: i64,
    /// Observed status.
    pub status: String,
    /// Observation time.
    pub sampled_at: DateTime<Utc>,
}

/// Per-server tally returned by the window aggregation query.
#[derive(Debug, Clone, QueryableByName)]
pub struct WindowCountRow {
    /// Internal identifier of the sampled server.
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub server_id: i64,
    /// Samples with status `On`.
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub online: i64,
    /// All samples.
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub total: i64,
}
