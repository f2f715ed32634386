//! Diesel row models for server registry persistence.

use super::schema::servers;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for server records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = servers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ServerRow {
    /// Internal identifier.
    pub id: i64,
    /// External identifier.
    pub server_id: String,
    /// Display name.
    pub server_name: String,
    /// Status.
    pub status: String,
    /// IPv4 address.
    pub ipv4: String,
    /// TCP port.
    pub port: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert model for server records; the identifier comes from the sequence.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = servers)]
pub struct NewServerRow {
    /// External identifier.
    pub server_id: String,
    /// Display name.
    pub server_name: String,
    /// Status.
    pub status: String,
    /// IPv4 address.
    pub ipv4: String,
    /// TCP port.
    pub port: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Partial update model; `None` columns are left untouched.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = servers)]
pub struct ServerChangeset {
    /// New display name.
    pub server_name: Option<String>,
    /// New status.
    pub status: Option<String>,
    /// New IPv4 address.
    pub ipv4: Option<String>,
    /// New TCP port.
    pub port: Option<i32>,
    /// Update timestamp, always written.
    pub updated_at: DateTime<Utc>,
}
