//! Error types for server domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing server domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServerDomainError {
    /// The external identifier is empty after trimming.
    #[error("server external identifier must not be empty")]
    EmptyExternalId,

    /// The external identifier exceeds the storage limit.
    #[error("server external identifier exceeds 255 character limit: {0}")]
    ExternalIdTooLong(String),

    /// The server name is empty after trimming.
    #[error("server name must not be empty")]
    EmptyServerName,

    /// The address is not a dotted-quad IPv4 address.
    #[error("invalid IPv4 address: {0}")]
    InvalidAddress(String),

    /// The internal identifier range is inverted or negative.
    #[error("invalid internal identifier range: from {from} to {to}")]
    InvalidIdRange {
        /// Lower bound as supplied.
        from: i64,
        /// Upper bound as supplied.
        to: i64,
    },

    /// The port filter is neither `-1` nor a valid port.
    #[error("invalid port filter {0}: expected -1 or a port between 0 and 65535")]
    InvalidPortFilter(i64),

    /// The status filter is neither `On` nor `Off`.
    #[error("invalid status filter: {0}")]
    InvalidStatusFilter(String),

    /// The sort column is not one of the supported columns.
    #[error("unsupported sort column: {0}")]
    UnsupportedSortColumn(String),

    /// The sort order is neither `asc` nor `desc`.
    #[error("unsupported sort order: {0}")]
    UnsupportedSortOrder(String),
}

/// Error returned while parsing a server status from requests or persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown server status: {0}")]
pub struct ParseServerStatusError(pub String);
