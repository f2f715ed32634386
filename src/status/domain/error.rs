//! Error types for status domain validation.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors returned while constructing status domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StatusDomainError {
    /// The health event payload is not a valid event document.
    #[error("malformed health event: {0}")]
    MalformedEvent(String),

    /// The window end precedes its start.
    #[error("invalid sample window: start {start} is after end {end}")]
    InvalidWindow {
        /// Window start as supplied.
        start: DateTime<Utc>,
        /// Window end as supplied.
        end: DateTime<Utc>,
    },

    /// The Unix timestamp is outside the representable range.
    #[error("unix timestamp out of range: {0}")]
    InvalidTimestamp(i64),
}
