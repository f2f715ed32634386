//! Closed time windows over the status log.

use super::StatusDomainError;
use chrono::{DateTime, Utc};

/// Inclusive `[start, end]` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl SampleWindow {
    /// Creates a validated window.
    ///
    /// # Errors
    ///
    /// Returns [`StatusDomainError::InvalidWindow`] when `start > end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, StatusDomainError> {
        if start > end {
            return Err(StatusDomainError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates a window from Unix timestamps in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`StatusDomainError::InvalidTimestamp`] when a bound cannot be
    /// represented, or [`StatusDomainError::InvalidWindow`] when
    /// `start > end`.
    pub fn from_unix(start: i64, end: i64) -> Result<Self, StatusDomainError> {
        let convert = |seconds: i64| {
            DateTime::from_timestamp(seconds, 0).ok_or(StatusDomainError::InvalidTimestamp(seconds))
        };
        Self::new(convert(start)?, convert(end)?)
    }

    /// Returns the inclusive start.
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Returns the inclusive end.
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Returns whether `instant` falls inside the window.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}
