//! Append-only status observations.

use super::HealthEvent;
use crate::server::domain::{InternalId, ServerStatus};
use chrono::{DateTime, Utc};
use mockable::Clock;

/// Immutable status observation used for uptime analytics.
///
/// Duplicates are permitted; samples are never consulted for current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSample {
    internal_id: InternalId,
    status: ServerStatus,
    sampled_at: DateTime<Utc>,
}

impl StatusSample {
    /// Creates a sample.
    #[must_use]
    pub const fn new(
        internal_id: InternalId,
        status: ServerStatus,
        sampled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            internal_id,
            status,
            sampled_at,
        }
    }

    /// Creates a sample for `event`, stamped with the clock's current time.
    #[must_use]
    pub fn observed(event: &HealthEvent, clock: &impl Clock) -> Self {
        Self::new(event.internal_id(), event.status(), clock.utc())
    }

    /// Returns the sampled server's internal identifier.
    #[must_use]
    pub const fn internal_id(&self) -> InternalId {
        self.internal_id
    }

    /// Returns the observed status.
    #[must_use]
    pub const fn status(&self) -> ServerStatus {
        self.status
    }

    /// Returns when the sample was taken.
    #[must_use]
    pub const fn sampled_at(&self) -> DateTime<Utc> {
        self.sampled_at
    }
}
