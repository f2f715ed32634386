//! Full rebuild of the status cache from the registry.

use crate::server::ports::{ServerRegistryError, ServerRegistryRepository};
use crate::status::ports::{StatusCache, StatusCacheError};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Outcome of a resync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResyncReport {
    /// Records read from the registry.
    pub registered: usize,
    /// Bits set for records with status `On`.
    pub marked_online: usize,
    /// `On` records whose bit could not be set.
    pub failures: usize,
    /// Online count read back after the rebuild, if the cache answered.
    pub online_count: Option<u64>,
}

/// Errors that abort a resync before the cache is rebuilt.
#[derive(Debug, Clone, Error)]
pub enum StatusResyncError {
    /// The registry could not be read.
    #[error(transparent)]
    Registry(#[from] ServerRegistryError),
    /// The cache could not be cleared.
    #[error(transparent)]
    Cache(#[from] StatusCacheError),
}

/// Rebuilds the status cache so every bit matches the registry.
///
/// This is the only operation that guarantees registry and cache converge.
/// Bits for deleted or unknown identifiers disappear with the clear, and
/// `Off` records are left at the cleared value.
pub struct StatusResync<R, S>
where
    R: ServerRegistryRepository + ?Sized,
    S: StatusCache + ?Sized,
{
    registry: Arc<R>,
    cache: Arc<S>,
}

impl<R, S> StatusResync<R, S>
where
    R: ServerRegistryRepository + ?Sized,
    S: StatusCache + ?Sized,
{
    /// Creates a resync procedure over the given stores.
    #[must_use]
    pub const fn new(registry: Arc<R>, cache: Arc<S>) -> Self {
        Self { registry, cache }
    }

    /// Reads every record, clears the cache, and sets the bit of every
    /// online record.
    ///
    /// A failure to set an individual bit is logged and counted rather than
    /// aborting the rebuild.
    ///
    /// # Errors
    ///
    /// Returns [`StatusResyncError`] when the registry cannot be read or the
    /// cache cannot be cleared.
    pub async fn resync(&self) -> Result<ResyncReport, StatusResyncError> {
        let records = self.registry.list_all().await?;
        self.cache.clear().await?;

        let mut marked_online = 0;
        let mut failures = 0;
        for record in records.iter().filter(|record| record.status().is_online()) {
            match self.cache.set_online(record.internal_id(), true).await {
                Ok(_) => marked_online += 1,
                Err(err) => {
                    warn!(
                        internal_id = %record.internal_id(),
                        error = %err,
                        "failed to restore online bit during resync"
                    );
                    failures += 1;
                }
            }
        }

        let online_count = match self.cache.online_count().await {
            Ok(count) => Some(count),
            Err(err) => {
                warn!(error = %err, "failed to read online count after resync");
                None
            }
        };

        let report = ResyncReport {
            registered: records.len(),
            marked_online,
            failures,
            online_count,
        };
        info!(
            registered = report.registered,
            marked_online = report.marked_online,
            failures = report.failures,
            online_count = ?report.online_count,
            "status cache resynchronised"
        );
        Ok(report)
    }
}
