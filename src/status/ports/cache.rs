//! Port for the bit-per-server online cache.

use crate::server::domain::InternalId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for status cache operations.
pub type StatusCacheResult<T> = Result<T, StatusCacheError>;

/// Dense online/offline bitmap keyed by internal identifier.
///
/// Bit offset equals the internal identifier and a set bit means online.
/// Implementations must tolerate sparse, large identifiers. Concurrent sets
/// for different identifiers never conflict; for the same identifier the
/// last write wins.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusCache: Send + Sync {
    /// Sets the bit for `internal_id` to `online`.
    ///
    /// This is an absolute set, so repeating it is harmless. Returns the
    /// previous bit, or `None` when the store cannot report it.
    ///
    /// # Errors
    ///
    /// Returns [`StatusCacheError`] when the backend is unreachable or the
    /// identifier cannot be addressed.
    async fn set_online(
        &self,
        internal_id: InternalId,
        online: bool,
    ) -> StatusCacheResult<Option<bool>>;

    /// Reads the bit for `internal_id`; unknown identifiers read as offline.
    async fn is_online(&self, internal_id: InternalId) -> StatusCacheResult<bool>;

    /// Counts set bits across the whole structure.
    async fn online_count(&self) -> StatusCacheResult<u64>;

    /// Removes the whole structure. Only resync calls this.
    async fn clear(&self) -> StatusCacheResult<()>;
}

/// Errors returned by status cache implementations.
#[derive(Debug, Clone, Error)]
pub enum StatusCacheError {
    /// The identifier is beyond what the backend can address.
    #[error("internal identifier {0} exceeds the addressable bit range")]
    OffsetOutOfRange(InternalId),

    /// Backend failure.
    #[error("status cache backend error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl StatusCacheError {
    /// Wraps a backend failure.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}
