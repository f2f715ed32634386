//! Explicit no-op adapters for disabled capabilities.
//!
//! Selecting one of these turns the corresponding store off without changing
//! any caller: writes succeed and reads report an empty store.

use crate::server::domain::InternalId;
use crate::status::{
    domain::{SampleWindow, ServerSampleCounts, StatusSample},
    ports::{StatusCache, StatusCacheResult, StatusLog, StatusLogResult},
};
use async_trait::async_trait;

/// Status cache that stores nothing.
///
/// `set_online` cannot report a previous bit, so it returns `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStatusCache;

#[async_trait]
impl StatusCache for NoopStatusCache {
    async fn set_online(
        &self,
        _internal_id: InternalId,
        _online: bool,
    ) -> StatusCacheResult<Option<bool>> {
        Ok(None)
    }

    async fn is_online(&self, _internal_id: InternalId) -> StatusCacheResult<bool> {
        Ok(false)
    }

    async fn online_count(&self) -> StatusCacheResult<u64> {
        Ok(0)
    }

    async fn clear(&self) -> StatusCacheResult<()> {
        Ok(())
    }
}

/// Status log that discards every sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStatusLog;

#[async_trait]
impl StatusLog for NoopStatusLog {
    async fn append(&self, _sample: &StatusSample) -> StatusLogResult<()> {
        Ok(())
    }

    async fn window_counts(
        &self,
        _window: &SampleWindow,
        _limit: usize,
    ) -> StatusLogResult<Vec<ServerSampleCounts>> {
        Ok(Vec::new())
    }
}
