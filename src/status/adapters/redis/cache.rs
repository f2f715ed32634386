//! Status cache stored as one Redis bitmap.

use crate::server::domain::InternalId;
use crate::status::ports::{StatusCache, StatusCacheError, StatusCacheResult};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

/// Largest bit offset Redis accepts for `SETBIT`/`GETBIT` (512 MiB string).
const MAX_BIT_OFFSET: u64 = 4_294_967_295;

/// Redis-backed status bitmap.
///
/// Bit offset equals the internal identifier; `SETBIT` returns the previous
/// bit and `BITCOUNT` counts the whole key. Clearing deletes the key.
#[derive(Clone)]
pub struct RedisStatusCache {
    connection: ConnectionManager,
    key: String,
}

impl std::fmt::Debug for RedisStatusCache {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RedisStatusCache")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl RedisStatusCache {
    /// Wraps an established connection manager.
    #[must_use]
    pub fn new(connection: ConnectionManager, key: impl Into<String>) -> Self {
        Self {
            connection,
            key: key.into(),
        }
    }

    /// Opens a managed connection to `url` and binds it to the bitmap `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StatusCacheError::Backend`] when the URL is invalid or the
    /// server cannot be reached.
    pub async fn connect(url: &str, key: impl Into<String>) -> StatusCacheResult<Self> {
        let client = redis::Client::open(url).map_err(StatusCacheError::backend)?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(StatusCacheError::backend)?;
        Ok(Self::new(connection, key))
    }

    /// Returns the bitmap key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

pub(super) fn bit_offset(internal_id: InternalId) -> StatusCacheResult<usize> {
    let offset = internal_id.value();
    if offset > MAX_BIT_OFFSET {
        return Err(StatusCacheError::OffsetOutOfRange(internal_id));
    }
    usize::try_from(offset).map_err(|_| StatusCacheError::OffsetOutOfRange(internal_id))
}

#[async_trait]
impl StatusCache for RedisStatusCache {
    async fn set_online(
        &self,
        internal_id: InternalId,
        online: bool,
    ) -> StatusCacheResult<Option<bool>> {
        let offset = bit_offset(internal_id)?;
        let mut connection = self.connection.clone();
        let previous: bool = connection
            .setbit(&self.key, offset, online)
            .await
            .map_err(StatusCacheError::backend)?;
        Ok(Some(previous))
    }

    async fn is_online(&self, internal_id: InternalId) -> StatusCacheResult<bool> {
        let offset = bit_offset(internal_id)?;
        let mut connection = self.connection.clone();
        connection
            .getbit(&self.key, offset)
            .await
            .map_err(StatusCacheError::backend)
    }

    async fn online_count(&self) -> StatusCacheResult<u64> {
        let mut connection = self.connection.clone();
        connection
            .bitcount(&self.key)
            .await
            .map_err(StatusCacheError::backend)
    }

    async fn clear(&self) -> StatusCacheResult<()> {
        let mut connection = self.connection.clone();
        let _removed_keys: u64 = connection
            .del(&self.key)
            .await
            .map_err(StatusCacheError::backend)?;
        Ok(())
    }
}
