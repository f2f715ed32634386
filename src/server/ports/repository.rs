//! Repository port for server registry persistence and the health-check
//! address feed.

use crate::server::domain::{
    ExternalId, InternalId, NewServer, ServerAddress, ServerPatch, ServerQuery, ServerRecord,
    ServerStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Result type for server registry operations.
pub type ServerRegistryResult<T> = Result<T, ServerRegistryError>;

/// Persistence contract for registered servers.
///
/// Each call is transactional for the rows it touches. Nothing here writes
/// the status cache; write-through is the caller's concern.
#[async_trait]
pub trait ServerRegistryRepository: Send + Sync {
    /// Stores a new server and returns it with its assigned internal
    /// identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ServerRegistryError::DuplicateExternalId`] when the external
    /// identifier is already registered.
    async fn create(&self, server: &NewServer) -> ServerRegistryResult<ServerRecord>;

    /// Stores a batch, skipping rows whose external identifier conflicts.
    ///
    /// Conflicts never fail the batch; they land in
    /// [`BulkInsertOutcome::rejected`].
    async fn create_many(&self, servers: &[NewServer]) -> ServerRegistryResult<BulkInsertOutcome>;

    /// Returns records matching `query`.
    async fn search(&self, query: &ServerQuery) -> ServerRegistryResult<Vec<ServerRecord>>;

    /// Finds a record by external identifier.
    async fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> ServerRegistryResult<Option<ServerRecord>>;

    /// Applies a partial update and returns the updated record.
    ///
    /// # Errors
    ///
    /// Returns [`ServerRegistryError::NotFound`] when no record matches.
    async fn update(
        &self,
        external_id: &ExternalId,
        patch: &ServerPatch,
        updated_at: DateTime<Utc>,
    ) -> ServerRegistryResult<ServerRecord>;

    /// Removes a record and returns what was removed.
    ///
    /// # Errors
    ///
    /// Returns [`ServerRegistryError::NotFound`] when no record matches.
    async fn delete(&self, external_id: &ExternalId) -> ServerRegistryResult<ServerRecord>;

    /// Records an observed status for the server with `internal_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerRegistryError::UnknownInternalId`] when no record
    /// matches.
    async fn set_status(
        &self,
        internal_id: InternalId,
        status: ServerStatus,
        updated_at: DateTime<Utc>,
    ) -> ServerRegistryResult<()>;

    /// Returns every record.
    async fn list_all(&self) -> ServerRegistryResult<Vec<ServerRecord>>;

    /// Returns the health-check target of every record.
    async fn list_addresses(&self) -> ServerRegistryResult<Vec<ServerAddress>>;

    /// Returns the number of registered servers.
    async fn count(&self) -> ServerRegistryResult<u64>;
}

/// Result of a bulk insert, partitioned by external identifier.
///
/// Every input external identifier appears on exactly one side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkInsertOutcome {
    /// Records that were stored, with their assigned identifiers.
    pub inserted: Vec<ServerRecord>,
    /// Inputs whose external identifier was already registered.
    pub rejected: Vec<NewServer>,
}

impl BulkInsertOutcome {
    /// Partitions `input` against the records the store reported as inserted.
    ///
    /// Membership is decided by external identifier, not by position, so an
    /// input repeated within the batch counts as inserted when its key was.
    #[must_use]
    pub fn partition(input: &[NewServer], inserted: Vec<ServerRecord>) -> Self {
        let inserted_keys: HashSet<&ExternalId> =
            inserted.iter().map(ServerRecord::external_id).collect();
        let rejected = input
            .iter()
            .filter(|server| !inserted_keys.contains(server.external_id()))
            .cloned()
            .collect();
        Self { inserted, rejected }
    }
}

/// Errors returned by server registry repository implementations.
#[derive(Debug, Clone, Error)]
pub enum ServerRegistryError {
    /// A server with the same external identifier already exists.
    #[error("duplicate server external identifier: {0}")]
    DuplicateExternalId(ExternalId),

    /// No server has the external identifier.
    #[error("server not found: {0}")]
    NotFound(ExternalId),

    /// No server has the internal identifier.
    #[error("server with internal identifier {0} not found")]
    UnknownInternalId(InternalId),

    /// Persisted data could not be reconstructed into domain types.
    #[error("invalid persisted server data: {0}")]
    InvalidPersistedData(Arc<dyn std::error::Error + Send + Sync>),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ServerRegistryError {
    /// Wraps persisted-data decoding or validation failures.
    pub fn invalid_persisted_data(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::InvalidPersistedData(Arc::new(err))
    }

    /// Wraps a persistence-layer failure.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

impl From<diesel::result::Error> for ServerRegistryError {
    fn from(err: diesel::result::Error) -> Self {
        Self::persistence(err)
    }
}
