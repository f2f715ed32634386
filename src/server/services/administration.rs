//! Registry administration with best-effort status cache write-through.
//!
//! Every mutation commits to the registry first and then sets the cache bit.
//! A cache failure after the commit is logged and absorbed: the registry is
//! the source of truth and resync repairs the bitmap.

use crate::server::{
    domain::{
        ExternalId, InternalId, NewServer, ServerAddress, ServerDomainError, ServerEndpoint,
        ServerPatch, ServerQuery, ServerRecord, ServerStatus,
    },
    ports::{BulkInsertOutcome, ServerRegistryError, ServerRegistryRepository},
};
use crate::status::ports::StatusCache;
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Request payload for registering a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateServerRequest {
    /// Caller-supplied unique business identifier.
    pub external_id: String,
    /// Display name.
    pub name: String,
    /// Initial status.
    pub status: ServerStatus,
    /// Dotted-quad IPv4 address.
    pub address: String,
    /// TCP port.
    pub port: u16,
}

impl CreateServerRequest {
    /// Creates a registration request with status `Off`.
    #[must_use]
    pub fn new(
        external_id: impl Into<String>,
        name: impl Into<String>,
        address: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            name: name.into(),
            status: ServerStatus::Off,
            address: address.into(),
            port,
        }
    }

    /// Sets the initial status.
    #[must_use]
    pub const fn with_status(mut self, status: ServerStatus) -> Self {
        self.status = status;
        self
    }

    fn into_new_server(self, clock: &impl Clock) -> Result<NewServer, ServerDomainError> {
        let external_id = ExternalId::new(self.external_id)?;
        let endpoint = ServerEndpoint::parse(&self.address, self.port)?;
        NewServer::new(external_id, self.name, self.status, endpoint, clock)
    }
}

/// Service-level errors for registry administration.
#[derive(Debug, Error)]
pub enum ServerAdministrationError {
    /// Request validation failed; nothing was written.
    #[error(transparent)]
    Domain(#[from] ServerDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] ServerRegistryError),
}

/// Result type for administration operations.
pub type ServerAdministrationResult<T> = Result<T, ServerAdministrationError>;

/// Registry CRUD with status cache write-through.
pub struct ServerAdministrationService<R, S, C>
where
    R: ServerRegistryRepository + ?Sized,
    S: StatusCache + ?Sized,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    cache: Arc<S>,
    clock: Arc<C>,
}

impl<R, S, C> Clone for ServerAdministrationService<R, S, C>
where
    R: ServerRegistryRepository + ?Sized,
    S: StatusCache + ?Sized,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            cache: Arc::clone(&self.cache),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<R, S, C> ServerAdministrationService<R, S, C>
where
    R: ServerRegistryRepository + ?Sized,
    S: StatusCache + ?Sized,
    C: Clock + Send + Sync,
{
    /// Creates a new administration service.
    #[must_use]
    pub const fn new(repository: Arc<R>, cache: Arc<S>, clock: Arc<C>) -> Self {
        Self {
            repository,
            cache,
            clock,
        }
    }

    async fn write_through(&self, internal_id: InternalId, online: bool) {
        if let Err(err) = self.cache.set_online(internal_id, online).await {
            warn!(
                internal_id = %internal_id,
                online,
                error = %err,
                "status cache write-through failed; resync will repair the bit"
            );
        }
    }

    /// Registers one server.
    ///
    /// # Errors
    ///
    /// Returns [`ServerAdministrationError::Domain`] when the request is
    /// invalid, or [`ServerRegistryError::DuplicateExternalId`] wrapped in
    /// [`ServerAdministrationError::Repository`] when the external
    /// identifier is taken.
    pub async fn create(
        &self,
        request: CreateServerRequest,
    ) -> ServerAdministrationResult<ServerRecord> {
        let server = request.into_new_server(&*self.clock)?;
        let record = self.repository.create(&server).await?;
        self.write_through(record.internal_id(), record.status().is_online())
            .await;
        info!(
            internal_id = %record.internal_id(),
            external_id = %record.external_id(),
            "server registered"
        );
        Ok(record)
    }

    /// Registers a batch, skipping servers whose external identifier is
    /// already taken.
    ///
    /// The whole batch is validated before anything is written.
    ///
    /// # Errors
    ///
    /// Returns [`ServerAdministrationError::Domain`] when any request is
    /// invalid, or a repository error when the batch could not be stored.
    pub async fn create_many(
        &self,
        requests: Vec<CreateServerRequest>,
    ) -> ServerAdministrationResult<BulkInsertOutcome> {
        let servers = requests
            .into_iter()
            .map(|request| request.into_new_server(&*self.clock))
            .collect::<Result<Vec<_>, _>>()?;
        let outcome = self.repository.create_many(&servers).await?;
        for record in &outcome.inserted {
            self.write_through(record.internal_id(), record.status().is_online())
                .await;
        }
        info!(
            inserted = outcome.inserted.len(),
            rejected = outcome.rejected.len(),
            "bulk server import finished"
        );
        Ok(outcome)
    }

    /// Searches the registry.
    ///
    /// # Errors
    ///
    /// Returns [`ServerAdministrationError::Repository`] when the query fails.
    pub async fn search(
        &self,
        query: &ServerQuery,
    ) -> ServerAdministrationResult<Vec<ServerRecord>> {
        Ok(self.repository.search(query).await?)
    }

    /// Finds a server by external identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ServerAdministrationError::Domain`] when `external_id` is
    /// invalid, or a repository error when the lookup fails.
    pub async fn find(
        &self,
        external_id: &str,
    ) -> ServerAdministrationResult<Option<ServerRecord>> {
        let key = ExternalId::new(external_id)?;
        Ok(self.repository.find_by_external_id(&key).await?)
    }

    /// Applies a partial update and writes the resulting status through.
    ///
    /// # Errors
    ///
    /// Returns [`ServerRegistryError::NotFound`] wrapped in
    /// [`ServerAdministrationError::Repository`] when no server matches.
    pub async fn update(
        &self,
        external_id: &str,
        patch: &ServerPatch,
    ) -> ServerAdministrationResult<ServerRecord> {
        let key = ExternalId::new(external_id)?;
        let record = self
            .repository
            .update(&key, patch, self.clock.utc())
            .await?;
        self.write_through(record.internal_id(), record.status().is_online())
            .await;
        debug!(internal_id = %record.internal_id(), "server updated");
        Ok(record)
    }

    /// Removes a server and clears its bit.
    ///
    /// # Errors
    ///
    /// Returns [`ServerRegistryError::NotFound`] wrapped in
    /// [`ServerAdministrationError::Repository`] when no server matches.
    pub async fn delete(&self, external_id: &str) -> ServerAdministrationResult<ServerRecord> {
        let key = ExternalId::new(external_id)?;
        let record = self.repository.delete(&key).await?;
        self.write_through(record.internal_id(), false).await;
        info!(
            internal_id = %record.internal_id(),
            external_id = %record.external_id(),
            "server removed"
        );
        Ok(record)
    }

    /// Returns the health-check target of every server.
    ///
    /// # Errors
    ///
    /// Returns [`ServerAdministrationError::Repository`] when the read fails.
    pub async fn list_addresses(&self) -> ServerAdministrationResult<Vec<ServerAddress>> {
        Ok(self.repository.list_addresses().await?)
    }

    /// Returns the number of registered servers.
    ///
    /// # Errors
    ///
    /// Returns [`ServerAdministrationError::Repository`] when the read fails.
    pub async fn count(&self) -> ServerAdministrationResult<u64> {
        Ok(self.repository.count().await?)
    }
}
