//! Construction of the store handles shared by every service.
//!
//! Handles are built once at startup and passed explicitly into each
//! service. Connection pools close when the last handle is dropped.

use crate::config::{CacheBackend, LogBackend, ServiceConfig};
use crate::server::{
    adapters::{
        memory::InMemoryServerRegistry,
        postgres::{PostgresServerRegistry, ServerPgPool},
    },
    ports::ServerRegistryRepository,
    services::ServerAdministrationService,
};
use crate::status::{
    adapters::{
        memory::{InMemoryStatusCache, InMemoryStatusLog},
        noop::{NoopStatusCache, NoopStatusLog},
        postgres::PostgresStatusLog,
        redis::RedisStatusCache,
    },
    ports::{StatusCache, StatusCacheError, StatusLog},
    services::{FleetReportService, StatusIngestor, StatusResync, UptimeAggregator},
};
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use mockable::Clock;
use std::num::{NonZeroU32, NonZeroUsize};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Schema statements applied at startup; each is idempotent.
const SCHEMA: [&str; 2] = [
    include_str!("../migrations/2026-09-01-000000_create_servers/up.sql"),
    include_str!("../migrations/2026-09-01-000001_create_status_samples/up.sql"),
];

/// Errors that stop the process at boot. There is no degraded startup.
#[derive(Debug, Error)]
pub enum StartupError {
    /// The registry database could not be reached.
    #[error("cannot connect to registry database: {0}")]
    Database(Arc<dyn std::error::Error + Send + Sync>),
    /// The registry schema could not be applied.
    #[error("cannot apply registry schema: {0}")]
    Schema(Arc<dyn std::error::Error + Send + Sync>),
    /// The configured status cache could not be reached.
    #[error("cannot connect to status cache: {0}")]
    Cache(#[from] StatusCacheError),
}

impl StartupError {
    fn database(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Database(Arc::new(err))
    }

    fn schema(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Schema(Arc::new(err))
    }
}

/// Registry service type produced by [`StoreHandles::administration`].
pub type AdministrationService<C> =
    ServerAdministrationService<dyn ServerRegistryRepository, dyn StatusCache, C>;

/// Ingestor type produced by [`StoreHandles::ingestor`].
pub type Ingestor<C> =
    StatusIngestor<dyn ServerRegistryRepository, dyn StatusCache, dyn StatusLog, C>;

/// The three stores, selected by the capability set.
#[derive(Clone)]
pub struct StoreHandles {
    /// Source-of-truth registry.
    pub registry: Arc<dyn ServerRegistryRepository>,
    /// Online bitmap.
    pub cache: Arc<dyn StatusCache>,
    /// Sample log.
    pub log: Arc<dyn StatusLog>,
}

impl StoreHandles {
    /// Wires in-process adapters for every store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            registry: Arc::new(InMemoryServerRegistry::new()),
            cache: Arc::new(InMemoryStatusCache::new()),
            log: Arc::new(InMemoryStatusLog::new()),
        }
    }

    /// Connects every configured store.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError`] when the registry database or the configured
    /// cache cannot be reached, or the schema cannot be applied.
    pub async fn connect(config: &ServiceConfig) -> Result<Self, StartupError> {
        let pool = connect_registry(&config.database_url, config.database_pool_size).await?;

        let cache: Arc<dyn StatusCache> = match config.status_cache {
            CacheBackend::Redis => Arc::new(
                RedisStatusCache::connect(&config.redis_url, config.status_bitmap_key.as_str())
                    .await?,
            ),
            CacheBackend::Memory => Arc::new(InMemoryStatusCache::new()),
            CacheBackend::Disabled => Arc::new(NoopStatusCache),
        };
        let log: Arc<dyn StatusLog> = match config.status_log {
            LogBackend::Postgres => Arc::new(PostgresStatusLog::new(pool.clone())),
            LogBackend::Memory => Arc::new(InMemoryStatusLog::new()),
            LogBackend::Disabled => Arc::new(NoopStatusLog),
        };
        info!(
            status_cache = ?config.status_cache,
            status_log = ?config.status_log,
            "stores connected"
        );

        Ok(Self {
            registry: Arc::new(PostgresServerRegistry::new(pool)),
            cache,
            log,
        })
    }

    /// Builds the registry administration service.
    #[must_use]
    pub fn administration<C>(&self, clock: Arc<C>) -> AdministrationService<C>
    where
        C: Clock + Send + Sync,
    {
        ServerAdministrationService::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.cache),
            clock,
        )
    }

    /// Builds the health event ingestor.
    #[must_use]
    pub fn ingestor<C>(&self, clock: Arc<C>, workers: NonZeroU32) -> Ingestor<C>
    where
        C: Clock + Send + Sync + 'static,
    {
        StatusIngestor::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.cache),
            Arc::clone(&self.log),
            clock,
            workers,
        )
    }

    /// Builds the resync procedure.
    #[must_use]
    pub fn resync(&self) -> StatusResync<dyn ServerRegistryRepository, dyn StatusCache> {
        StatusResync::new(Arc::clone(&self.registry), Arc::clone(&self.cache))
    }

    /// Builds the fleet report service.
    #[must_use]
    pub fn report(
        &self,
        server_cap: NonZeroUsize,
    ) -> FleetReportService<dyn ServerRegistryRepository, dyn StatusCache, dyn StatusLog> {
        FleetReportService::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.cache),
            UptimeAggregator::new(Arc::clone(&self.log), server_cap),
        )
    }
}

async fn connect_registry(
    url: &str,
    pool_size: NonZeroU32,
) -> Result<ServerPgPool, StartupError> {
    let manager = ConnectionManager::<PgConnection>::new(url);
    tokio::task::spawn_blocking(move || {
        let pool = Pool::builder()
            .max_size(pool_size.get())
            .build(manager)
            .map_err(StartupError::database)?;
        let mut connection = pool.get().map_err(StartupError::database)?;
        for statement in SCHEMA {
            connection
                .batch_execute(statement)
                .map_err(StartupError::schema)?;
        }
        Ok(pool)
    })
    .await
    .map_err(StartupError::database)?
}
