//! In-memory repository for registered servers.

use crate::server::{
    domain::{
        ExternalId, InternalId, NewServer, ServerAddress, ServerFilter, ServerPatch, ServerQuery,
        ServerRecord, ServerStatus, SortColumn, SortOrder,
    },
    ports::{
        BulkInsertOutcome, ServerRegistryError, ServerRegistryRepository, ServerRegistryResult,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Thread-safe in-memory server registry.
///
/// Identifiers start at 1 and are never reused, mirroring a `BIGSERIAL`
/// column.
#[derive(Debug, Clone, Default)]
pub struct InMemoryServerRegistry {
    state: Arc<RwLock<InMemoryRegistryState>>,
}

#[derive(Debug, Default)]
struct InMemoryRegistryState {
    servers: BTreeMap<InternalId, ServerRecord>,
    external_index: HashMap<ExternalId, InternalId>,
    last_id: u64,
}

impl InMemoryRegistryState {
    fn insert(&mut self, server: &NewServer) -> Option<ServerRecord> {
        if self.external_index.contains_key(server.external_id()) {
            return None;
        }
        self.last_id += 1;
        let internal_id = InternalId::new(self.last_id);
        let record = server.clone().into_record(internal_id);
        self.external_index
            .insert(server.external_id().clone(), internal_id);
        self.servers.insert(internal_id, record.clone());
        Some(record)
    }

    fn record_mut(&mut self, external_id: &ExternalId) -> Option<&mut ServerRecord> {
        let internal_id = self.external_index.get(external_id)?;
        self.servers.get_mut(internal_id)
    }
}

impl InMemoryServerRegistry {
    /// Creates an empty in-memory registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> ServerRegistryResult<RwLockReadGuard<'_, InMemoryRegistryState>> {
        self.state.read().map_err(|err| {
            ServerRegistryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> ServerRegistryResult<RwLockWriteGuard<'_, InMemoryRegistryState>> {
        self.state.write().map_err(|err| {
            ServerRegistryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

#[async_trait]
impl ServerRegistryRepository for InMemoryServerRegistry {
    async fn create(&self, server: &NewServer) -> ServerRegistryResult<ServerRecord> {
        let mut state = self.write()?;
        state
            .insert(server)
            .ok_or_else(|| ServerRegistryError::DuplicateExternalId(server.external_id().clone()))
    }

    async fn create_many(&self, servers: &[NewServer]) -> ServerRegistryResult<BulkInsertOutcome> {
        let mut state = self.write()?;
        let inserted = servers
            .iter()
            .filter_map(|server| state.insert(server))
            .collect();
        Ok(BulkInsertOutcome::partition(servers, inserted))
    }

    async fn search(&self, query: &ServerQuery) -> ServerRegistryResult<Vec<ServerRecord>> {
        let state = self.read()?;
        let mut matches: Vec<ServerRecord> = state
            .servers
            .range(query.range.from()..=query.range.to())
            .map(|(_, record)| record)
            .filter(|record| matches_filter(record, &query.filter))
            .cloned()
            .collect();
        matches.sort_by(|left, right| {
            let ordering = compare_by_column(left, right, query.sort_column);
            let directed = match query.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            };
            directed.then_with(|| left.internal_id().cmp(&right.internal_id()))
        });
        Ok(matches)
    }

    async fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> ServerRegistryResult<Option<ServerRecord>> {
        let state = self.read()?;
        let record = state
            .external_index
            .get(external_id)
            .and_then(|id| state.servers.get(id))
            .cloned();
        Ok(record)
    }

    async fn update(
        &self,
        external_id: &ExternalId,
        patch: &ServerPatch,
        updated_at: DateTime<Utc>,
    ) -> ServerRegistryResult<ServerRecord> {
        let mut state = self.write()?;
        let record = state
            .record_mut(external_id)
            .ok_or_else(|| ServerRegistryError::NotFound(external_id.clone()))?;
        record.apply_patch(patch, updated_at);
        Ok(record.clone())
    }

    async fn delete(&self, external_id: &ExternalId) -> ServerRegistryResult<ServerRecord> {
        let mut state = self.write()?;
        let internal_id = state
            .external_index
            .remove(external_id)
            .ok_or_else(|| ServerRegistryError::NotFound(external_id.clone()))?;
        state
            .servers
            .remove(&internal_id)
            .ok_or_else(|| ServerRegistryError::NotFound(external_id.clone()))
    }

    async fn set_status(
        &self,
        internal_id: InternalId,
        status: ServerStatus,
        updated_at: DateTime<Utc>,
    ) -> ServerRegistryResult<()> {
        let mut state = self.write()?;
        let record = state
            .servers
            .get_mut(&internal_id)
            .ok_or(ServerRegistryError::UnknownInternalId(internal_id))?;
        record.set_status(status, updated_at);
        Ok(())
    }

    async fn list_all(&self) -> ServerRegistryResult<Vec<ServerRecord>> {
        let state = self.read()?;
        Ok(state.servers.values().cloned().collect())
    }

    async fn list_addresses(&self) -> ServerRegistryResult<Vec<ServerAddress>> {
        let state = self.read()?;
        Ok(state
            .servers
            .values()
            .map(|record| ServerAddress {
                internal_id: record.internal_id(),
                endpoint: record.endpoint(),
            })
            .collect())
    }

    async fn count(&self) -> ServerRegistryResult<u64> {
        let state = self.read()?;
        u64::try_from(state.servers.len()).map_err(ServerRegistryError::persistence)
    }
}

fn matches_filter(record: &ServerRecord, filter: &ServerFilter) -> bool {
    filter
        .external_id
        .as_ref()
        .is_none_or(|external_id| record.external_id() == external_id)
        && filter
            .name_contains
            .as_deref()
            .is_none_or(|fragment| record.name().contains(fragment))
        && filter.status.is_none_or(|status| record.status() == status)
        && filter
            .address
            .is_none_or(|address| record.endpoint().address() == address)
        && filter
            .port
            .port()
            .is_none_or(|port| record.endpoint().port() == port)
}

fn compare_by_column(left: &ServerRecord, right: &ServerRecord, column: SortColumn) -> Ordering {
    match column {
        SortColumn::InternalId => left.internal_id().cmp(&right.internal_id()),
        SortColumn::ExternalId => left.external_id().cmp(right.external_id()),
        SortColumn::Name => left.name().cmp(right.name()),
        SortColumn::Status => left.status().as_str().cmp(right.status().as_str()),
        SortColumn::Address => left
            .endpoint()
            .address()
            .to_string()
            .cmp(&right.endpoint().address().to_string()),
        SortColumn::Port => left.endpoint().port().cmp(&right.endpoint().port()),
        SortColumn::CreatedAt => left.created_at().cmp(&right.created_at()),
        SortColumn::UpdatedAt => left.updated_at().cmp(&right.updated_at()),
    }
}
