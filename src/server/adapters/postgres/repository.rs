//! `PostgreSQL` repository implementation for the server registry.

use super::{
    models::{NewServerRow, ServerChangeset, ServerRow},
    schema::servers,
};
use crate::server::{
    domain::{
        ExternalId, InternalId, NewServer, PersistedServerData, ServerAddress, ServerEndpoint,
        ServerFilter, ServerPatch, ServerQuery, ServerRecord, ServerStatus, SortColumn, SortOrder,
    },
    ports::{
        BulkInsertOutcome, ServerRegistryError, ServerRegistryRepository, ServerRegistryResult,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by server adapters.
pub type ServerPgPool = Pool<ConnectionManager<PgConnection>>;

/// Rows per `INSERT` statement; eight bind parameters per row keeps each
/// statement far below the 65 535 parameter limit.
const BULK_INSERT_CHUNK: usize = 1_000;

type BoxedServerQuery = servers::BoxedQuery<'static, Pg>;

/// `PostgreSQL`-backed server registry.
#[derive(Debug, Clone)]
pub struct PostgresServerRegistry {
    pool: ServerPgPool,
}

impl PostgresServerRegistry {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: ServerPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, operation: F) -> ServerRegistryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> ServerRegistryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(ServerRegistryError::persistence)?;
            operation(&mut connection)
        })
        .await
        .map_err(ServerRegistryError::persistence)?
    }
}

#[async_trait]
impl ServerRegistryRepository for PostgresServerRegistry {
    async fn create(&self, server: &NewServer) -> ServerRegistryResult<ServerRecord> {
        let external_id = server.external_id().clone();
        let new_row = to_new_row(server);

        self.run_blocking(move |connection| {
            let row = diesel::insert_into(servers::table)
                .values(&new_row)
                .returning(ServerRow::as_returning())
                .get_result::<ServerRow>(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                        if is_external_id_unique_violation(info.as_ref()) =>
                    {
                        ServerRegistryError::DuplicateExternalId(external_id.clone())
                    }
                    _ => ServerRegistryError::persistence(err),
                })?;
            row_to_server(row)
        })
        .await
    }

    async fn create_many(&self, servers: &[NewServer]) -> ServerRegistryResult<BulkInsertOutcome> {
        let rows: Vec<NewServerRow> = servers.iter().map(to_new_row).collect();

        let inserted = self
            .run_blocking(move |connection| {
                connection.transaction::<_, ServerRegistryError, _>(|transaction| {
                    let mut stored_rows = Vec::with_capacity(rows.len());
                    for chunk in rows.chunks(BULK_INSERT_CHUNK) {
                        let stored = diesel::insert_into(servers::table)
                            .values(chunk)
                            .on_conflict(servers::server_id)
                            .do_nothing()
                            .returning(ServerRow::as_returning())
                            .get_results::<ServerRow>(transaction)
                            .map_err(ServerRegistryError::persistence)?;
                        stored_rows.extend(stored);
                    }
                    stored_rows.into_iter().map(row_to_server).collect()
                })
            })
            .await?;

        Ok(BulkInsertOutcome::partition(servers, inserted))
    }

    async fn search(&self, query: &ServerQuery) -> ServerRegistryResult<Vec<ServerRecord>> {
        let from = to_db_id(query.range.from())?;
        let to = to_db_id(query.range.to())?;
        let filter = query.filter.clone();
        let sort_column = query.sort_column;
        let sort_order = query.sort_order;

        self.run_blocking(move |connection| {
            let statement = servers::table
                .filter(servers::id.between(from, to))
                .into_boxed();
            let filtered = apply_filter(statement, &filter);
            let rows = apply_ordering(filtered, sort_column, sort_order)
                .then_order_by(servers::id.asc())
                .load::<ServerRow>(connection)
                .map_err(ServerRegistryError::persistence)?;
            rows.into_iter().map(row_to_server).collect()
        })
        .await
    }

    async fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> ServerRegistryResult<Option<ServerRecord>> {
        let lookup = external_id.as_str().to_owned();
        self.run_blocking(move |connection| {
            let row = servers::table
                .filter(servers::server_id.eq(&lookup))
                .select(ServerRow::as_select())
                .first::<ServerRow>(connection)
                .optional()
                .map_err(ServerRegistryError::persistence)?;
            row.map(row_to_server).transpose()
        })
        .await
    }

    async fn update(
        &self,
        external_id: &ExternalId,
        patch: &ServerPatch,
        updated_at: DateTime<Utc>,
    ) -> ServerRegistryResult<ServerRecord> {
        let missing = external_id.clone();
        let lookup = external_id.as_str().to_owned();
        let changeset = to_changeset(patch, updated_at);

        self.run_blocking(move |connection| {
            let row = diesel::update(servers::table.filter(servers::server_id.eq(&lookup)))
                .set(&changeset)
                .returning(ServerRow::as_returning())
                .get_result::<ServerRow>(connection)
                .optional()
                .map_err(ServerRegistryError::persistence)?
                .ok_or(ServerRegistryError::NotFound(missing))?;
            row_to_server(row)
        })
        .await
    }

    async fn delete(&self, external_id: &ExternalId) -> ServerRegistryResult<ServerRecord> {
        let missing = external_id.clone();
        let lookup = external_id.as_str().to_owned();

        self.run_blocking(move |connection| {
            let row = diesel::delete(servers::table.filter(servers::server_id.eq(&lookup)))
                .returning(ServerRow::as_returning())
                .get_result::<ServerRow>(connection)
                .optional()
                .map_err(ServerRegistryError::persistence)?
                .ok_or(ServerRegistryError::NotFound(missing))?;
            row_to_server(row)
        })
        .await
    }

    async fn set_status(
        &self,
        internal_id: InternalId,
        status: ServerStatus,
        updated_at: DateTime<Utc>,
    ) -> ServerRegistryResult<()> {
        let id = to_db_id(internal_id)?;

        self.run_blocking(move |connection| {
            let updated_count = diesel::update(servers::table.filter(servers::id.eq(id)))
                .set((
                    servers::status.eq(status.as_str()),
                    servers::updated_at.eq(updated_at),
                ))
                .execute(connection)
                .map_err(ServerRegistryError::persistence)?;

            if updated_count == 0 {
                return Err(ServerRegistryError::UnknownInternalId(internal_id));
            }
            Ok(())
        })
        .await
    }

    async fn list_all(&self) -> ServerRegistryResult<Vec<ServerRecord>> {
        self.run_blocking(move |connection| {
            let rows = servers::table
                .order(servers::id.asc())
                .select(ServerRow::as_select())
                .load::<ServerRow>(connection)
                .map_err(ServerRegistryError::persistence)?;
            rows.into_iter().map(row_to_server).collect()
        })
        .await
    }

    async fn list_addresses(&self) -> ServerRegistryResult<Vec<ServerAddress>> {
        self.run_blocking(move |connection| {
            let rows = servers::table
                .order(servers::id.asc())
                .select((servers::id, servers::ipv4, servers::port))
                .load::<(i64, String, i32)>(connection)
                .map_err(ServerRegistryError::persistence)?;
            rows.into_iter()
                .map(|(id, ipv4, port)| {
                    Ok(ServerAddress {
                        internal_id: from_db_id(id)?,
                        endpoint: parse_endpoint(&ipv4, port)?,
                    })
                })
                .collect()
        })
        .await
    }

    async fn count(&self) -> ServerRegistryResult<u64> {
        self.run_blocking(move |connection| {
            let total = servers::table
                .count()
                .get_result::<i64>(connection)
                .map_err(ServerRegistryError::persistence)?;
            u64::try_from(total).map_err(ServerRegistryError::invalid_persisted_data)
        })
        .await
    }
}

fn apply_filter(mut statement: BoxedServerQuery, filter: &ServerFilter) -> BoxedServerQuery {
    if let Some(external_id) = &filter.external_id {
        statement = statement.filter(servers::server_id.eq(external_id.as_str().to_owned()));
    }
    if let Some(fragment) = &filter.name_contains {
        statement = statement.filter(servers::server_name.like(like_pattern(fragment)));
    }
    if let Some(status) = filter.status {
        statement = statement.filter(servers::status.eq(status.as_str()));
    }
    if let Some(address) = filter.address {
        statement = statement.filter(servers::ipv4.eq(address.to_string()));
    }
    if let Some(port) = filter.port.port() {
        statement = statement.filter(servers::port.eq(i32::from(port)));
    }
    statement
}

macro_rules! order_by {
    ($statement:expr, $column:expr, $order:expr) => {
        match $order {
            SortOrder::Asc => $statement.order($column.asc()),
            SortOrder::Desc => $statement.order($column.desc()),
        }
    };
}

fn apply_ordering(
    statement: BoxedServerQuery,
    column: SortColumn,
    order: SortOrder,
) -> BoxedServerQuery {
    match column {
        SortColumn::InternalId => order_by!(statement, servers::id, order),
        SortColumn::ExternalId => order_by!(statement, servers::server_id, order),
        SortColumn::Name => order_by!(statement, servers::server_name, order),
        SortColumn::Status => order_by!(statement, servers::status, order),
        SortColumn::Address => order_by!(statement, servers::ipv4, order),
        SortColumn::Port => order_by!(statement, servers::port, order),
        SortColumn::CreatedAt => order_by!(statement, servers::created_at, order),
        SortColumn::UpdatedAt => order_by!(statement, servers::updated_at, order),
    }
}

/// Builds a `LIKE` pattern matching `fragment` anywhere, with wildcard
/// characters in `fragment` matched literally.
pub(super) fn like_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for character in fragment.chars() {
        if matches!(character, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(character);
    }
    pattern.push('%');
    pattern
}

fn to_new_row(server: &NewServer) -> NewServerRow {
    NewServerRow {
        server_id: server.external_id().as_str().to_owned(),
        server_name: server.name().to_owned(),
        status: server.status().as_str().to_owned(),
        ipv4: server.endpoint().address().to_string(),
        port: i32::from(server.endpoint().port()),
        created_at: server.created_at(),
        updated_at: server.created_at(),
    }
}

fn to_changeset(patch: &ServerPatch, updated_at: DateTime<Utc>) -> ServerChangeset {
    ServerChangeset {
        server_name: patch.name().map(str::to_owned),
        status: patch.status().map(|status| status.as_str().to_owned()),
        ipv4: patch.address().map(|address| address.to_string()),
        port: patch.port().map(i32::from),
        updated_at,
    }
}

fn to_db_id(internal_id: InternalId) -> ServerRegistryResult<i64> {
    i64::try_from(internal_id.value()).map_err(ServerRegistryError::persistence)
}

fn from_db_id(id: i64) -> ServerRegistryResult<InternalId> {
    u64::try_from(id)
        .map(InternalId::new)
        .map_err(ServerRegistryError::invalid_persisted_data)
}

fn parse_endpoint(ipv4: &str, port: i32) -> ServerRegistryResult<ServerEndpoint> {
    let parsed_port = u16::try_from(port).map_err(ServerRegistryError::invalid_persisted_data)?;
    ServerEndpoint::parse(ipv4, parsed_port).map_err(ServerRegistryError::invalid_persisted_data)
}

fn row_to_server(row: ServerRow) -> ServerRegistryResult<ServerRecord> {
    let ServerRow {
        id,
        server_id,
        server_name,
        status,
        ipv4,
        port,
        created_at,
        updated_at,
    } = row;

    let data = PersistedServerData {
        internal_id: from_db_id(id)?,
        external_id: ExternalId::new(server_id)
            .map_err(ServerRegistryError::invalid_persisted_data)?,
        name: server_name,
        status: ServerStatus::try_from(status.as_str())
            .map_err(ServerRegistryError::invalid_persisted_data)?,
        endpoint: parse_endpoint(&ipv4, port)?,
        created_at,
        updated_at,
    };
    Ok(ServerRecord::from_persisted(data))
}

fn is_external_id_unique_violation(info: &dyn DatabaseErrorInformation) -> bool {
    info.constraint_name()
        .is_some_and(|name| name == "servers_server_id_unique")
}
