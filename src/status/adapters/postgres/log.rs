//! `PostgreSQL` status log with in-database aggregation.

use super::{
    models::{NewStatusSampleRow, WindowCountRow},
    schema::status_samples,
};
use crate::server::domain::InternalId;
use crate::status::{
    domain::{SampleWindow, ServerSampleCounts, StatusSample},
    ports::{StatusLog, StatusLogError, StatusLogResult},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};

/// `PostgreSQL` connection pool type used by status adapters.
pub type StatusPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed status log.
#[derive(Debug, Clone)]
pub struct PostgresStatusLog {
    pool: StatusPgPool,
}

impl PostgresStatusLog {
    /// Creates a new log from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: StatusPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, operation: F) -> StatusLogResult<T>
    where
        F: FnOnce(&mut PgConnection) -> StatusLogResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(StatusLogError::backend)?;
            operation(&mut connection)
        })
        .await
        .map_err(StatusLogError::backend)?
    }
}

#[async_trait]
impl StatusLog for PostgresStatusLog {
    async fn append(&self, sample: &StatusSample) -> StatusLogResult<()> {
        let row = NewStatusSampleRow {
            server_id: i64::try_from(sample.internal_id().value())
                .map_err(StatusLogError::backend)?,
            status: sample.status().as_str().to_owned(),
            sampled_at: sample.sampled_at(),
        };

        self.run_blocking(move |connection| {
            diesel::insert_into(status_samples::table)
                .values(&row)
                .execute(connection)?;
            Ok(())
        })
        .await
    }

    async fn window_counts(
        &self,
        window: &SampleWindow,
        limit: usize,
    ) -> StatusLogResult<Vec<ServerSampleCounts>> {
        let start = window.start();
        let end = window.end();
        let row_limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.run_blocking(move |connection| {
            let rows = diesel::sql_query(concat!(
                "SELECT server_id, ",
                "COUNT(*) FILTER (WHERE status = 'On') AS online, ",
                "COUNT(*) AS total ",
                "FROM status_samples ",
                "WHERE sampled_at BETWEEN $1 AND $2 ",
                "GROUP BY server_id ",
                "ORDER BY server_id ",
                "LIMIT $3",
            ))
            .bind::<diesel::sql_types::Timestamptz, _>(start)
            .bind::<diesel::sql_types::Timestamptz, _>(end)
            .bind::<diesel::sql_types::BigInt, _>(row_limit)
            .load::<WindowCountRow>(connection)?;

            rows.into_iter().map(row_to_counts).collect()
        })
        .await
    }
}

fn row_to_counts(row: WindowCountRow) -> StatusLogResult<ServerSampleCounts> {
    let WindowCountRow {
        server_id,
        online,
        total,
    } = row;
    Ok(ServerSampleCounts::new(
        InternalId::new(u64::try_from(server_id).map_err(StatusLogError::invalid_stored_data)?),
        u64::try_from(online).map_err(StatusLogError::invalid_stored_data)?,
        u64::try_from(total).map_err(StatusLogError::invalid_stored_data)?,
    ))
}
