//! Shared fixtures for the `PostgreSQL` adapter tests.

pub use super::cluster::{BoxError, PostgresCluster, postgres_cluster, test_runtime};
use chrono::{DateTime, TimeZone, Utc};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use std::sync::atomic::{AtomicU64, Ordering};

/// Registry schema.
pub const CREATE_SERVERS_SQL: &str =
    include_str!("../../migrations/2026-09-01-000000_create_servers/up.sql");

/// Status sample schema.
pub const CREATE_STATUS_SAMPLES_SQL: &str =
    include_str!("../../migrations/2026-09-01-000001_create_status_samples/up.sql");

/// Template database holding the migrated schema.
pub const TEMPLATE_DB: &str = "fleetwatch_test_template";

static DATABASE_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Connection pool type shared by both SQL adapters.
pub type TestPool = Pool<ConnectionManager<PgConnection>>;

/// Creates the template database with every migration applied.
///
/// # Errors
///
/// Returns an error if template creation or migration fails.
pub fn ensure_template(cluster: PostgresCluster) -> Result<(), BoxError> {
    cluster.ensure_template(TEMPLATE_DB, apply_migrations)
}

fn apply_migrations(url: &str) -> Result<(), BoxError> {
    let mut connection = PgConnection::establish(url).map_err(|err| Box::new(err) as BoxError)?;
    for statement in [CREATE_SERVERS_SQL, CREATE_STATUS_SAMPLES_SQL] {
        connection
            .batch_execute(statement)
            .map_err(|err| Box::new(err) as BoxError)?;
    }
    Ok(())
}

/// Returns a database name no other test in this process will use.
pub fn unique_database_name(prefix: &str) -> String {
    let sequence = DATABASE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{}_{sequence}", std::process::id())
}

/// Builds a small pool against `database`.
///
/// # Errors
///
/// Returns an error if the pool cannot connect.
pub fn pool_for(cluster: PostgresCluster, database: &str) -> Result<TestPool, BoxError> {
    Pool::builder()
        .max_size(2)
        .build(ConnectionManager::<PgConnection>::new(
            cluster.database_url(database),
        ))
        .map_err(|err| Box::new(err) as BoxError)
}

/// Drops a per-test database when the test finishes, pass or fail.
pub struct CleanupGuard {
    cluster: PostgresCluster,
    database: String,
    cleaned: bool,
}

impl CleanupGuard {
    /// Clones the template into `database` and guards it.
    ///
    /// # Errors
    ///
    /// Returns an error if the clone fails.
    pub fn create(cluster: PostgresCluster, database: String) -> Result<Self, BoxError> {
        cluster.clone_template(&database, TEMPLATE_DB)?;
        Ok(Self {
            cluster,
            database,
            cleaned: false,
        })
    }

    /// Returns the guarded database name.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Drops the database now, reporting any failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the drop fails.
    pub fn cleanup(mut self) -> Result<(), BoxError> {
        self.cleaned = true;
        self.cluster.drop_database(&self.database)
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if !self.cleaned {
            drop(self.cluster.drop_database(&self.database));
        }
    }
}

/// Fixed reference instant offset by `seconds`.
pub fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + seconds, 0)
        .single()
        .expect("valid timestamp")
}

/// Returns whether a ratio matches `expected` to within `1e-9`.
#[expect(clippy::float_arithmetic, reason = "ratios are compared with a tolerance")]
pub fn ratio_close_to(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-9
}
