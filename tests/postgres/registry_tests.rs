//! `PostgresServerRegistry` against a live database.

use crate::postgres::helpers::{
    CleanupGuard, PostgresCluster, ensure_template, pool_for, postgres_cluster, test_runtime,
    unique_database_name,
};
use fleetwatch::server::adapters::postgres::PostgresServerRegistry;
use fleetwatch::server::domain::{
    ExternalId, IdRange, InternalId, NewServer, ServerEndpoint, ServerFilter, ServerPatch,
    ServerQuery, ServerStatus, SortColumn, SortOrder,
};
use fleetwatch::server::ports::{ServerRegistryError, ServerRegistryRepository};
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use std::collections::HashSet;
use std::net::Ipv4Addr;
use tokio::runtime::Runtime;

struct RegistryContext {
    guard: CleanupGuard,
    registry: PostgresServerRegistry,
    rt: Runtime,
}

impl RegistryContext {
    fn cleanup(self) {
        drop(self.registry);
        self.guard.cleanup().expect("cleanup database");
    }

    fn seed(&self) {
        let drafts = [
            draft("web-01", "web frontend", ServerStatus::On, 1, 443),
            draft("web-02", "web backup", ServerStatus::Off, 2, 443),
            draft("db-01", "database", ServerStatus::On, 3, 5432),
            draft("cache-01", "cache_100%", ServerStatus::Off, 4, 6379),
        ];
        for server in &drafts {
            self.rt
                .block_on(self.registry.create(server))
                .expect("seed insert");
        }
    }

    fn search(&self, query: &ServerQuery) -> Vec<String> {
        self.rt
            .block_on(self.registry.search(query))
            .expect("search should succeed")
            .iter()
            .map(|record| record.external_id().as_str().to_owned())
            .collect()
    }
}

#[fixture]
fn registry_context(postgres_cluster: PostgresCluster) -> RegistryContext {
    let cluster = postgres_cluster;
    ensure_template(cluster).expect("template setup");
    let guard = CleanupGuard::create(cluster, unique_database_name("registry"))
        .expect("database setup");
    let pool = pool_for(cluster, guard.database()).expect("pool setup");
    RegistryContext {
        guard,
        registry: PostgresServerRegistry::new(pool),
        rt: test_runtime().expect("tokio runtime"),
    }
}

fn draft(
    external_id: &str,
    name: &str,
    status: ServerStatus,
    last_octet: u8,
    port: u16,
) -> NewServer {
    NewServer::new(
        ExternalId::new(external_id).expect("valid external id"),
        name,
        status,
        ServerEndpoint::new(Ipv4Addr::new(10, 0, 0, last_octet), port),
        &DefaultClock,
    )
    .expect("valid draft")
}

fn everything(sort_column: SortColumn, sort_order: SortOrder) -> ServerQuery {
    ServerQuery::new(
        IdRange::new(0, i64::MAX).expect("valid range"),
        sort_column,
        sort_order,
    )
}

#[rstest]
fn bulk_insert_partitions_across_chunks(registry_context: RegistryContext) {
    let context = registry_context;
    let seeded = draft("bulk-0007", "seeded", ServerStatus::On, 7, 22);
    context
        .rt
        .block_on(context.registry.create(&seeded))
        .expect("seed insert");
    let mut batch: Vec<NewServer> = (0_u16..2_500)
        .map(|index| {
            draft(
                &format!("bulk-{index:04}"),
                "bulk",
                ServerStatus::Off,
                1,
                index,
            )
        })
        .collect();
    batch.insert(10, draft("bulk-0004", "same chunk repeat", ServerStatus::On, 2, 4));
    batch.push(draft("bulk-0005", "later chunk repeat", ServerStatus::On, 2, 5));

    let outcome = context
        .rt
        .block_on(context.registry.create_many(&batch))
        .expect("bulk insert should succeed");

    let inserted: HashSet<&str> = outcome
        .inserted
        .iter()
        .map(|record| record.external_id().as_str())
        .collect();
    let rejected: HashSet<&str> = outcome
        .rejected
        .iter()
        .map(|server| server.external_id().as_str())
        .collect();
    let input: HashSet<&str> = batch
        .iter()
        .map(|server| server.external_id().as_str())
        .collect();
    assert_eq!(outcome.inserted.len(), 2_499);
    assert_eq!(rejected, HashSet::from(["bulk-0007"]));
    assert!(inserted.is_disjoint(&rejected));
    assert_eq!(&inserted | &rejected, input);
    assert_eq!(
        context.rt.block_on(context.registry.count()).expect("count"),
        2_500
    );
    let first_wins = context
        .rt
        .block_on(
            context
                .registry
                .find_by_external_id(&ExternalId::new("bulk-0004").expect("valid external id")),
        )
        .expect("lookup should succeed")
        .expect("record should exist");
    assert_eq!(first_wins.endpoint().port(), 4);
    assert_eq!(first_wins.name(), "bulk");

    context.cleanup();
}

#[rstest]
fn create_rejects_duplicate_external_id(registry_context: RegistryContext) {
    let context = registry_context;
    context.seed();

    let clash = draft("web-01", "clash", ServerStatus::Off, 9, 9);

    let result = context.rt.block_on(context.registry.create(&clash));

    assert!(matches!(
        result,
        Err(ServerRegistryError::DuplicateExternalId(ref id)) if id.as_str() == "web-01"
    ));

    context.cleanup();
}

#[rstest]
#[case(SortColumn::Port, SortOrder::Asc, ["web-01", "web-02", "db-01", "cache-01"])]
#[case(SortColumn::Port, SortOrder::Desc, ["cache-01", "db-01", "web-01", "web-02"])]
#[case(SortColumn::Status, SortOrder::Desc, ["web-01", "db-01", "web-02", "cache-01"])]
#[case(SortColumn::Status, SortOrder::Asc, ["web-02", "cache-01", "web-01", "db-01"])]
#[case(SortColumn::ExternalId, SortOrder::Asc, ["cache-01", "db-01", "web-01", "web-02"])]
fn search_orders_with_identifier_tie_break(
    registry_context: RegistryContext,
    #[case] column: SortColumn,
    #[case] order: SortOrder,
    #[case] expected: [&str; 4],
) {
    let context = registry_context;
    context.seed();

    assert_eq!(context.search(&everything(column, order)), expected);

    context.cleanup();
}

#[rstest]
#[case::underscore_and_percent("_100%", &["cache-01"][..])]
#[case::bare_percent("%", &["cache-01"][..])]
#[case::bare_underscore("_", &["cache-01"][..])]
#[case::plain_substring("web", &["web-01", "web-02"][..])]
fn name_filter_treats_like_wildcards_literally(
    registry_context: RegistryContext,
    #[case] needle: &str,
    #[case] expected: &[&str],
) {
    let context = registry_context;
    context.seed();
    let filter = ServerFilter {
        name_contains: Some(needle.to_owned()),
        ..ServerFilter::default()
    };

    let found = context
        .search(&everything(SortColumn::InternalId, SortOrder::Asc).with_filter(filter));

    assert_eq!(found, expected);

    context.cleanup();
}

#[rstest]
fn search_respects_identifier_range_and_filters(registry_context: RegistryContext) {
    let context = registry_context;
    context.seed();
    let filter = ServerFilter {
        status: Some(ServerStatus::Off),
        address: Some(Ipv4Addr::new(10, 0, 0, 4)),
        ..ServerFilter::default()
    };

    let in_range = context.search(&ServerQuery::new(
        IdRange::new(2, 3).expect("valid range"),
        SortColumn::InternalId,
        SortOrder::Asc,
    ));
    let filtered =
        context.search(&everything(SortColumn::InternalId, SortOrder::Asc).with_filter(filter));

    assert_eq!(in_range, ["web-02", "db-01"]);
    assert_eq!(filtered, ["cache-01"]);

    context.cleanup();
}

#[rstest]
fn partial_update_leaves_other_columns_untouched(registry_context: RegistryContext) {
    let context = registry_context;
    context.seed();
    let key = ExternalId::new("db-01").expect("valid external id");
    let before = context
        .rt
        .block_on(context.registry.find_by_external_id(&key))
        .expect("lookup should succeed")
        .expect("record should exist");
    let patch = ServerPatch::new().with_port(15_432);

    let after = context
        .rt
        .block_on(context.registry.update(&key, &patch, before.updated_at()))
        .expect("update should succeed");

    assert_eq!(after.endpoint().port(), 15_432);
    assert_eq!(after.endpoint().address(), before.endpoint().address());
    assert_eq!(after.name(), before.name());
    assert_eq!(after.status(), before.status());
    assert_eq!(after.internal_id(), before.internal_id());
    assert_eq!(after.created_at(), before.created_at());

    context.cleanup();
}

#[rstest]
fn update_and_delete_report_unknown_external_id(registry_context: RegistryContext) {
    let context = registry_context;
    let missing = ExternalId::new("ghost").expect("valid external id");

    let updated = context.rt.block_on(context.registry.update(
        &missing,
        &ServerPatch::new().with_status(ServerStatus::On),
        chrono::Utc::now(),
    ));
    let deleted = context.rt.block_on(context.registry.delete(&missing));

    assert!(matches!(updated, Err(ServerRegistryError::NotFound(_))));
    assert!(matches!(deleted, Err(ServerRegistryError::NotFound(_))));

    context.cleanup();
}

#[rstest]
fn set_status_updates_known_and_rejects_unknown_ids(registry_context: RegistryContext) {
    let context = registry_context;
    context.seed();

    context
        .rt
        .block_on(
            context
                .registry
                .set_status(InternalId::new(2), ServerStatus::On, chrono::Utc::now()),
        )
        .expect("set_status should succeed");
    let unknown = context.rt.block_on(context.registry.set_status(
        InternalId::new(404),
        ServerStatus::On,
        chrono::Utc::now(),
    ));

    let online = context.search(&everything(SortColumn::InternalId, SortOrder::Asc).with_filter(
        ServerFilter {
            status: Some(ServerStatus::On),
            ..ServerFilter::default()
        },
    ));
    assert_eq!(online, ["web-01", "web-02", "db-01"]);
    assert!(matches!(
        unknown,
        Err(ServerRegistryError::UnknownInternalId(id)) if id == InternalId::new(404)
    ));

    context.cleanup();
}

#[rstest]
fn deleted_identifiers_are_not_reused(registry_context: RegistryContext) {
    let context = registry_context;
    let key = ExternalId::new("solo").expect("valid external id");
    let first = context
        .rt
        .block_on(context.registry.create(&draft("solo", "A", ServerStatus::Off, 1, 1)))
        .expect("insert");
    context
        .rt
        .block_on(context.registry.delete(&key))
        .expect("delete");

    let replacement = context
        .rt
        .block_on(context.registry.create(&draft("solo", "B", ServerStatus::Off, 1, 1)))
        .expect("reinsert");

    assert!(replacement.internal_id() > first.internal_id());

    context.cleanup();
}

#[rstest]
fn address_feed_lists_every_server(registry_context: RegistryContext) {
    let context = registry_context;
    context.seed();

    let targets: Vec<String> = context
        .rt
        .block_on(context.registry.list_addresses())
        .expect("address feed")
        .iter()
        .map(|address| address.target())
        .collect();

    assert_eq!(
        targets,
        ["10.0.0.1:443", "10.0.0.2:443", "10.0.0.3:5432", "10.0.0.4:6379"]
    );

    context.cleanup();
}
