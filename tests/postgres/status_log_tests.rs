//! `PostgresStatusLog` window queries and uptime weighting.

use crate::postgres::helpers::{
    CleanupGuard, PostgresCluster, at, ensure_template, pool_for, postgres_cluster,
    ratio_close_to, test_runtime, unique_database_name,
};
use fleetwatch::server::domain::{InternalId, ServerStatus};
use fleetwatch::status::adapters::postgres::PostgresStatusLog;
use fleetwatch::status::domain::{SampleWindow, ServerSampleCounts, StatusSample};
use fleetwatch::status::ports::StatusLog;
use fleetwatch::status::services::{UptimeAggregator, UptimeAggregatorError};
use rstest::{fixture, rstest};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::runtime::Runtime;

struct LogContext {
    guard: CleanupGuard,
    log: Arc<PostgresStatusLog>,
    rt: Runtime,
}

impl LogContext {
    fn cleanup(self) {
        drop(self.log);
        self.guard.cleanup().expect("cleanup database");
    }

    fn record(&self, id: u64, samples: &[(ServerStatus, i64)]) {
        for (status, offset) in samples {
            self.rt
                .block_on(self.log.append(&StatusSample::new(
                    InternalId::new(id),
                    *status,
                    at(*offset),
                )))
                .expect("append should succeed");
        }
    }

    fn counts(&self, start: i64, end: i64, limit: usize) -> Vec<ServerSampleCounts> {
        self.rt
            .block_on(self.log.window_counts(&window(start, end), limit))
            .expect("window query should succeed")
    }
}

#[fixture]
fn log_context(postgres_cluster: PostgresCluster) -> LogContext {
    let cluster = postgres_cluster;
    ensure_template(cluster).expect("template setup");
    let guard =
        CleanupGuard::create(cluster, unique_database_name("status_log")).expect("database setup");
    let pool = pool_for(cluster, guard.database()).expect("pool setup");
    LogContext {
        guard,
        log: Arc::new(PostgresStatusLog::new(pool)),
        rt: test_runtime().expect("tokio runtime"),
    }
}

fn window(start: i64, end: i64) -> SampleWindow {
    SampleWindow::new(at(start), at(end)).expect("valid window")
}

fn cap(value: usize) -> NonZeroUsize {
    NonZeroUsize::new(value).expect("non-zero cap")
}

#[rstest]
fn window_bounds_are_inclusive_and_exclude_outside_samples(log_context: LogContext) {
    use ServerStatus::{Off, On};
    let context = log_context;
    context.record(1, &[(Off, 9), (On, 10), (On, 15), (Off, 20), (On, 21)]);
    context.record(2, &[(On, 30)]);

    let counts = context.counts(10, 20, 100);

    assert_eq!(counts, [ServerSampleCounts::new(InternalId::new(1), 2, 3)]);

    context.cleanup();
}

#[rstest]
fn duplicate_samples_are_all_counted(log_context: LogContext) {
    use ServerStatus::{Off, On};
    let context = log_context;
    context.record(4, &[(On, 5), (On, 5), (On, 5), (Off, 6)]);

    let counts = context.counts(0, 10, 100);

    assert_eq!(counts, [ServerSampleCounts::new(InternalId::new(4), 3, 4)]);

    context.cleanup();
}

#[rstest]
fn window_counts_are_ordered_by_server_and_limited(log_context: LogContext) {
    let context = log_context;
    for id in [30, 10, 20] {
        context.record(id, &[(ServerStatus::On, 1)]);
    }

    let counts = context.counts(0, 10, 2);

    let ids: Vec<u64> = counts.iter().map(|count| count.internal_id.value()).collect();
    assert_eq!(ids, [10, 20]);

    context.cleanup();
}

#[rstest]
fn mean_uptime_weights_each_server_equally(log_context: LogContext) {
    use ServerStatus::{Off, On};
    let context = log_context;
    context.record(1, &[(On, 0), (On, 1), (Off, 2)]);
    context.record(2, &[(On, 0)]);
    context.record(3, &[(Off, 500)]);
    let aggregator = UptimeAggregator::new(Arc::clone(&context.log), cap(16));

    let summary = context
        .rt
        .block_on(aggregator.mean_uptime(&window(0, 100)))
        .expect("aggregation should succeed");

    assert_eq!(summary.servers_with_data(), 2);
    assert!(ratio_close_to(
        summary.mean_uptime_ratio(),
        0.833_333_333_333_333_4
    ));
    assert!(!ratio_close_to(summary.mean_uptime_ratio(), 0.75));

    context.cleanup();
}

#[rstest]
fn aggregation_refuses_windows_over_the_server_cap(log_context: LogContext) {
    let context = log_context;
    for id in 1..=3 {
        context.record(id, &[(ServerStatus::On, 1)]);
    }
    let aggregator = UptimeAggregator::new(Arc::clone(&context.log), cap(2));

    let result = context.rt.block_on(aggregator.mean_uptime(&window(0, 10)));

    assert!(matches!(
        result,
        Err(UptimeAggregatorError::TooManyServers { .. })
    ));

    context.cleanup();
}
