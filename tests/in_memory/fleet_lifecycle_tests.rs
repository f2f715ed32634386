//! End-to-end fleet lifecycle over in-memory stores.

use crate::in_memory::helpers::{event, ratio_close_to, request, stores};
use chrono::Utc;
use fleetwatch::server::domain::{ServerPatch, ServerStatus};
use fleetwatch::status::adapters::memory::channel_source;
use fleetwatch::status::domain::SampleWindow;
use fleetwatch::wiring::StoreHandles;
use mockable::DefaultClock;
use rstest::rstest;
use std::num::{NonZeroU32, NonZeroUsize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn workers() -> NonZeroU32 {
    NonZeroU32::new(4).expect("non-zero worker count")
}

fn server_cap() -> NonZeroUsize {
    NonZeroUsize::new(1_000).expect("non-zero cap")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn register_observe_resync_and_report(stores: StoreHandles) {
    let clock = Arc::new(DefaultClock);
    let admin = stores.administration(Arc::clone(&clock));
    let started = Utc::now();

    let web = admin
        .create(request("web-01", 1, ServerStatus::Off))
        .await
        .expect("registration should succeed");
    let db = admin
        .create(request("db-01", 2, ServerStatus::On))
        .await
        .expect("registration should succeed");
    assert!(
        stores
            .cache
            .is_online(db.internal_id())
            .await
            .expect("cache read should succeed")
    );

    let (sender, mut source) = channel_source(8);
    let events = vec![
        event(web.internal_id(), true),
        event(web.internal_id(), true),
        event(db.internal_id(), false),
        event(db.internal_id(), true),
    ];
    let publisher = tokio::spawn(async move {
        for payload in events {
            assert!(sender.publish(payload).await);
        }
    });
    let report = stores
        .ingestor(Arc::clone(&clock), workers())
        .run(&mut source, CancellationToken::new())
        .await
        .expect("ingestion should succeed");
    publisher.await.expect("publisher should finish");
    assert_eq!(report.received, 4);
    assert_eq!(source.acknowledged(), 4);

    let refreshed = admin
        .find("web-01")
        .await
        .expect("lookup should succeed")
        .expect("server should exist");
    assert_eq!(refreshed.status(), ServerStatus::On);

    let resync = stores.resync().resync().await.expect("resync should succeed");
    assert_eq!(resync.registered, 2);

    let window = SampleWindow::new(started, Utc::now()).expect("valid window");
    let summary = stores
        .report(server_cap())
        .summary_for(&window, None)
        .await
        .expect("summary should succeed");
    assert_eq!(summary.num_servers, 2);
    assert_eq!(summary.num_online, resync.online_count.unwrap_or_default());
    assert!(summary.has_data);
    assert!(ratio_close_to(summary.mean_uptime_ratio, 0.75));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn admin_status_change_is_visible_to_the_report(stores: StoreHandles) {
    let admin = stores.administration(Arc::new(DefaultClock));
    admin
        .create(request("web-01", 1, ServerStatus::Off))
        .await
        .expect("registration should succeed");

    admin
        .update("web-01", &ServerPatch::new().with_status(ServerStatus::On))
        .await
        .expect("update should succeed");
    let summary = stores
        .report(server_cap())
        .summary(0, 1)
        .await
        .expect("summary should succeed");

    assert_eq!(summary.num_servers, 1);
    assert_eq!(summary.num_online, 1);
    assert_eq!(summary.num_offline, 0);
    assert!(!summary.has_data);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deleted_server_disappears_from_cache_and_count(stores: StoreHandles) {
    let admin = stores.administration(Arc::new(DefaultClock));
    let record = admin
        .create(request("web-01", 1, ServerStatus::On))
        .await
        .expect("registration should succeed");

    admin.delete("web-01").await.expect("delete should succeed");

    assert!(
        !stores
            .cache
            .is_online(record.internal_id())
            .await
            .expect("cache read should succeed")
    );
    assert_eq!(admin.count().await.expect("count should succeed"), 0);
}
