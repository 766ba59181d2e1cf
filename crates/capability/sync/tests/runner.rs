mod support;

use chrono::TimeDelta;
use domain::{LocationRecord, Registry, Status};
use mailroom_storage::{ChangeEvent, StatusStore, StorageError};
use mailroom_sync::{
    BoardHandle, BoardSnapshot, RunnerConfig, SyncError, SyncNotice, spawn_board,
};
use std::sync::Arc;
use std::time::Duration;
use support::{ScriptedStore, t0};
use tokio::sync::{broadcast, watch};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn fast_config() -> RunnerConfig {
    RunnerConfig::from_millis(1_000, 10, 40)
}

fn start(store: Arc<ScriptedStore>) -> BoardHandle {
    spawn_board(store, Arc::new(Registry::campus_default()), fast_config())
}

async fn wait_for_snapshot(
    snapshots: &mut watch::Receiver<BoardSnapshot>,
    predicate: impl Fn(&BoardSnapshot) -> bool,
) -> BoardSnapshot {
    timeout(WAIT, async {
        loop {
            {
                let current = snapshots.borrow_and_update();
                if predicate(&current) {
                    return current.clone();
                }
            }
            snapshots.changed().await.expect("runner alive");
        }
    })
    .await
    .expect("snapshot in time")
}

async fn wait_for_notice(
    notices: &mut broadcast::Receiver<SyncNotice>,
    predicate: impl Fn(&SyncNotice) -> bool,
) -> SyncNotice {
    timeout(WAIT, async {
        loop {
            let notice = notices.recv().await.expect("notice");
            if predicate(&notice) {
                return notice;
            }
        }
    })
    .await
    .expect("notice in time")
}

#[tokio::test]
async fn initial_load_is_published() {
    let store = Arc::new(ScriptedStore::new(vec![
        LocationRecord::reported("Shaw Hall", Status::Open, t0()),
        LocationRecord::unreported("Day Hall"),
    ]));
    let handle = start(store);
    let client = handle.client();
    let mut snapshots = client.subscribe_snapshots();

    let snapshot = wait_for_snapshot(&mut snapshots, |s| s.loaded).await;

    assert_eq!(snapshot.records.len(), 2);
    assert!(snapshot.revision > 0);
    let view = snapshot
        .view(client.registry(), "Shaw Hall", t0() + TimeDelta::minutes(5))
        .expect("registry room");
    assert_eq!(view.effective_status, Status::Open);
    assert!(snapshot.view(client.registry(), "Nowhere", t0()).is_none());
}

#[tokio::test]
async fn report_reaches_store_and_snapshot() {
    let store = Arc::new(ScriptedStore::new(vec![LocationRecord::unreported("Booth Hall")]));
    let handle = start(store.clone());
    let client = handle.client();
    let mut snapshots = client.subscribe_snapshots();
    wait_for_snapshot(&mut snapshots, |s| s.loaded).await;

    client
        .report_status_at("Booth Hall", Status::Open, t0())
        .await
        .expect("report");

    let expected = LocationRecord::reported("Booth Hall", Status::Open, t0());
    assert_eq!(store.inner.get("Booth Hall"), Some(expected.clone()));
    assert_eq!(client.snapshot().records.get("Booth Hall"), Some(&expected));
}

#[tokio::test]
async fn delayed_older_report_does_not_overwrite_newer_one() {
    let store = Arc::new(ScriptedStore::new(vec![LocationRecord::unreported("Shaw Hall")]));
    store.delay_writes_of(Status::Open, Duration::from_millis(200));
    let handle = start(store.clone());
    let client = handle.client();
    let mut snapshots = client.subscribe_snapshots();
    wait_for_snapshot(&mut snapshots, |s| s.loaded).await;

    let newer = t0() + TimeDelta::seconds(5);
    let (opened, closed) = tokio::join!(
        client.report_status_at("Shaw Hall", Status::Open, t0()),
        client.report_status_at("Shaw Hall", Status::Closed, newer),
    );
    opened.expect("open report");
    closed.expect("closed report");

    let expected = LocationRecord::reported("Shaw Hall", Status::Closed, newer);
    assert_eq!(store.inner.get("Shaw Hall"), Some(expected.clone()));
    assert_eq!(client.snapshot().records.get("Shaw Hall"), Some(&expected));
}

#[tokio::test]
async fn failed_write_resyncs_and_notifies() {
    let stored = LocationRecord::reported("Shaw Hall", Status::Closed, t0());
    let store = Arc::new(ScriptedStore::new(vec![stored.clone()]));
    let handle = start(store.clone());
    let client = handle.client();
    let mut notices = client.subscribe_notices();
    let mut snapshots = client.subscribe_snapshots();
    wait_for_snapshot(&mut snapshots, |s| s.loaded).await;

    store.fail_writes(true);
    let err = client
        .report_status_at("Shaw Hall", Status::Open, t0() + TimeDelta::minutes(1))
        .await
        .expect_err("write down");

    assert_eq!(
        err,
        SyncError::Write {
            name: "Shaw Hall".to_string(),
            message: "write down".to_string(),
            resynced: true,
        }
    );
    assert_eq!(client.snapshot().records.get("Shaw Hall"), Some(&stored));
    let notice = wait_for_notice(&mut notices, |n| matches!(n, SyncNotice::WriteFailed { .. })).await;
    assert_eq!(
        notice,
        SyncNotice::WriteFailed {
            name: "Shaw Hall".to_string(),
            message: "write down".to_string(),
        }
    );
}

#[tokio::test]
async fn rejected_reports_do_not_touch_the_board() {
    let store = Arc::new(ScriptedStore::new(Vec::new()));
    let handle = start(store.clone());
    let client = handle.client();

    let err = client
        .report_status("Nowhere Hall", Status::Open)
        .await
        .expect_err("unknown");
    assert_eq!(err, SyncError::UnknownLocation("Nowhere Hall".to_string()));
    assert!(client.snapshot().records.is_empty());
    assert_eq!(store.inner.len(), 0);
}

#[tokio::test]
async fn change_feed_events_are_merged() {
    let store = Arc::new(ScriptedStore::new(vec![LocationRecord::reported(
        "Haven Hall",
        Status::Open,
        t0(),
    )]));
    let handle = start(store.clone());
    let client = handle.client();
    let mut snapshots = client.subscribe_snapshots();
    wait_for_snapshot(&mut snapshots, |s| s.loaded).await;

    store
        .push(Ok(ChangeEvent::Updated(LocationRecord::reported(
            "Haven Hall",
            Status::Closed,
            t0() - TimeDelta::minutes(1),
        ))))
        .await;
    store
        .push(Ok(ChangeEvent::Inserted(LocationRecord::reported(
            "Milton Hall",
            Status::Closed,
            t0(),
        ))))
        .await;

    let snapshot = wait_for_snapshot(&mut snapshots, |s| s.records.contains_key("Milton Hall")).await;
    assert_eq!(
        snapshot.records.get("Haven Hall").map(|r| r.raw_status),
        Some(Status::Open)
    );

    store
        .push(Ok(ChangeEvent::Deleted("Milton Hall".to_string())))
        .await;
    let snapshot = wait_for_snapshot(&mut snapshots, |s| !s.records.contains_key("Milton Hall")).await;
    let view = snapshot
        .view(client.registry(), "Milton Hall", t0())
        .expect("registry room");
    assert_eq!(view.effective_status, Status::Unknown);
}

#[tokio::test]
async fn lost_feed_is_resubscribed_and_reloaded() {
    let store = Arc::new(ScriptedStore::new(vec![LocationRecord::unreported("Sadler Hall")]));
    let handle = start(store.clone());
    let client = handle.client();
    let mut notices = client.subscribe_notices();
    let mut snapshots = client.subscribe_snapshots();
    wait_for_snapshot(&mut snapshots, |s| s.loaded).await;

    store
        .inner
        .write_status("Sadler Hall", Status::Open, t0())
        .await
        .expect("write behind the feed");
    store.push(Err(StorageError::new("connection reset"))).await;

    let lost = wait_for_notice(&mut notices, |n| matches!(n, SyncNotice::SubscriptionLost { .. })).await;
    assert_eq!(
        lost,
        SyncNotice::SubscriptionLost {
            message: "connection reset".to_string(),
        }
    );
    wait_for_notice(&mut notices, |n| *n == SyncNotice::Resubscribed).await;

    let snapshot = wait_for_snapshot(&mut snapshots, |s| {
        s.records.get("Sadler Hall").map(|r| r.raw_status) == Some(Status::Open)
    })
    .await;
    assert_eq!(snapshot.records.len(), 1);
    assert_eq!(store.subscribe_calls(), 2);
}

#[tokio::test]
async fn closed_feed_retries_with_backoff() {
    let store = Arc::new(ScriptedStore::new(Vec::new()));
    store.fail_next_subscribes(2);
    let handle = start(store.clone());
    let client = handle.client();
    let mut notices = client.subscribe_notices();
    let mut snapshots = client.subscribe_snapshots();

    wait_for_snapshot(&mut snapshots, |s| s.loaded).await;
    wait_for_notice(&mut notices, |n| *n == SyncNotice::Resubscribed).await;
    assert_eq!(store.subscribe_calls(), 3);

    store.close_feeds();
    let lost = wait_for_notice(&mut notices, |n| matches!(n, SyncNotice::SubscriptionLost { .. })).await;
    assert_eq!(
        lost,
        SyncNotice::SubscriptionLost {
            message: "change feed closed".to_string(),
        }
    );
    wait_for_notice(&mut notices, |n| *n == SyncNotice::Resubscribed).await;
}

#[tokio::test]
async fn reload_reports_count_or_failure() {
    let store = Arc::new(ScriptedStore::new(vec![
        LocationRecord::unreported("Day Hall"),
        LocationRecord::unreported("Flint Hall"),
    ]));
    let handle = start(store.clone());
    let client = handle.client();

    assert_eq!(client.reload().await.expect("reload"), 2);

    store.fail_loads(true);
    let err = client.reload().await.expect_err("load down");
    assert_eq!(err, SyncError::Load("load down".to_string()));
    assert_eq!(client.snapshot().records.len(), 2);
}

#[tokio::test]
async fn shutdown_stops_the_runner() {
    let store = Arc::new(ScriptedStore::new(Vec::new()));
    let handle = start(store);
    let client = handle.client();

    handle.shutdown().await;

    let err = client.reload().await.expect_err("stopped");
    assert_eq!(err, SyncError::Closed);
}
