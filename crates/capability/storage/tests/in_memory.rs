use chrono::{TimeDelta, TimeZone, Utc};
use domain::{LocationRecord, Registry, Status};
use mailroom_storage::{ChangeEvent, InMemoryStatusStore, StatusStore, seed_registry};

fn t0() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 3, 14, 0, 0).single().expect("valid time")
}

#[tokio::test]
async fn write_then_load() {
    let store = InMemoryStatusStore::new();
    store
        .write_status("Shaw Hall", Status::Open, t0())
        .await
        .expect("write");
    store
        .write_status("Shaw Hall", Status::Closed, t0() + TimeDelta::minutes(1))
        .await
        .expect("write");

    let records = store.load_all().await.expect("load");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].raw_status, Status::Closed);
    assert_eq!(records[0].last_updated, Some(t0() + TimeDelta::minutes(1)));
}

#[tokio::test]
async fn write_rejects_blank_name() {
    let store = InMemoryStatusStore::new();
    let err = store
        .write_status("", Status::Open, t0())
        .await
        .expect_err("blank name");
    assert_eq!(err.to_string(), "location name required");
}

#[tokio::test]
async fn subscription_receives_insert_update_delete() {
    let store = InMemoryStatusStore::new();
    let mut changes = store.subscribe_changes().await.expect("subscribe");

    store
        .write_status("Day Hall", Status::Open, t0())
        .await
        .expect("write");
    store
        .write_status("Day Hall", Status::Closed, t0())
        .await
        .expect("write");
    assert!(store.remove("Day Hall").expect("remove"));

    let first = changes.recv().await.expect("event").expect("ok");
    assert_eq!(
        first,
        ChangeEvent::Inserted(LocationRecord::reported("Day Hall", Status::Open, t0()))
    );
    let second = changes.recv().await.expect("event").expect("ok");
    assert!(matches!(second, ChangeEvent::Updated(ref record) if record.raw_status == Status::Closed));
    let third = changes.recv().await.expect("event").expect("ok");
    assert_eq!(third, ChangeEvent::Deleted("Day Hall".to_string()));
}

#[tokio::test]
async fn seed_registry_keeps_existing_records() {
    let registry = Registry::campus_default();
    let store = InMemoryStatusStore::with_records([LocationRecord::reported(
        "Shaw Hall",
        Status::Open,
        t0(),
    )]);

    let inserted = seed_registry(&store, &registry).await.expect("seed");
    assert_eq!(inserted, registry.len() - 1);
    assert_eq!(store.len(), registry.len());
    assert_eq!(
        store.get("Shaw Hall").map(|record| record.raw_status),
        Some(Status::Open)
    );
    assert_eq!(
        store.get("Watson Hall"),
        Some(LocationRecord::unreported("Watson Hall"))
    );

    let again = seed_registry(&store, &registry).await.expect("seed again");
    assert_eq!(again, 0);
}

#[tokio::test]
async fn insert_if_missing_rejects_inconsistent_record() {
    let store = InMemoryStatusStore::new();
    let record = LocationRecord {
        name: "Flint Hall".to_string(),
        raw_status: Status::Open,
        last_updated: None,
    };
    store
        .insert_if_missing(&record)
        .await
        .expect_err("open without timestamp");
    assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn older_write_does_not_replace_newer_record() {
    let store = InMemoryStatusStore::new();
    let mut changes = store.subscribe_changes().await.expect("subscribe");
    let newer = t0() + TimeDelta::seconds(5);

    store
        .write_status("Shaw Hall", Status::Closed, newer)
        .await
        .expect("write newer");
    store
        .write_status("Shaw Hall", Status::Open, t0())
        .await
        .expect("older write is accepted");
    store
        .write_status("Shaw Hall", Status::Open, newer)
        .await
        .expect("same timestamp write");

    assert_eq!(
        store.get("Shaw Hall"),
        Some(LocationRecord::reported("Shaw Hall", Status::Open, newer))
    );
    let first = changes.recv().await.expect("event").expect("ok");
    assert_eq!(
        first,
        ChangeEvent::Inserted(LocationRecord::reported("Shaw Hall", Status::Closed, newer))
    );
    let second = changes.recv().await.expect("event").expect("ok");
    assert_eq!(
        second,
        ChangeEvent::Updated(LocationRecord::reported("Shaw Hall", Status::Open, newer))
    );
}
