#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use domain::{LocationRecord, Status};
use mailroom_storage::{
    ChangeItem, ChangeSubscription, InMemoryStatusStore, StatusStore, StorageError,
};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 3, 14, 0, 0)
        .single()
        .expect("valid time")
}

/// 可脚本化的存储：读写可切换为失败，变更推送由测试手动注入。
pub struct ScriptedStore {
    pub inner: InMemoryStatusStore,
    fail_writes: AtomicBool,
    fail_loads: AtomicBool,
    subscribe_failures: AtomicUsize,
    subscribe_calls: AtomicUsize,
    feeds: Mutex<Vec<mpsc::Sender<ChangeItem>>>,
    write_delay: Mutex<Option<(Status, Duration)>>,
}

impl ScriptedStore {
    pub fn new(records: impl IntoIterator<Item = LocationRecord>) -> Self {
        Self {
            inner: InMemoryStatusStore::with_records(records),
            fail_writes: AtomicBool::new(false),
            fail_loads: AtomicBool::new(false),
            subscribe_failures: AtomicUsize::new(0),
            subscribe_calls: AtomicUsize::new(0),
            feeds: Mutex::new(Vec::new()),
            write_delay: Mutex::new(None),
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_next_subscribes(&self, count: usize) {
        self.subscribe_failures.store(count, Ordering::SeqCst);
    }

    /// 写入指定状态前先等待 `delay`，用于制造写入乱序。
    pub fn delay_writes_of(&self, status: Status, delay: Duration) {
        *self.write_delay.lock().expect("delay lock") = Some((status, delay));
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    /// 向最近一次建立的订阅推送一项。
    pub async fn push(&self, item: ChangeItem) {
        let sender = self
            .feeds
            .lock()
            .expect("feeds lock")
            .last()
            .cloned()
            .expect("no active subscription");
        sender.send(item).await.expect("subscriber alive");
    }

    /// 关闭所有订阅（接收端随后收到 `None`）。
    pub fn close_feeds(&self) {
        self.feeds.lock().expect("feeds lock").clear();
    }
}

#[async_trait]
impl StatusStore for ScriptedStore {
    async fn load_all(&self) -> Result<Vec<LocationRecord>, StorageError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StorageError::new("load down"));
        }
        self.inner.load_all().await
    }

    async fn write_status(
        &self,
        name: &str,
        status: Status,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let delay = *self.write_delay.lock().expect("delay lock");
        if let Some((delayed, duration)) = delay
            && delayed == status
        {
            tokio::time::sleep(duration).await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::new("write down"));
        }
        self.inner.write_status(name, status, at).await
    }

    async fn subscribe_changes(&self) -> Result<ChangeSubscription, StorageError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.subscribe_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.subscribe_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StorageError::new("feed down"));
        }
        let (sender, subscription) = ChangeSubscription::channel();
        self.feeds.lock().expect("feeds lock").push(sender);
        Ok(subscription)
    }

    async fn insert_if_missing(&self, record: &LocationRecord) -> Result<bool, StorageError> {
        self.inner.insert_if_missing(record).await
    }
}
