//! 邮件室状态内存实现

use crate::error::StorageError;
use crate::models::ChangeEvent;
use crate::subscription::ChangeSubscription;
use crate::traits::StatusStore;
use crate::validation::{ensure_location_name, ensure_record_consistent};
use chrono::{DateTime, Utc};
use domain::{LocationRecord, Registry, Status};
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::broadcast;
use tracing::warn;

const CHANGE_CAPACITY: usize = 256;

/// 邮件室状态内存存储
pub struct InMemoryStatusStore {
    records: RwLock<HashMap<String, LocationRecord>>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl InMemoryStatusStore {
    /// 创建空存储
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            records: RwLock::new(HashMap::new()),
            changes,
        }
    }

    /// 以目录中的全部楼栋（Unknown / 无时间戳）初始化
    pub fn seeded(registry: &Registry) -> Self {
        let store = Self::new();
        if let Ok(mut records) = store.records.write() {
            for name in registry.names() {
                records.insert(name.to_string(), LocationRecord::unreported(name));
            }
        }
        store
    }

    /// 以给定记录初始化（用于测试）
    pub fn with_records(records: impl IntoIterator<Item = LocationRecord>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.records.write() {
            for record in records {
                map.insert(record.name.clone(), record);
            }
        }
        store
    }

    /// 删除记录并推送 Deleted 事件，返回是否存在
    pub fn remove(&self, name: &str) -> Result<bool, StorageError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let removed = records.remove(name);
        if removed.is_some() {
            self.publish(ChangeEvent::Deleted(name.to_string()));
        }
        Ok(removed.is_some())
    }

    /// 读取单条记录（用于测试）
    pub fn get(&self, name: &str) -> Option<LocationRecord> {
        self.records
            .read()
            .ok()
            .and_then(|records| records.get(name).cloned())
    }

    /// 记录数量（用于测试）
    pub fn len(&self) -> usize {
        self.records.read().map(|m| m.len()).unwrap_or(0)
    }

    fn publish(&self, event: ChangeEvent) {
        // 没有订阅者时发送失败，忽略即可
        let _ = self.changes.send(event);
    }
}

impl Default for InMemoryStatusStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl StatusStore for InMemoryStatusStore {
    async fn load_all(&self) -> Result<Vec<LocationRecord>, StorageError> {
        let records = self
            .records
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(records.values().cloned().collect())
    }

    async fn write_status(
        &self,
        name: &str,
        status: Status,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        ensure_location_name(name)?;
        let record = LocationRecord::reported(name, status, at);
        let mut records = self
            .records
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        // 已有更新的记录时不覆盖，也不推送事件
        if let Some(current) = records.get(name)
            && current.last_updated > record.last_updated
        {
            return Ok(());
        }
        let previous = records.insert(name.to_string(), record.clone());
        // 持锁发布，保证同一 location 的事件顺序与提交顺序一致
        self.publish(match previous {
            Some(_) => ChangeEvent::Updated(record),
            None => ChangeEvent::Inserted(record),
        });
        Ok(())
    }

    async fn subscribe_changes(&self) -> Result<ChangeSubscription, StorageError> {
        let mut receiver = self.changes.subscribe();
        let (sender, subscription) = ChangeSubscription::channel();
        let task = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        if sender.send(Ok(event)).await.is_err() {
                            return;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(target: "mailroom.storage", skipped, "in_memory_change_feed_lagged");
                        let _ = sender
                            .send(Err(StorageError::new(format!(
                                "change feed lagged, {skipped} events dropped"
                            ))))
                            .await;
                        return;
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        });
        Ok(subscription.with_task(task))
    }

    async fn insert_if_missing(&self, record: &LocationRecord) -> Result<bool, StorageError> {
        ensure_record_consistent(record)?;
        let mut records = self
            .records
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        if records.contains_key(&record.name) {
            return Ok(false);
        }
        records.insert(record.name.clone(), record.clone());
        self.publish(ChangeEvent::Inserted(record.clone()));
        Ok(true)
    }
}
