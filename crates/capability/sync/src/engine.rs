//! 同步核心。
//!
//! 持有缓存与存储适配器，提供四个操作：`initialize`、`on_change_event`、
//! `tick`、`report_status`。同步的构建块（`apply_snapshot`、`begin_report` 等）
//! 同时供后台 runner 使用，runner 把存储调用放到独立任务里，完成后再回到
//! 事件循环中合并。

use crate::board::Board;
use crate::cache::{ChangeOutcome, StatusCache};
use crate::error::SyncError;
use chrono::{DateTime, Utc};
use domain::{EffectiveView, LocationRecord, Registry, Status};
use mailroom_storage::{ChangeEvent, StatusStore, StorageError};
use mailroom_telemetry::{
    record_change_applied, record_change_deleted, record_change_stale, record_decay_transitions,
    record_load_failure, record_reload, record_report_submitted, record_subscription_failure,
    record_write_failure, record_write_success,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 已乐观写入、等待存储确认的上报。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReport {
    pub optimistic: LocationRecord,
    pub previous: Option<LocationRecord>,
}

impl PendingReport {
    pub fn name(&self) -> &str {
        &self.optimistic.name
    }
}

pub struct SyncCore {
    store: Arc<dyn StatusStore>,
    registry: Arc<Registry>,
    cache: StatusCache,
}

impl SyncCore {
    pub fn new(store: Arc<dyn StatusStore>, registry: Arc<Registry>) -> Self {
        Self {
            store,
            registry,
            cache: StatusCache::new(),
        }
    }

    pub fn store(&self) -> Arc<dyn StatusStore> {
        self.store.clone()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn cache(&self) -> &StatusCache {
        &self.cache
    }

    /// 全量加载并替换缓存。失败时缓存保持不变。
    pub async fn initialize(&mut self) -> Result<usize, SyncError> {
        match self.store.load_all().await {
            Ok(records) => Ok(self.apply_snapshot(records)),
            Err(err) => Err(self.load_failed(&err)),
        }
    }

    pub fn apply_snapshot(&mut self, records: Vec<LocationRecord>) -> usize {
        let count = records.len();
        self.cache.replace_all(records);
        record_reload();
        info!(target: "mailroom.sync", records = count, "snapshot_applied");
        count
    }

    pub fn load_failed(&self, err: &StorageError) -> SyncError {
        record_load_failure();
        warn!(target: "mailroom.sync", error = %err, cached = self.cache.len(), "snapshot_load_failed");
        SyncError::Load(err.to_string())
    }

    /// 变更订阅失效：记录指标，期间仅依靠读取时衰减。
    pub fn subscription_failed(&self, message: &str) -> SyncError {
        record_subscription_failure();
        warn!(target: "mailroom.sync", error = %message, cached = self.cache.len(), "change_feed_lost");
        SyncError::Subscription(message.to_string())
    }

    pub fn on_change_event(&mut self, event: ChangeEvent) -> ChangeOutcome {
        let name = event.name().to_string();
        let outcome = self.cache.apply_change(event);
        match outcome {
            ChangeOutcome::Applied => record_change_applied(),
            ChangeOutcome::Removed => record_change_deleted(),
            ChangeOutcome::IgnoredStale => {
                record_change_stale();
                debug!(target: "mailroom.sync", location = %name, "change_ignored_stale");
            }
            ChangeOutcome::Unchanged => {}
        }
        outcome
    }

    /// 衰减脉冲：返回自上次 tick 以来变为 Unknown 的条目。
    ///
    /// 有效状态始终在读取时计算，tick 不修改缓存中的记录，
    /// 只用于驱动推送式的重绘。
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<EffectiveView> {
        let decayed = self.cache.tick(now);
        if !decayed.is_empty() {
            record_decay_transitions(decayed.len() as u64);
            info!(target: "mailroom.sync", count = decayed.len(), "status_decayed");
        }
        decayed
    }

    /// 校验并立即写入本地缓存。
    pub fn begin_report(
        &mut self,
        name: &str,
        status: Status,
        now: DateTime<Utc>,
    ) -> Result<PendingReport, SyncError> {
        if !self.registry.contains(name) {
            return Err(SyncError::UnknownLocation(name.to_string()));
        }
        if status == Status::Unknown {
            return Err(SyncError::NotReportable(status));
        }
        record_report_submitted();
        let previous = self.cache.apply_optimistic(name, status, now);
        info!(target: "mailroom.sync", location = %name, status = %status, "report_applied_optimistic");
        Ok(PendingReport {
            optimistic: LocationRecord::reported(name, status, now),
            previous,
        })
    }

    pub fn confirm_report(&self, pending: &PendingReport) {
        record_write_success();
        debug!(target: "mailroom.sync", location = %pending.name(), "report_confirmed");
    }

    pub fn report_failed(&self, pending: &PendingReport, err: &StorageError) {
        record_write_failure();
        warn!(
            target: "mailroom.sync",
            location = %pending.name(),
            error = %err,
            "report_write_failed"
        );
    }

    /// 写入失败且重载也失败时撤销乐观记录。
    pub fn rollback_report(&mut self, pending: &PendingReport) -> bool {
        let restored = self
            .cache
            .restore(&pending.optimistic, pending.previous.clone());
        if restored {
            info!(target: "mailroom.sync", location = %pending.name(), "report_rolled_back");
        }
        restored
    }

    /// 上报状态：先乐观更新，再写存储；写入失败时全量重载。
    pub async fn report_status(
        &mut self,
        name: &str,
        status: Status,
        now: DateTime<Utc>,
    ) -> Result<(), SyncError> {
        let pending = self.begin_report(name, status, now)?;
        match self.store.write_status(name, status, now).await {
            Ok(()) => {
                self.confirm_report(&pending);
                Ok(())
            }
            Err(err) => {
                self.report_failed(&pending, &err);
                let resynced = match self.initialize().await {
                    Ok(_) => true,
                    Err(_) => {
                        self.rollback_report(&pending);
                        false
                    }
                };
                Err(SyncError::Write {
                    name: name.to_string(),
                    message: err.to_string(),
                    resynced,
                })
            }
        }
    }

    pub fn view(&self, name: &str, now: DateTime<Utc>) -> EffectiveView {
        self.cache.view(name, now)
    }

    pub fn board(&self, now: DateTime<Utc>) -> Board {
        Board::project(&self.registry, self.cache.records(), now)
    }
}
