//! 本地状态缓存与合并规则。
//!
//! 三类输入（全量快照、变更事件、乐观写入）都在这里合并。唯一的竞争处理
//! 手段是时间戳比较：传入记录的 `last_updated` 严格早于缓存中的值时丢弃。
//! `None` 视为早于任何时间戳。

use chrono::{DateTime, Utc};
use domain::{EffectiveView, LocationRecord, Status, effective_status};
use mailroom_storage::ChangeEvent;
use std::collections::BTreeMap;

/// 变更事件的合并结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// 缓存已更新
    Applied,
    /// 与缓存完全相同（重复送达），无变化
    Unchanged,
    /// 传入记录更旧，已丢弃
    IgnoredStale,
    /// 条目已删除
    Removed,
}

impl ChangeOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, ChangeOutcome::Applied | ChangeOutcome::Removed)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatusCache {
    records: BTreeMap<String, LocationRecord>,
    last_tick: Option<DateTime<Utc>>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用权威快照整体替换缓存。
    pub fn replace_all(&mut self, records: Vec<LocationRecord>) {
        self.records = records
            .into_iter()
            .map(|record| (record.name.clone(), record))
            .collect();
    }

    pub fn apply_change(&mut self, event: ChangeEvent) -> ChangeOutcome {
        match event {
            ChangeEvent::Inserted(record) | ChangeEvent::Updated(record) => self.merge(record),
            ChangeEvent::Deleted(name) => match self.records.remove(&name) {
                Some(_) => ChangeOutcome::Removed,
                None => ChangeOutcome::Unchanged,
            },
        }
    }

    fn merge(&mut self, incoming: LocationRecord) -> ChangeOutcome {
        if let Some(current) = self.records.get(&incoming.name) {
            if incoming.last_updated < current.last_updated {
                return ChangeOutcome::IgnoredStale;
            }
            if *current == incoming {
                return ChangeOutcome::Unchanged;
            }
        }
        self.records.insert(incoming.name.clone(), incoming);
        ChangeOutcome::Applied
    }

    /// 乐观写入，返回被覆盖的旧记录。
    pub fn apply_optimistic(
        &mut self,
        name: &str,
        status: Status,
        now: DateTime<Utc>,
    ) -> Option<LocationRecord> {
        self.records.insert(
            name.to_string(),
            LocationRecord::reported(name, status, now),
        )
    }

    /// 撤销乐观写入。
    ///
    /// 仅当缓存中仍是该乐观记录时才恢复旧值；期间已被更新的变更事件覆盖则
    /// 保持不动。返回是否发生了恢复。
    pub fn restore(
        &mut self,
        optimistic: &LocationRecord,
        previous: Option<LocationRecord>,
    ) -> bool {
        if self.records.get(&optimistic.name) != Some(optimistic) {
            return false;
        }
        match previous {
            Some(record) => {
                self.records.insert(record.name.clone(), record);
            }
            None => {
                self.records.remove(&optimistic.name);
            }
        }
        true
    }

    /// 衰减检查。
    ///
    /// 返回自上次 tick 以来有效状态变为 Unknown 的条目。首次 tick 只记录时间；
    /// `now` 早于上次 tick 时不回退。
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<EffectiveView> {
        let Some(previous) = self.last_tick else {
            self.last_tick = Some(now);
            return Vec::new();
        };
        if now <= previous {
            return Vec::new();
        }
        self.last_tick = Some(now);
        self.records
            .values()
            .filter(|record| {
                effective_status(record.raw_status, record.last_updated, previous)
                    != Status::Unknown
                    && effective_status(record.raw_status, record.last_updated, now)
                        == Status::Unknown
            })
            .map(|record| record.view_at(now))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&LocationRecord> {
        self.records.get(name)
    }

    /// 读取时计算的视图；缓存中没有的名称回落到默认记录。
    pub fn view(&self, name: &str, now: DateTime<Utc>) -> EffectiveView {
        match self.records.get(name) {
            Some(record) => record.view_at(now),
            None => LocationRecord::unreported(name).view_at(now),
        }
    }

    pub fn records(&self) -> &BTreeMap<String, LocationRecord> {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
