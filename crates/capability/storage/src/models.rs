//! 数据模型
//!
//! - ChangeEvent：变更订阅推送给同步核心的事件
//! - ChangeNotification：跨进程传输的变更负载（Postgres NOTIFY / Redis PUBLISH 共用）
//! - RecordPayload：单条记录的 JSON 表示（Redis 存储值）

use chrono::{DateTime, Utc};
use domain::{LocationRecord, Status};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::validation::ensure_record_consistent;

/// 存储变更事件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Inserted(LocationRecord),
    Updated(LocationRecord),
    Deleted(String),
}

impl ChangeEvent {
    /// 受影响的 location 名称。
    pub fn name(&self) -> &str {
        match self {
            ChangeEvent::Inserted(record) | ChangeEvent::Updated(record) => &record.name,
            ChangeEvent::Deleted(name) => name,
        }
    }
}

/// 单条记录的 JSON 表示。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPayload {
    pub name: String,
    pub status: Status,
    pub last_updated: Option<DateTime<Utc>>,
}

impl From<&LocationRecord> for RecordPayload {
    fn from(record: &LocationRecord) -> Self {
        Self {
            name: record.name.clone(),
            status: record.raw_status,
            last_updated: record.last_updated,
        }
    }
}

impl RecordPayload {
    pub fn into_record(self) -> Result<LocationRecord, StorageError> {
        let record = LocationRecord {
            name: self.name,
            raw_status: self.status,
            last_updated: self.last_updated,
        };
        ensure_record_consistent(&record)?;
        Ok(record)
    }
}

/// 变更类型（与 Postgres TG_OP 取值一致）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// 变更通知负载。
///
/// delete 携带被删除的旧记录。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeNotification {
    pub op: ChangeOp,
    pub record: RecordPayload,
}

impl ChangeNotification {
    pub fn new(op: ChangeOp, record: &LocationRecord) -> Self {
        Self {
            op,
            record: RecordPayload::from(record),
        }
    }

    /// 解析 JSON 负载。
    pub fn parse(payload: &str) -> Result<Self, StorageError> {
        Ok(serde_json::from_str(payload)?)
    }

    pub fn into_event(self) -> Result<ChangeEvent, StorageError> {
        match self.op {
            ChangeOp::Delete => Ok(ChangeEvent::Deleted(self.record.name)),
            ChangeOp::Insert => Ok(ChangeEvent::Inserted(self.record.into_record()?)),
            ChangeOp::Update => Ok(ChangeEvent::Updated(self.record.into_record()?)),
        }
    }
}
