//! 存储接口 Trait 定义
//!
//! StatusStore：同步核心消费的三类操作
//! - load_all：全量快照读取
//! - write_status：单条 upsert（状态与时间戳原子写入）
//! - subscribe_changes：订阅变更推送
//!
//! 设计原则：
//! - 所有接口返回 StorageError
//! - 超时策略由具体实现负责，同步核心不设置超时
//! - 使用 async_trait 支持动态分发

use crate::error::StorageError;
use crate::subscription::ChangeSubscription;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{LocationRecord, Status};

/// 邮件室状态存储接口
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// 读取全部记录（规模很小，不分页）
    async fn load_all(&self) -> Result<Vec<LocationRecord>, StorageError>;

    /// 按名称写入状态与时间戳
    ///
    /// 名称唯一，不会产生重复行。存储中已有时间戳严格更晚的记录时不覆盖，
    /// 也不产生变更事件，因此并发写入的最终结果只取决于时间戳。
    async fn write_status(
        &self,
        name: &str,
        status: Status,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// 订阅变更
    ///
    /// 同一 location 的事件按提交顺序送达；不同 location 之间不保证顺序；
    /// 可能重复送达。丢弃返回的订阅即释放底层资源。
    async fn subscribe_changes(&self) -> Result<ChangeSubscription, StorageError>;

    /// 记录不存在时插入（用于目录初始化），返回是否插入
    async fn insert_if_missing(&self, record: &LocationRecord) -> Result<bool, StorageError>;
}
