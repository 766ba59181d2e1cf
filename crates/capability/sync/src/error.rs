//! 同步核心错误类型。
//!
//! 都不是致命错误：向上报告，由调用方决定重试策略。

use domain::Status;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// 全量加载失败，缓存保持上一次成功的状态
    #[error("load failed: {0}")]
    Load(String),
    /// 乐观写入后存储写入失败；`resynced` 表示随后的全量重载是否成功
    #[error("write failed for {name}: {message}")]
    Write {
        name: String,
        message: String,
        resynced: bool,
    },
    /// 变更订阅断开或建立失败，期间仅依靠读取时衰减
    #[error("subscription failed: {0}")]
    Subscription(String),
    #[error("unknown location: {0}")]
    UnknownLocation(String),
    #[error("status not reportable: {0}")]
    NotReportable(Status),
    /// 后台 runner 已停止
    #[error("board runner stopped")]
    Closed,
}
