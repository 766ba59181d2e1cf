//! # Mailroom Sync 模块
//!
//! 状态新鲜度与同步核心。
//!
//! - `cache.rs`：本地缓存与合并规则（时间戳保护、删除、乐观写入、衰减检测）
//! - `engine.rs`：[`SyncCore`]，initialize / on_change_event / tick / report_status
//! - `board.rs`：按目录分组的看板投影
//! - `runner.rs`：后台事件循环，对外发布只读快照与通知
//!
//! 有效状态始终在读取时由 `domain::effective_status` 计算，缓存只保存原始记录。

pub mod board;
pub mod cache;
pub mod engine;
pub mod error;
pub mod runner;

pub use board::{Board, BoardSummary, NeighborhoodView};
pub use cache::{ChangeOutcome, StatusCache};
pub use engine::{PendingReport, SyncCore};
pub use error::SyncError;
pub use runner::{
    BoardClient, BoardHandle, BoardSnapshot, RunnerConfig, SyncNotice, spawn_board,
};
