//! 内存存储实现模块
//!
//! 用于本地演示和测试：`RwLock<HashMap>` 保存记录，
//! `tokio::sync::broadcast` 扇出变更事件。

pub mod mail_room;

pub use mail_room::*;
