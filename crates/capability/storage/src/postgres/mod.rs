//! # PostgreSQL 存储实现模块
//!
//! 生产环境使用的 StatusStore 实现。
//!
//! ## 数据库模式
//!
//! 依赖 `migrations/0001_mail_rooms.sql`：
//! - `mail_rooms`：邮件室状态表（name 主键, status, last_updated timestamptz）
//! - `notify_mail_room_change()`：行级触发器，向 `mail_room_changes` 频道发送 JSON 通知
//!
//! ## 设计原则
//!
//! 1. **参数化查询**：所有 SQL 使用参数绑定
//! 2. **单行原子写入**：状态与时间戳在同一条 upsert 中写入
//! 3. **名称唯一**：`on conflict (name)`，不会产生重复行
//! 4. **变更订阅**：`PgListener` 监听 NOTIFY，后台任务转发到订阅句柄
//!
//! ## 订阅故障
//!
//! 连接断开时通知可能丢失，此时订阅推送一次错误后结束，
//! 由同步核心重新订阅并做一次全量重载。

pub mod mail_room;

pub use mail_room::*;
