//! # Mailroom Storage 模块
//!
//! 邮件室状态的存储适配层：同步核心只依赖 [`StatusStore`] 接口，
//! 具体后端可替换。
//!
//! ## 架构设计
//!
//! 1. **接口抽象层** (`traits.rs`)：load_all / write_status / subscribe_changes
//! 2. **数据模型层** (`models.rs`)：变更事件与跨进程通知负载
//! 3. **订阅句柄** (`subscription.rs`)：mpsc 接收端 + 后台转发任务，drop 即释放
//! 4. **错误处理层** (`error.rs`)：统一的存储错误类型
//! 5. **验证辅助层** (`validation.rs`)：名称与记录一致性校验
//! 6. **连接管理层** (`connection.rs`)：Postgres 连接池与建表脚本
//! 7. **实现层**：
//!    - `in_memory/`：内存实现（测试与本地演示）
//!    - `postgres/`：PostgreSQL 实现（LISTEN/NOTIFY 变更订阅）
//!    - `redis.rs`：Redis 实现（Pub/Sub 变更订阅）
//!
//! ## 变更订阅语义
//!
//! - 同一 location 的事件按提交顺序送达，不同 location 之间不保证顺序
//! - 至少一次送达，可能重复
//! - 订阅失效时推送一次 `Err` 后结束，由调用方重新订阅
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use mailroom_storage::{InMemoryStatusStore, StatusStore, seed_registry};
//! use domain::{Registry, Status};
//!
//! let registry = Registry::campus_default();
//! let store = InMemoryStatusStore::new();
//! seed_registry(&store, &registry).await?;
//!
//! let mut changes = store.subscribe_changes().await?;
//! store.write_status("Shaw Hall", Status::Open, chrono::Utc::now()).await?;
//! let event = changes.recv().await;
//! ```

pub mod connection;
pub mod error;
pub mod in_memory;
pub mod models;
pub mod postgres;
pub mod redis;
pub mod seed;
pub mod subscription;
pub mod traits;
pub mod validation;

pub use connection::*;
pub use error::*;
pub use models::*;
pub use self::redis::RedisStatusStore;
pub use seed::seed_registry;
pub use subscription::*;
pub use traits::*;
pub use validation::*;

pub use in_memory::InMemoryStatusStore;
pub use postgres::PgStatusStore;
