//! 数据库连接管理
//!
//! - connect_pool：建立 Postgres 连接池
//! - ensure_schema：幂等创建 mail_rooms 表与变更通知触发器
//!
//! 表规模很小（约 20 行），连接数上限 4；获取连接超时 5 秒，
//! 超时策略归存储层所有。

use crate::error::StorageError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

const SCHEMA_SQL: &str = include_str!("../../../../migrations/0001_mail_rooms.sql");

/// 建立 Postgres 连接池
///
/// # 参数
/// - `database_url`：Postgres 连接字符串
pub async fn connect_pool(database_url: &str) -> Result<PgPool, StorageError> {
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// 执行建表脚本（可重复执行）
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StorageError> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    Ok(())
}
