//! 按配置打开状态存储。

use domain::Registry;
use mailroom_config::{AppConfig, StoreBackend};
use mailroom_storage::{
    InMemoryStatusStore, PgStatusStore, RedisStatusStore, StatusStore, StorageError, connect_pool,
    ensure_schema,
};
use std::sync::Arc;
use tracing::info;

pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn StatusStore>, StorageError> {
    match config.store_backend {
        StoreBackend::Memory => {
            info!(target: "mailroom.storage", "store_in_memory");
            Ok(Arc::new(InMemoryStatusStore::seeded(&Registry::campus_default())))
        }
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| StorageError::new("MAILROOM_DATABASE_URL required"))?;
            let pool = connect_pool(database_url).await?;
            // 建表与触发器均可重复执行
            ensure_schema(&pool).await?;
            info!(target: "mailroom.storage", "store_postgres_ready");
            Ok(Arc::new(PgStatusStore::new(pool)))
        }
        StoreBackend::Redis => {
            let store = RedisStatusStore::connect(&config.redis_url)?;
            info!(target: "mailroom.storage", url = %config.redis_url, "store_redis_ready");
            Ok(Arc::new(store))
        }
    }
}
