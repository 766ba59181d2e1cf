//! 目录初始化：为缺失的楼栋写入默认记录（Unknown / 无时间戳）。

use crate::error::StorageError;
use crate::traits::StatusStore;
use domain::{LocationRecord, Registry};
use tracing::info;

/// 补齐目录中缺失的记录，已有记录保持不变。返回新插入数量。
pub async fn seed_registry(
    store: &dyn StatusStore,
    registry: &Registry,
) -> Result<usize, StorageError> {
    let mut inserted = 0;
    for name in registry.names() {
        if store
            .insert_if_missing(&LocationRecord::unreported(name))
            .await?
        {
            inserted += 1;
        }
    }
    info!(target: "mailroom.storage", inserted, total = registry.len(), "registry_seeded");
    Ok(inserted)
}
