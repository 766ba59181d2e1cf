//! 验证辅助函数
//!
//! 写入前与读出后统一校验记录，保证：
//! - 名称非空、无首尾空格
//! - 未上报（无时间戳）的记录状态必为 Unknown

use crate::error::StorageError;
use domain::{LocationRecord, Status};

/// 验证 location 名称
pub fn ensure_location_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty() {
        return Err(StorageError::new("location name required"));
    }
    if name.trim() != name {
        return Err(StorageError::new("location name has surrounding whitespace"));
    }
    Ok(())
}

/// 验证记录一致性
pub fn ensure_record_consistent(record: &LocationRecord) -> Result<(), StorageError> {
    ensure_location_name(&record.name)?;
    if record.last_updated.is_none() && record.raw_status != Status::Unknown {
        return Err(StorageError::new(format!(
            "record {} has status {} without last_updated",
            record.name, record.raw_status
        )));
    }
    Ok(())
}
