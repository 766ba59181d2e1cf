//! 新鲜度判定。
//!
//! 上报状态在 30 分钟后视为 Unknown，避免过期信息被长期信任。
//! 判定是 `(raw_status, last_updated, now)` 的纯函数，随时间只会从上报值
//! 变为 Unknown，不会反向变化。

use crate::data::Status;
use chrono::{DateTime, TimeDelta, Utc};

/// 新鲜度窗口（秒）。
pub const FRESHNESS_WINDOW_SECS: i64 = 30 * 60;

pub fn freshness_window() -> TimeDelta {
    TimeDelta::seconds(FRESHNESS_WINDOW_SECS)
}

/// 是否已过期。
///
/// 恰好 30 分钟即视为过期（`>=`）。`last_updated` 晚于 `now`（时钟偏差）时
/// 经过时长为负，视为新鲜。
pub fn is_stale(last_updated: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last_updated {
        None => true,
        Some(at) => now.signed_duration_since(at) >= freshness_window(),
    }
}

/// 计算有效状态。
pub fn effective_status(
    raw_status: Status,
    last_updated: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Status {
    if is_stale(last_updated, now) {
        Status::Unknown
    } else {
        raw_status
    }
}
