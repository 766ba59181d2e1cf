//! 邮件室状态看板的领域模型。
//!
//! - [`data`]：状态枚举、持久化记录与派生视图
//! - [`freshness`]：新鲜度判定（30 分钟窗口）
//! - [`registry`]：楼栋目录（社区 → 楼栋）

pub mod data;
pub mod freshness;
pub mod registry;

pub use data::{EffectiveView, LocationRecord, ParseStatusError, Status};
pub use freshness::{FRESHNESS_WINDOW_SECS, effective_status, freshness_window, is_stale};
pub use registry::{Neighborhood, Registry};
