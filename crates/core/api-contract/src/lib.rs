//! 稳定的 DTO 与 API 响应契约。
//!
//! 仅依赖 serde：状态与时间以字符串传输，由服务端负责从领域模型转换。

use serde::{Deserialize, Serialize};

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// 单个邮件室的展示结构。
///
/// `status` 为读取时计算的有效状态；`lastUpdated` 为 RFC 3339 时间，
/// 从未上报时为 `null`。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MailRoomDto {
    pub name: String,
    pub neighborhood: Option<String>,
    pub status: String,
    pub last_updated: Option<String>,
    pub minutes_since_update: Option<i64>,
}

/// 社区分组。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NeighborhoodDto {
    pub name: String,
    pub rooms: Vec<MailRoomDto>,
}

/// 状态计数。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BoardSummaryDto {
    pub open: usize,
    pub closed: usize,
    pub unknown: usize,
}

/// 看板返回结构。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BoardDto {
    pub revision: u64,
    pub loaded: bool,
    pub generated_at: String,
    pub neighborhoods: Vec<NeighborhoodDto>,
    pub unlisted: Vec<MailRoomDto>,
    pub summary: BoardSummaryDto,
}

/// 状态上报请求体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStatusRequest {
    pub status: String,
}

/// 同步指标返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsDto {
    pub reports_submitted: u64,
    pub write_success: u64,
    pub write_failure: u64,
    pub change_events_applied: u64,
    pub change_events_stale: u64,
    pub change_events_deleted: u64,
    pub reloads: u64,
    pub load_failures: u64,
    pub subscription_failures: u64,
    pub decay_transitions: u64,
}

/// 健康检查返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthDto {
    pub status: String,
    pub loaded: bool,
    pub revision: u64,
}
