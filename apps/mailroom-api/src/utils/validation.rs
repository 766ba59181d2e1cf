//! 输入验证辅助函数
//!
//! - normalize_required：验证必填字段，去除空格并检查非空
//! - parse_reported_status：解析上报状态，只接受 open / closed
//!
//! 失败返回 bad_request_error 响应。

use crate::utils::response::bad_request_error;
use axum::response::Response;
use domain::Status;

/// 验证必填字段，去除空格并检查非空
pub fn normalize_required(value: String, field: &str) -> Result<String, Response> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(bad_request_error(format!("{field} required")));
    }
    Ok(trimmed.to_string())
}

/// 解析上报状态
pub fn parse_reported_status(value: String) -> Result<Status, Response> {
    let value = normalize_required(value, "status")?;
    match value.parse::<Status>() {
        Ok(status @ (Status::Open | Status::Closed)) => Ok(status),
        _ => Err(bad_request_error("status must be open or closed")),
    }
}
