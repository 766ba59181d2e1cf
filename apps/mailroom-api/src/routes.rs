//! 路由定义
//!
//! - 健康检查：/health
//! - 看板：/mail-rooms
//! - 单个邮件室：/mail-rooms/{name}
//! - 状态上报：/mail-rooms/{name}/status
//! - 同步指标：/metrics
//! - 实时推送：/ws/board

use super::AppState;
use super::handlers::*;
use axum::{
    Router,
    routing::{get, post},
};

/// 创建 API 路由
///
/// 由 `build_app` 同时挂载到 / 与 /api/ 前缀下
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/mail-rooms", get(get_board))
        .route("/mail-rooms/:name", get(get_mail_room))
        .route("/mail-rooms/:name/status", post(report_status))
        .route("/metrics", get(get_metrics))
        .route("/ws/board", get(ws_board))
}
