//! 健康检查
//!
//! - GET /health

use crate::AppState;
use api_contract::{ApiResponse, HealthDto};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

pub async fn health(State(state): State<AppState>) -> Response {
    let snapshot = state.board.snapshot();
    let status = if snapshot.loaded { "ok" } else { "loading" };
    (
        StatusCode::OK,
        Json(ApiResponse::success(HealthDto {
            status: status.to_string(),
            loaded: snapshot.loaded,
            revision: snapshot.revision,
        })),
    )
        .into_response()
}
