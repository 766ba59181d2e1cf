//! 邮件室看板 handlers
//!
//! - GET /mail-rooms
//! - GET /mail-rooms/{name}
//! - POST /mail-rooms/{name}/status

use crate::AppState;
use crate::utils::{
    board_to_dto, not_found_error, parse_reported_status, sync_error, view_to_dto,
};
use api_contract::{ApiResponse, ReportStatusRequest};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::info;

pub async fn get_board(State(state): State<AppState>) -> Response {
    let snapshot = state.board.snapshot();
    let board = board_to_dto(&snapshot, &state.registry, Utc::now());
    (StatusCode::OK, Json(ApiResponse::success(board))).into_response()
}

pub async fn get_mail_room(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let now = Utc::now();
    match state.board.view(&name, now) {
        Some(view) => {
            let neighborhood = state.registry.neighborhood_of(&name);
            let dto = view_to_dto(view, neighborhood, now);
            (StatusCode::OK, Json(ApiResponse::success(dto))).into_response()
        }
        None => not_found_error(),
    }
}

pub async fn report_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<ReportStatusRequest>,
) -> Response {
    if !state.registry.contains(&name) {
        return not_found_error();
    }
    let status = match parse_reported_status(req.status) {
        Ok(status) => status,
        Err(response) => return response,
    };
    if let Err(err) = state.board.report_status(&name, status).await {
        return sync_error(err);
    }
    info!(target: "mailroom.api", location = %name, status = %status, "status_reported");

    let now = Utc::now();
    match state.board.view(&name, now) {
        Some(view) => {
            let dto = view_to_dto(view, state.registry.neighborhood_of(&name), now);
            (StatusCode::OK, Json(ApiResponse::success(dto))).into_response()
        }
        None => not_found_error(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::seeded_state;

    #[tokio::test]
    async fn unknown_room_is_not_found() {
        let (state, _handle, _store) = seeded_state().await;
        let response = get_mail_room(State(state), Path("Nowhere Hall".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn report_outside_registry_is_not_found() {
        let (state, _handle, store) = seeded_state().await;
        let response = report_status(
            State(state),
            Path("Nowhere Hall".to_string()),
            Json(ReportStatusRequest {
                status: "open".to_string(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(store.get("Nowhere Hall").is_none());
    }

    #[tokio::test]
    async fn report_with_invalid_status_is_rejected() {
        let (state, _handle, store) = seeded_state().await;
        for status in ["unknown", "half-open"] {
            let response = report_status(
                State(state.clone()),
                Path("Day Hall".to_string()),
                Json(ReportStatusRequest {
                    status: status.to_string(),
                }),
            )
            .await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
        assert_eq!(
            store.get("Day Hall").and_then(|record| record.last_updated),
            None
        );
    }

    #[tokio::test]
    async fn never_reported_room_reads_unknown() {
        let (state, _handle, _store) = seeded_state().await;
        let response = get_mail_room(State(state), Path("Flint Hall".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
