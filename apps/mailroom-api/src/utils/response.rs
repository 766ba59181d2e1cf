//! HTTP 响应辅助函数和 DTO 转换
//!
//! - 错误响应：bad_request_error, not_found_error, sync_error
//! - DTO 转换：view_to_dto, board_to_dto
//!
//! 所有错误返回统一的 ApiResponse 格式，HTTP 状态码与错误码对应。

use api_contract::{ApiResponse, BoardDto, BoardSummaryDto, MailRoomDto, NeighborhoodDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use domain::{EffectiveView, Registry};
use mailroom_sync::{BoardSnapshot, SyncError};

/// 错误请求响应
pub fn bad_request_error(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error("INVALID.REQUEST", message.into())),
    )
        .into_response()
}

/// 资源未找到错误响应
pub fn not_found_error() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error("RESOURCE.NOT_FOUND", "not found")),
    )
        .into_response()
}

/// 同步错误响应
pub fn sync_error(err: SyncError) -> Response {
    let message = err.to_string();
    match err {
        SyncError::UnknownLocation(_) => not_found_error(),
        SyncError::NotReportable(_) => bad_request_error(message),
        SyncError::Write { .. } => (
            StatusCode::BAD_GATEWAY,
            Json(ApiResponse::<()>::error("SYNC.WRITE_FAILED", message)),
        )
            .into_response(),
        SyncError::Load(_) | SyncError::Subscription(_) | SyncError::Closed => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::<()>::error("INTERNAL.ERROR", message)),
        )
            .into_response(),
    }
}

/// EffectiveView 转 MailRoomDto
pub fn view_to_dto(view: EffectiveView, neighborhood: Option<&str>, now: DateTime<Utc>) -> MailRoomDto {
    MailRoomDto {
        name: view.name,
        neighborhood: neighborhood.map(str::to_string),
        status: view.effective_status.as_str().to_string(),
        last_updated: view.last_updated.map(|at| at.to_rfc3339()),
        // 时钟偏差导致的未来时间按 0 分钟显示
        minutes_since_update: view
            .last_updated
            .map(|at| now.signed_duration_since(at).num_minutes().max(0)),
    }
}

/// BoardSnapshot 转 BoardDto
pub fn board_to_dto(snapshot: &BoardSnapshot, registry: &Registry, now: DateTime<Utc>) -> BoardDto {
    let board = snapshot.board(registry, now);
    BoardDto {
        revision: snapshot.revision,
        loaded: snapshot.loaded,
        generated_at: board.generated_at.to_rfc3339(),
        neighborhoods: board
            .neighborhoods
            .into_iter()
            .map(|group| {
                let rooms = group
                    .rooms
                    .into_iter()
                    .map(|view| view_to_dto(view, Some(&group.name), now))
                    .collect();
                NeighborhoodDto {
                    name: group.name,
                    rooms,
                }
            })
            .collect(),
        unlisted: board
            .unlisted
            .into_iter()
            .map(|view| view_to_dto(view, None, now))
            .collect(),
        summary: BoardSummaryDto {
            open: board.summary.open,
            closed: board.summary.closed,
            unknown: board.summary.unknown,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use domain::Status;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 3, 14, 0, 0)
            .single()
            .expect("valid time")
    }

    #[test]
    fn view_reports_minutes_since_update() {
        let view = EffectiveView {
            name: "Shaw Hall".to_string(),
            effective_status: Status::Open,
            last_updated: Some(t0()),
        };
        let dto = view_to_dto(view, Some("East"), t0() + TimeDelta::seconds(12 * 60 + 59));
        assert_eq!(dto.status, "open");
        assert_eq!(dto.minutes_since_update, Some(12));
        assert_eq!(dto.last_updated.as_deref(), Some("2024-09-03T14:00:00+00:00"));
    }

    #[test]
    fn future_timestamp_shows_zero_minutes() {
        let view = EffectiveView {
            name: "Shaw Hall".to_string(),
            effective_status: Status::Closed,
            last_updated: Some(t0() + TimeDelta::minutes(3)),
        };
        let dto = view_to_dto(view, None, t0());
        assert_eq!(dto.minutes_since_update, Some(0));
    }

    #[test]
    fn write_failure_maps_to_bad_gateway() {
        let response = sync_error(SyncError::Write {
            name: "Shaw Hall".to_string(),
            message: "write down".to_string(),
            resynced: true,
        });
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            sync_error(SyncError::UnknownLocation("x".to_string())).status(),
            StatusCode::NOT_FOUND
        );
    }
}
