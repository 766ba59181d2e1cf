//! 同步指标快照。
//!
//! - GET /metrics

use api_contract::{ApiResponse, MetricsDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mailroom_telemetry::metrics;

pub async fn get_metrics() -> Response {
    let snapshot = metrics().snapshot();
    (
        StatusCode::OK,
        Json(ApiResponse::success(MetricsDto {
            reports_submitted: snapshot.reports_submitted,
            write_success: snapshot.write_success,
            write_failure: snapshot.write_failure,
            change_events_applied: snapshot.change_events_applied,
            change_events_stale: snapshot.change_events_stale,
            change_events_deleted: snapshot.change_events_deleted,
            reloads: snapshot.reloads,
            load_failures: snapshot.load_failures,
            subscription_failures: snapshot.subscription_failures,
            decay_transitions: snapshot.decay_transitions,
        })),
    )
        .into_response()
}
