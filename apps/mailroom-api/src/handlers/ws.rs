//! 看板实时推送
//!
//! - GET /ws/board
//!
//! 连接建立后立即推送一次完整看板，此后每个快照版本推送一次。
//! 衰减由 runner 的 tick 触发新版本，因此客户端无需轮询。

use crate::AppState;
use crate::utils::board_to_dto;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use chrono::Utc;
use tracing::{debug, warn};

pub async fn ws_board(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

async fn handle_ws(mut socket: WebSocket, state: AppState) {
    debug!(target: "mailroom.api", "ws_client_connected");
    let mut snapshots = state.board.subscribe_snapshots();

    loop {
        let snapshot = snapshots.borrow_and_update().clone();
        let board = board_to_dto(&snapshot, &state.registry, Utc::now());
        let json = match serde_json::to_string(&board) {
            Ok(json) => json,
            Err(err) => {
                warn!(target: "mailroom.api", error = %err, "ws_board_serialize_failed");
                return;
            }
        };
        if socket.send(Message::Text(json)).await.is_err() {
            debug!(target: "mailroom.api", "ws_client_disconnected");
            return;
        }

        // 等待下一个快照版本，同时处理客户端消息
        loop {
            tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        debug!(target: "mailroom.api", "ws_board_runner_stopped");
                        return;
                    }
                    break;
                }
                msg = socket.recv() => match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(target: "mailroom.api", "ws_client_disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            return;
                        }
                    }
                    Some(Err(err)) => {
                        debug!(target: "mailroom.api", error = %err, "ws_client_error");
                        return;
                    }
                    Some(Ok(_)) => {}
                },
            }
        }
    }
}
