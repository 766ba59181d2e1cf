//! 邮件室状态看板 HTTP / WebSocket 服务。
//!
//! 启动顺序：加载配置 -> 初始化日志 -> 打开状态存储 -> 按目录补齐记录
//! -> 启动看板 runner -> 监听 HTTP。

mod handlers;
mod routes;
mod store;
mod utils;

use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Request},
    middleware::{self, Next},
    response::Response,
};
use domain::Registry;
use mailroom_config::AppConfig;
use mailroom_storage::seed_registry;
use mailroom_sync::{BoardClient, RunnerConfig, spawn_board};
use mailroom_telemetry::{init_tracing, new_request_ids};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, info};

#[derive(Clone)]
pub struct AppState {
    pub board: BoardClient,
    pub registry: Arc<Registry>,
}

impl AppState {
    pub fn new(board: BoardClient) -> Self {
        let registry = board.registry().clone();
        Self { board, registry }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    let registry = Arc::new(Registry::campus_default());
    let store = store::open_store(&config).await?;
    if config.seed_registry {
        seed_registry(store.as_ref(), &registry).await?;
    }

    let handle = spawn_board(
        store,
        registry,
        RunnerConfig::from_millis(
            config.tick_interval_ms,
            config.resubscribe_backoff_ms,
            config.resubscribe_max_backoff_ms,
        ),
    );
    let state = AppState::new(handle.client());
    let app = build_app(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(
        target: "mailroom.api",
        addr = %config.http_addr,
        store = ?config.store_backend,
        "http_listening"
    );
    axum::serve(listener, app).await?;
    handle.shutdown().await;
    Ok(())
}

/// 组装路由：同一组接口同时挂在 `/` 与 `/api` 下。
pub fn build_app(state: AppState) -> Router {
    let api = routes::create_api_router();
    Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .with_state(state)
        // 注入 request_id/trace_id
        .layer(middleware::from_fn(request_context))
}

async fn request_context(mut req: Request<Body>, next: Next) -> Response {
    // 生成 request_id 与 trace_id，并注入请求扩展与日志
    let ids = new_request_ids();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(ids.clone());

    let span = tracing::info_span!(
        "request",
        request_id = %ids.request_id,
        trace_id = %ids.trace_id,
        method = %method,
        path = %path
    );

    let mut response = next.run(req).instrument(span).await;
    response.headers_mut().insert(
        "x-request-id",
        HeaderValue::from_str(&ids.request_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response.headers_mut().insert(
        "x-trace-id",
        HeaderValue::from_str(&ids.trace_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::AppState;
    use domain::Registry;
    use mailroom_storage::InMemoryStatusStore;
    use mailroom_sync::{BoardHandle, BoardSnapshot, RunnerConfig, spawn_board};
    use std::sync::Arc;
    use std::time::Duration;

    /// 以目录初始化的内存存储启动 runner，并等待首次加载完成。
    pub async fn seeded_state() -> (AppState, BoardHandle, Arc<InMemoryStatusStore>) {
        let registry = Arc::new(Registry::campus_default());
        let store = Arc::new(InMemoryStatusStore::seeded(&registry));
        let handle = spawn_board(store.clone(), registry, RunnerConfig::default());
        let state = AppState::new(handle.client());
        let mut snapshots = state.board.subscribe_snapshots();
        tokio::time::timeout(
            Duration::from_secs(5),
            snapshots.wait_for(|snapshot: &BoardSnapshot| snapshot.loaded),
        )
        .await
        .expect("load in time")
        .expect("runner alive");
        (state, handle, store)
    }
}
