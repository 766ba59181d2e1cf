//! 追踪、请求 ID 与同步计数指标。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 指标快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
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

/// 进程级计数器。
pub struct TelemetryMetrics {
    reports_submitted: AtomicU64,
    write_success: AtomicU64,
    write_failure: AtomicU64,
    change_events_applied: AtomicU64,
    change_events_stale: AtomicU64,
    change_events_deleted: AtomicU64,
    reloads: AtomicU64,
    load_failures: AtomicU64,
    subscription_failures: AtomicU64,
    decay_transitions: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            reports_submitted: AtomicU64::new(0),
            write_success: AtomicU64::new(0),
            write_failure: AtomicU64::new(0),
            change_events_applied: AtomicU64::new(0),
            change_events_stale: AtomicU64::new(0),
            change_events_deleted: AtomicU64::new(0),
            reloads: AtomicU64::new(0),
            load_failures: AtomicU64::new(0),
            subscription_failures: AtomicU64::new(0),
            decay_transitions: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reports_submitted: self.reports_submitted.load(Ordering::Relaxed),
            write_success: self.write_success.load(Ordering::Relaxed),
            write_failure: self.write_failure.load(Ordering::Relaxed),
            change_events_applied: self.change_events_applied.load(Ordering::Relaxed),
            change_events_stale: self.change_events_stale.load(Ordering::Relaxed),
            change_events_deleted: self.change_events_deleted.load(Ordering::Relaxed),
            reloads: self.reloads.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            subscription_failures: self.subscription_failures.load(Ordering::Relaxed),
            decay_transitions: self.decay_transitions.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录状态上报次数。
pub fn record_report_submitted() {
    metrics().reports_submitted.fetch_add(1, Ordering::Relaxed);
}

/// 记录写入成功次数。
pub fn record_write_success() {
    metrics().write_success.fetch_add(1, Ordering::Relaxed);
}

/// 记录写入失败次数（每次失败都会触发一次全量重载）。
pub fn record_write_failure() {
    metrics().write_failure.fetch_add(1, Ordering::Relaxed);
}

/// 记录已合并的变更事件。
pub fn record_change_applied() {
    metrics()
        .change_events_applied
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录因时间戳更旧而丢弃的变更事件。
pub fn record_change_stale() {
    metrics().change_events_stale.fetch_add(1, Ordering::Relaxed);
}

/// 记录删除事件。
pub fn record_change_deleted() {
    metrics()
        .change_events_deleted
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录全量重载成功次数。
pub fn record_reload() {
    metrics().reloads.fetch_add(1, Ordering::Relaxed);
}

/// 记录全量加载失败次数。
pub fn record_load_failure() {
    metrics().load_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录订阅失效次数。
pub fn record_subscription_failure() {
    metrics()
        .subscription_failures
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录 tick 检测到的衰减（有效状态变为 Unknown）数量。
pub fn record_decay_transitions(count: u64) {
    metrics()
        .decay_transitions
        .fetch_add(count, Ordering::Relaxed);
}
