//! 后台 runner：单一所有者的事件循环。
//!
//! runner 独占 [`SyncCore`]，在一个 `select!` 中依次处理：
//! - 客户端命令（上报状态、手动重载）
//! - 存储调用的完成事件（load_all / write_status / subscribe_changes 在独立任务中执行）
//! - 变更订阅推送
//! - 衰减 tick
//! - 重订阅 / 重载的退避计时
//!
//! 每个事件处理到底后才处理下一个。对外只发布只读快照（`watch`）与通知
//! （`broadcast`）。丢弃 [`BoardHandle`] 会终止任务并释放订阅。

use crate::board::Board;
use crate::engine::{PendingReport, SyncCore};
use crate::error::SyncError;
use chrono::{DateTime, Utc};
use domain::{EffectiveView, LocationRecord, Registry, Status};
use mailroom_storage::{ChangeItem, ChangeSubscription, StatusStore, StorageError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, sleep_until};
use tracing::{debug, info};

const COMMAND_BUFFER: usize = 64;
const NOTICE_CAPACITY: usize = 64;
/// 退避间隔上限（10 分钟）。
const BACKOFF_LIMIT: Duration = Duration::from_secs(600);

/// runner 参数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    pub tick_interval: Duration,
    pub resubscribe_backoff: Duration,
    pub resubscribe_max_backoff: Duration,
}

impl RunnerConfig {
    pub fn from_millis(tick_interval_ms: u64, backoff_ms: u64, max_backoff_ms: u64) -> Self {
        let backoff = Duration::from_millis(backoff_ms).min(BACKOFF_LIMIT);
        Self {
            tick_interval: Duration::from_millis(tick_interval_ms),
            resubscribe_backoff: backoff,
            resubscribe_max_backoff: Duration::from_millis(max_backoff_ms)
                .clamp(backoff, BACKOFF_LIMIT),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::from_millis(1_000, 1_000, 30_000)
    }
}

/// 发布给读取方的只读快照。
///
/// `revision` 每次发布递增；`loaded` 表示是否已有一次成功的全量加载。
#[derive(Debug, Clone, Default)]
pub struct BoardSnapshot {
    pub revision: u64,
    pub loaded: bool,
    pub records: BTreeMap<String, LocationRecord>,
}

impl BoardSnapshot {
    /// 单个楼栋的视图；既不在缓存也不在目录中时返回 `None`。
    pub fn view(&self, registry: &Registry, name: &str, now: DateTime<Utc>) -> Option<EffectiveView> {
        match self.records.get(name) {
            Some(record) => Some(record.view_at(now)),
            None if registry.contains(name) => Some(LocationRecord::unreported(name).view_at(now)),
            None => None,
        }
    }

    pub fn board(&self, registry: &Registry, now: DateTime<Utc>) -> Board {
        Board::project(registry, &self.records, now)
    }
}

/// runner 通知。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncNotice {
    Loaded { count: usize },
    LoadFailed { message: String },
    WriteFailed { name: String, message: String },
    SubscriptionLost { message: String },
    Resubscribed,
    Decayed { names: Vec<String> },
}

enum Command {
    Report {
        name: String,
        status: Status,
        now: DateTime<Utc>,
        reply: oneshot::Sender<Result<(), SyncError>>,
    },
    Reload {
        reply: oneshot::Sender<Result<usize, SyncError>>,
    },
}

enum LoadPurpose {
    Initial,
    Recover,
    Requested(oneshot::Sender<Result<usize, SyncError>>),
    Resync {
        pending: PendingReport,
        message: String,
        reply: oneshot::Sender<Result<(), SyncError>>,
    },
}

enum Completion {
    Loaded {
        seq: u64,
        purpose: LoadPurpose,
        result: Result<Vec<LocationRecord>, StorageError>,
    },
    Written {
        pending: PendingReport,
        reply: oneshot::Sender<Result<(), SyncError>>,
        result: Result<(), StorageError>,
    },
    Subscribed(Result<ChangeSubscription, StorageError>),
}

/// 指数退避。
#[derive(Debug, Clone, Copy)]
struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// 看板客户端，可克隆后分发给多个读取方。
#[derive(Clone)]
pub struct BoardClient {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<BoardSnapshot>,
    notices: broadcast::Sender<SyncNotice>,
    registry: Arc<Registry>,
}

impl BoardClient {
    /// 以当前时间上报状态。
    pub async fn report_status(&self, name: &str, status: Status) -> Result<(), SyncError> {
        self.report_status_at(name, status, Utc::now()).await
    }

    pub async fn report_status_at(
        &self,
        name: &str,
        status: Status,
        now: DateTime<Utc>,
    ) -> Result<(), SyncError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Report {
                name: name.to_string(),
                status,
                now,
                reply,
            })
            .await
            .map_err(|_| SyncError::Closed)?;
        response.await.map_err(|_| SyncError::Closed)?
    }

    /// 手动触发全量重载，返回加载的记录数。
    pub async fn reload(&self) -> Result<usize, SyncError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Reload { reply })
            .await
            .map_err(|_| SyncError::Closed)?;
        response.await.map_err(|_| SyncError::Closed)?
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe_snapshots(&self) -> watch::Receiver<BoardSnapshot> {
        self.snapshots.clone()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<SyncNotice> {
        self.notices.subscribe()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn board(&self, now: DateTime<Utc>) -> Board {
        self.snapshots.borrow().board(&self.registry, now)
    }

    pub fn view(&self, name: &str, now: DateTime<Utc>) -> Option<EffectiveView> {
        self.snapshots.borrow().view(&self.registry, name, now)
    }
}

/// runner 句柄，drop 时终止后台任务。
pub struct BoardHandle {
    client: BoardClient,
    task: Option<JoinHandle<()>>,
}

impl BoardHandle {
    pub fn client(&self) -> BoardClient {
        self.client.clone()
    }

    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for BoardHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// 启动看板 runner。
///
/// 先订阅变更，订阅结果返回后再进行首次全量加载，避免两者之间的事件丢失。
pub fn spawn_board(
    store: Arc<dyn StatusStore>,
    registry: Arc<Registry>,
    config: RunnerConfig,
) -> BoardHandle {
    let (commands, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let (snapshot_tx, snapshots) = watch::channel(BoardSnapshot::default());
    let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
    let runner = Runner::new(
        SyncCore::new(store, registry.clone()),
        config,
        snapshot_tx,
        notices.clone(),
    );
    let task = tokio::spawn(runner.run(command_rx));
    BoardHandle {
        client: BoardClient {
            commands,
            snapshots,
            notices,
            registry,
        },
        task: Some(task),
    }
}

struct Runner {
    core: SyncCore,
    config: RunnerConfig,
    snapshots: watch::Sender<BoardSnapshot>,
    notices: broadcast::Sender<SyncNotice>,
    completions: mpsc::UnboundedSender<Completion>,
    completion_rx: Option<mpsc::UnboundedReceiver<Completion>>,
    subscription: Option<ChangeSubscription>,
    subscribing: bool,
    resubscribe_at: Option<Instant>,
    subscribe_backoff: Backoff,
    reload_at: Option<Instant>,
    load_backoff: Backoff,
    initial_load_started: bool,
    loaded: bool,
    revision: u64,
    load_seq: u64,
    applied_seq: u64,
}

impl Runner {
    fn new(
        core: SyncCore,
        config: RunnerConfig,
        snapshots: watch::Sender<BoardSnapshot>,
        notices: broadcast::Sender<SyncNotice>,
    ) -> Self {
        let (completions, completion_rx) = mpsc::unbounded_channel();
        Self {
            core,
            config,
            snapshots,
            notices,
            completions,
            completion_rx: Some(completion_rx),
            subscription: None,
            subscribing: false,
            resubscribe_at: None,
            subscribe_backoff: Backoff::new(
                config.resubscribe_backoff,
                config.resubscribe_max_backoff,
            ),
            reload_at: None,
            load_backoff: Backoff::new(config.resubscribe_backoff, config.resubscribe_max_backoff),
            initial_load_started: false,
            loaded: false,
            revision: 0,
            load_seq: 0,
            applied_seq: 0,
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let Some(mut completions) = self.completion_rx.take() else {
            return;
        };
        let mut ticker = tokio::time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(target: "mailroom.sync", "board_runner_started");
        self.start_subscribe();

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(completion) = completions.recv() => self.handle_completion(completion),
                item = next_change(&mut self.subscription) => self.handle_change(item),
                _ = ticker.tick() => self.handle_tick(Utc::now()),
                _ = wait_until(self.resubscribe_at) => {
                    self.resubscribe_at = None;
                    self.start_subscribe();
                }
                _ = wait_until(self.reload_at) => {
                    self.reload_at = None;
                    self.start_load(LoadPurpose::Recover);
                }
            }
        }
        info!(target: "mailroom.sync", "board_runner_stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Report {
                name,
                status,
                now,
                reply,
            } => match self.core.begin_report(&name, status, now) {
                Ok(pending) => {
                    self.publish();
                    let store = self.core.store();
                    let completions = self.completions.clone();
                    tokio::spawn(async move {
                        let result = store.write_status(&name, status, now).await;
                        let _ = completions.send(Completion::Written {
                            pending,
                            reply,
                            result,
                        });
                    });
                }
                Err(err) => {
                    let _ = reply.send(Err(err));
                }
            },
            Command::Reload { reply } => self.start_load(LoadPurpose::Requested(reply)),
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Loaded {
                seq,
                purpose,
                result,
            } => self.handle_loaded(seq, purpose, result),
            Completion::Written {
                pending,
                reply,
                result,
            } => match result {
                Ok(()) => {
                    self.core.confirm_report(&pending);
                    let _ = reply.send(Ok(()));
                }
                Err(err) => {
                    self.core.report_failed(&pending, &err);
                    let message = err.to_string();
                    self.notify(SyncNotice::WriteFailed {
                        name: pending.name().to_string(),
                        message: message.clone(),
                    });
                    self.start_load(LoadPurpose::Resync {
                        pending,
                        message,
                        reply,
                    });
                }
            },
            Completion::Subscribed(result) => self.handle_subscribed(result),
        }
    }

    fn handle_loaded(
        &mut self,
        seq: u64,
        purpose: LoadPurpose,
        result: Result<Vec<LocationRecord>, StorageError>,
    ) {
        match result {
            Ok(records) => {
                let count = records.len();
                if seq > self.applied_seq {
                    self.applied_seq = seq;
                    self.core.apply_snapshot(records);
                    self.loaded = true;
                    self.reload_at = None;
                    self.load_backoff.reset();
                    self.publish();
                    self.notify(SyncNotice::Loaded { count });
                } else {
                    debug!(target: "mailroom.sync", seq, applied = self.applied_seq, "stale_snapshot_skipped");
                }
                match purpose {
                    LoadPurpose::Initial | LoadPurpose::Recover => {}
                    LoadPurpose::Requested(reply) => {
                        let _ = reply.send(Ok(count));
                    }
                    LoadPurpose::Resync {
                        pending,
                        message,
                        reply,
                    } => {
                        let _ = reply.send(Err(SyncError::Write {
                            name: pending.name().to_string(),
                            message,
                            resynced: true,
                        }));
                    }
                }
            }
            Err(err) => {
                let error = self.core.load_failed(&err);
                self.notify(SyncNotice::LoadFailed {
                    message: err.to_string(),
                });
                match purpose {
                    LoadPurpose::Initial | LoadPurpose::Recover => {
                        if !self.loaded {
                            self.schedule_reload();
                        }
                    }
                    LoadPurpose::Requested(reply) => {
                        let _ = reply.send(Err(error));
                    }
                    LoadPurpose::Resync {
                        pending,
                        message,
                        reply,
                    } => {
                        if self.core.rollback_report(&pending) {
                            self.publish();
                        }
                        let _ = reply.send(Err(SyncError::Write {
                            name: pending.name().to_string(),
                            message,
                            resynced: false,
                        }));
                    }
                }
            }
        }
    }

    fn handle_subscribed(&mut self, result: Result<ChangeSubscription, StorageError>) {
        self.subscribing = false;
        match result {
            Ok(subscription) => {
                self.subscription = Some(subscription);
                self.subscribe_backoff.reset();
                if self.initial_load_started {
                    info!(target: "mailroom.sync", "change_feed_resubscribed");
                    self.notify(SyncNotice::Resubscribed);
                    self.start_load(LoadPurpose::Recover);
                } else {
                    info!(target: "mailroom.sync", "change_feed_subscribed");
                    self.start_initial_load();
                }
            }
            Err(err) => {
                self.subscription_lost(err.to_string());
                if !self.initial_load_started {
                    self.start_initial_load();
                }
            }
        }
    }

    fn handle_change(&mut self, item: Option<ChangeItem>) {
        match item {
            Some(Ok(event)) => {
                if self.core.on_change_event(event).changed() {
                    self.publish();
                }
            }
            Some(Err(err)) => {
                self.subscription = None;
                self.subscription_lost(err.to_string());
            }
            None => {
                self.subscription = None;
                self.subscription_lost("change feed closed".to_string());
            }
        }
    }

    fn handle_tick(&mut self, now: DateTime<Utc>) {
        let decayed = self.core.tick(now);
        if decayed.is_empty() {
            return;
        }
        self.publish();
        self.notify(SyncNotice::Decayed {
            names: decayed.into_iter().map(|view| view.name).collect(),
        });
    }

    fn subscription_lost(&mut self, message: String) {
        let error = self.core.subscription_failed(&message);
        let delay = self.subscribe_backoff.next_delay();
        info!(
            target: "mailroom.sync",
            error = %error,
            retry_ms = delay.as_millis() as u64,
            "change_feed_resubscribe_scheduled"
        );
        self.resubscribe_at = Some(Instant::now() + delay);
        self.notify(SyncNotice::SubscriptionLost { message });
    }

    fn schedule_reload(&mut self) {
        let delay = self.load_backoff.next_delay();
        debug!(target: "mailroom.sync", retry_ms = delay.as_millis() as u64, "reload_scheduled");
        self.reload_at = Some(Instant::now() + delay);
    }

    fn start_subscribe(&mut self) {
        if self.subscribing {
            return;
        }
        self.subscribing = true;
        let store = self.core.store();
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let result = store.subscribe_changes().await;
            let _ = completions.send(Completion::Subscribed(result));
        });
    }

    fn start_initial_load(&mut self) {
        self.initial_load_started = true;
        self.start_load(LoadPurpose::Initial);
    }

    fn start_load(&mut self, purpose: LoadPurpose) {
        self.load_seq += 1;
        let seq = self.load_seq;
        let store = self.core.store();
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let result = store.load_all().await;
            let _ = completions.send(Completion::Loaded {
                seq,
                purpose,
                result,
            });
        });
    }

    fn publish(&mut self) {
        self.revision += 1;
        self.snapshots.send_replace(BoardSnapshot {
            revision: self.revision,
            loaded: self.loaded,
            records: self.core.cache().records().clone(),
        });
    }

    fn notify(&self, notice: SyncNotice) {
        let _ = self.notices.send(notice);
    }
}

async fn next_change(subscription: &mut Option<ChangeSubscription>) -> Option<ChangeItem> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
