//! 变更订阅句柄。

use crate::error::StorageError;
use crate::models::ChangeEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// 订阅通道容量。
pub const SUBSCRIPTION_BUFFER: usize = 64;

/// 订阅推送的单项：事件或订阅故障。
pub type ChangeItem = Result<ChangeEvent, StorageError>;

/// 变更订阅。
///
/// `recv` 返回 `None` 或 `Some(Err(_))` 表示订阅已失效，调用方应重新订阅。
/// 后台转发任务随句柄 drop 一起终止。
pub struct ChangeSubscription {
    receiver: mpsc::Receiver<ChangeItem>,
    task: Option<JoinHandle<()>>,
}

impl ChangeSubscription {
    /// 创建一对发送端 / 订阅句柄（无后台任务）。
    pub fn channel() -> (mpsc::Sender<ChangeItem>, Self) {
        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_BUFFER);
        (
            sender,
            Self {
                receiver,
                task: None,
            },
        )
    }

    /// 绑定负责转发的后台任务。
    pub fn with_task(mut self, task: JoinHandle<()>) -> Self {
        self.task = Some(task);
        self
    }

    pub async fn recv(&mut self) -> Option<ChangeItem> {
        self.receiver.recv().await
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for ChangeSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeSubscription")
            .field("has_task", &self.task.is_some())
            .finish()
    }
}
