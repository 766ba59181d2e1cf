//! Redis 邮件室状态存储实现
//!
//! - 每个楼栋一个 key：`mailroom:room:{name}`，值为 RecordPayload JSON
//! - 有序集合 `mailroom:stamps` 保存各楼栋最后写入的时间戳（微秒）
//! - 写入与 PUBLISH 在同一个 Lua 脚本中执行，同一 key 的通知顺序与提交顺序一致
//! - load_all 使用 SCAN 遍历

use crate::error::StorageError;
use crate::models::{ChangeNotification, ChangeOp, RecordPayload};
use crate::subscription::ChangeSubscription;
use crate::traits::StatusStore;
use crate::validation::{ensure_location_name, ensure_record_consistent};
use chrono::{DateTime, Utc};
use domain::{LocationRecord, Status};
use futures_util::StreamExt;
use redis::AsyncCommands;
use tracing::{debug, info, warn};

const KEY_PREFIX: &str = "mailroom:room:";
const STAMPS_KEY: &str = "mailroom:stamps";

/// 变更通知频道
pub const CHANGE_CHANNEL: &str = "mailroom:changes";

/// KEYS: 记录 key, 时间戳集合
/// ARGV: 名称, 时间戳, 记录 JSON, insert 通知, update 通知, 频道
///
/// 已有更晚的时间戳时不写入，返回 0。
const WRITE_SCRIPT: &str = r#"
local current = redis.call('ZSCORE', KEYS[2], ARGV[1])
if current and tonumber(current) > tonumber(ARGV[2]) then
    return 0
end
local existed = redis.call('EXISTS', KEYS[1])
redis.call('SET', KEYS[1], ARGV[3])
redis.call('ZADD', KEYS[2], ARGV[2], ARGV[1])
if existed == 1 then
    redis.call('PUBLISH', ARGV[6], ARGV[5])
else
    redis.call('PUBLISH', ARGV[6], ARGV[4])
end
return 1
"#;

/// KEYS: 记录 key
/// ARGV: 记录 JSON, insert 通知, 频道
const INSERT_SCRIPT: &str = r#"
if redis.call('SET', KEYS[1], ARGV[1], 'NX') then
    redis.call('PUBLISH', ARGV[3], ARGV[2])
    return 1
end
return 0
"#;

fn room_key(name: &str) -> String {
    format!("{}{}", KEY_PREFIX, name)
}

fn notification_payload(op: ChangeOp, record: &LocationRecord) -> Result<String, StorageError> {
    Ok(serde_json::to_string(&ChangeNotification::new(op, record))?)
}

/// Redis 状态存储
pub struct RedisStatusStore {
    client: redis::Client,
    write_script: redis::Script,
    insert_script: redis::Script,
}

impl RedisStatusStore {
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            write_script: redis::Script::new(WRITE_SCRIPT),
            insert_script: redis::Script::new(INSERT_SCRIPT),
        }
    }

    pub fn connect(redis_url: &str) -> Result<Self, StorageError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self::new(client))
    }
}

#[async_trait::async_trait]
impl StatusStore for RedisStatusStore {
    async fn load_all(&self) -> Result<Vec<LocationRecord>, StorageError> {
        let mut connection = self.client.get_multiplexed_tokio_connection().await?;
        let pattern = format!("{}*", KEY_PREFIX);
        let mut cursor: u64 = 0;
        let mut records = Vec::new();
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut connection)
                .await?;
            for key in keys {
                let data: Option<String> = connection.get(&key).await?;
                let Some(data) = data else {
                    continue;
                };
                let payload: RecordPayload = serde_json::from_str(&data)?;
                records.push(payload.into_record()?);
            }
            if next_cursor == 0 {
                break;
            }
            cursor = next_cursor;
        }
        Ok(records)
    }

    async fn write_status(
        &self,
        name: &str,
        status: Status,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        ensure_location_name(name)?;
        let record = LocationRecord::reported(name, status, at);
        let data = serde_json::to_string(&RecordPayload::from(&record))?;
        let inserted = notification_payload(ChangeOp::Insert, &record)?;
        let updated = notification_payload(ChangeOp::Update, &record)?;
        let mut connection = self.client.get_multiplexed_tokio_connection().await?;
        let written: i64 = self
            .write_script
            .key(room_key(name))
            .key(STAMPS_KEY)
            .arg(name)
            .arg(at.timestamp_micros())
            .arg(data)
            .arg(inserted)
            .arg(updated)
            .arg(CHANGE_CHANNEL)
            .invoke_async(&mut connection)
            .await?;
        if written == 0 {
            debug!(target: "mailroom.storage", location = %name, "redis_write_superseded");
        }
        Ok(())
    }

    async fn subscribe_changes(&self) -> Result<ChangeSubscription, StorageError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(CHANGE_CHANNEL).await?;
        info!(target: "mailroom.storage", channel = CHANGE_CHANNEL, "redis_subscribe_started");

        let (sender, subscription) = ChangeSubscription::channel();
        let task = tokio::spawn(async move {
            let mut messages = pubsub.into_on_message();
            while let Some(message) = messages.next().await {
                let payload: String = match message.get_payload() {
                    Ok(payload) => payload,
                    Err(err) => {
                        warn!(target: "mailroom.storage", error = %err, "redis_change_payload_unreadable");
                        continue;
                    }
                };
                let event = match ChangeNotification::parse(&payload)
                    .and_then(ChangeNotification::into_event)
                {
                    Ok(event) => event,
                    Err(err) => {
                        warn!(target: "mailroom.storage", error = %err, "redis_change_payload_invalid");
                        continue;
                    }
                };
                if sender.send(Ok(event)).await.is_err() {
                    return;
                }
            }
            let _ = sender
                .send(Err(StorageError::new("redis change feed closed")))
                .await;
        });
        Ok(subscription.with_task(task))
    }

    async fn insert_if_missing(&self, record: &LocationRecord) -> Result<bool, StorageError> {
        ensure_record_consistent(record)?;
        let data = serde_json::to_string(&RecordPayload::from(record))?;
        let inserted = notification_payload(ChangeOp::Insert, record)?;
        let mut connection = self.client.get_multiplexed_tokio_connection().await?;
        let written: i64 = self
            .insert_script
            .key(room_key(&record.name))
            .arg(data)
            .arg(inserted)
            .arg(CHANGE_CHANNEL)
            .invoke_async(&mut connection)
            .await?;
        Ok(written == 1)
    }
}
