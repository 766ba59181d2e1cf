//! Postgres 邮件室状态存储实现

use crate::error::StorageError;
use crate::models::ChangeNotification;
use crate::subscription::ChangeSubscription;
use crate::traits::StatusStore;
use crate::validation::{ensure_location_name, ensure_record_consistent};
use chrono::{DateTime, Utc};
use domain::{LocationRecord, Status};
use sqlx::postgres::PgListener;
use sqlx::{PgPool, Row};
use tracing::{info, warn};

/// NOTIFY 频道名（与触发器保持一致）
pub const CHANGE_CHANNEL: &str = "mail_room_changes";

pub struct PgStatusStore {
    pub pool: PgPool,
}

impl PgStatusStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 通过数据库 URL 建立连接池
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = crate::connection::connect_pool(database_url).await?;
        Ok(Self { pool })
    }
}

fn row_to_record(row: &sqlx::postgres::PgRow) -> Result<LocationRecord, StorageError> {
    let status: String = row.try_get("status")?;
    let record = LocationRecord {
        name: row.try_get("name")?,
        raw_status: status
            .parse::<Status>()
            .map_err(|err| StorageError::new(err.to_string()))?,
        last_updated: row.try_get("last_updated")?,
    };
    ensure_record_consistent(&record)?;
    Ok(record)
}

#[async_trait::async_trait]
impl StatusStore for PgStatusStore {
    async fn load_all(&self) -> Result<Vec<LocationRecord>, StorageError> {
        let rows = sqlx::query("select name, status, last_updated from mail_rooms")
            .fetch_all(&self.pool)
            .await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(row_to_record(&row)?);
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
        sqlx::query(
            "insert into mail_rooms (name, status, last_updated) values ($1, $2, $3) \
             on conflict (name) do update \
             set status = excluded.status, last_updated = excluded.last_updated \
             where mail_rooms.last_updated is null \
                or mail_rooms.last_updated <= excluded.last_updated",
        )
        .bind(name)
        .bind(status.as_str())
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn subscribe_changes(&self) -> Result<ChangeSubscription, StorageError> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;
        info!(target: "mailroom.storage", channel = CHANGE_CHANNEL, "pg_listen_started");

        let (sender, subscription) = ChangeSubscription::channel();
        let task = tokio::spawn(async move {
            loop {
                let notification = match listener.try_recv().await {
                    Ok(Some(notification)) => notification,
                    Ok(None) => {
                        // 连接断开后重连期间的通知已丢失
                        let _ = sender
                            .send(Err(StorageError::new("pg change feed connection lost")))
                            .await;
                        return;
                    }
                    Err(err) => {
                        let _ = sender.send(Err(StorageError::from(err))).await;
                        return;
                    }
                };
                let event = match ChangeNotification::parse(notification.payload())
                    .and_then(ChangeNotification::into_event)
                {
                    Ok(event) => event,
                    Err(err) => {
                        warn!(target: "mailroom.storage", error = %err, "pg_change_payload_invalid");
                        continue;
                    }
                };
                if sender.send(Ok(event)).await.is_err() {
                    return;
                }
            }
        });
        Ok(subscription.with_task(task))
    }

    async fn insert_if_missing(&self, record: &LocationRecord) -> Result<bool, StorageError> {
        ensure_record_consistent(record)?;
        let result = sqlx::query(
            "insert into mail_rooms (name, status, last_updated) values ($1, $2, $3) \
             on conflict (name) do nothing",
        )
        .bind(&record.name)
        .bind(record.raw_status.as_str())
        .bind(record.last_updated)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
