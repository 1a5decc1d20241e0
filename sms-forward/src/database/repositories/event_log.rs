//! SMS and call history repository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::Result;
use crate::database::models::{ConversationDbModel, NewCall, NewSms, SmsLogDbModel};
use crate::database::time::now_ms;

/// Event log repository trait.
#[async_trait]
pub trait EventLogRepository: Send + Sync {
    /// Record an SMS, returning its row id.
    async fn insert_sms(&self, sms: &NewSms) -> Result<i64>;
    /// Record an inbound call, returning its row id.
    async fn insert_call(&self, call: &NewCall) -> Result<i64>;

    /// Latest message per counterparty, newest first. `page` starts at 1.
    async fn list_conversations(&self, page: u32, limit: u32) -> Result<Vec<ConversationDbModel>>;
    /// All messages exchanged with `number`, oldest first.
    async fn conversation(&self, number: &str) -> Result<Vec<SmsLogDbModel>>;
}

/// SQLx implementation of EventLogRepository.
pub struct SqlxEventLogRepository {
    pool: SqlitePool,
}

impl SqlxEventLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventLogRepository for SqlxEventLogRepository {
    async fn insert_sms(&self, sms: &NewSms) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO sms_log (direction, from_number, to_number, body, status, phone_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(sms.direction.as_str())
        .bind(&sms.from_number)
        .bind(&sms.to_number)
        .bind(&sms.body)
        .bind(sms.status.as_str())
        .bind(&sms.phone_id)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn insert_call(&self, call: &NewCall) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO call_log (call_type, phone_number, contact_name, duration_seconds, call_time, phone_id, source, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&call.call_type)
        .bind(&call.phone_number)
        .bind(&call.contact_name)
        .bind(call.duration_seconds)
        .bind(&call.call_time)
        .bind(&call.phone_id)
        .bind(&call.source)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn list_conversations(&self, page: u32, limit: u32) -> Result<Vec<ConversationDbModel>> {
        let offset = i64::from(page.max(1) - 1) * i64::from(limit);
        let conversations = sqlx::query_as::<_, ConversationDbModel>(
            r#"
            WITH ranked AS (
                SELECT
                    CASE WHEN direction = 'incoming' THEN from_number ELSE to_number END AS other_party,
                    body,
                    created_at,
                    ROW_NUMBER() OVER (
                        PARTITION BY CASE WHEN direction = 'incoming' THEN from_number ELSE to_number END
                        ORDER BY created_at DESC, id DESC
                    ) AS rn
                FROM sms_log
            )
            SELECT other_party, body AS last_message, created_at AS last_message_at
            FROM ranked
            WHERE rn = 1
            ORDER BY last_message_at DESC, other_party
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(conversations)
    }

    async fn conversation(&self, number: &str) -> Result<Vec<SmsLogDbModel>> {
        let messages = sqlx::query_as::<_, SmsLogDbModel>(
            r#"
            SELECT * FROM sms_log
            WHERE (direction = 'incoming' AND from_number = ?)
               OR (direction = 'outgoing' AND to_number = ?)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(number)
        .bind(number)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }
}
