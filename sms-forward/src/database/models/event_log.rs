//! SMS and call log database models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::notification::CallEvent;

/// One SMS, incoming or outgoing.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SmsLogDbModel {
    pub id: i64,
    /// 'incoming' or 'outgoing'
    pub direction: String,
    pub from_number: String,
    pub to_number: String,
    pub body: String,
    /// 'received', 'sent' or 'failed'
    pub status: String,
    pub phone_id: Option<String>,
    /// Unix epoch milliseconds
    pub created_at: i64,
}

/// Latest message exchanged with one counterparty.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ConversationDbModel {
    pub other_party: String,
    pub last_message: String,
    pub last_message_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmsDirection {
    Incoming,
    Outgoing,
}

impl SmsDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmsStatus {
    Received,
    Sent,
    Failed,
}

impl SmsStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

/// An SMS row to insert.
#[derive(Debug, Clone)]
pub struct NewSms {
    pub direction: SmsDirection,
    pub from_number: String,
    pub to_number: String,
    pub body: String,
    pub status: SmsStatus,
    pub phone_id: Option<String>,
}

impl NewSms {
    /// An SMS received on `phone_id` from `from`.
    pub fn incoming(from: impl Into<String>, phone_id: impl Into<String>, body: impl Into<String>) -> Self {
        let phone_id = phone_id.into();
        Self {
            direction: SmsDirection::Incoming,
            from_number: from.into(),
            to_number: phone_id.clone(),
            body: body.into(),
            status: SmsStatus::Received,
            phone_id: non_empty(phone_id),
        }
    }

    /// An SMS sent through `device` to `recipient`.
    pub fn outgoing(
        device: impl Into<String>,
        recipient: impl Into<String>,
        body: impl Into<String>,
        status: SmsStatus,
    ) -> Self {
        let device = device.into();
        Self {
            direction: SmsDirection::Outgoing,
            from_number: device.clone(),
            to_number: recipient.into(),
            body: body.into(),
            status,
            phone_id: non_empty(device),
        }
    }
}

/// A call row to insert.
#[derive(Debug, Clone)]
pub struct NewCall {
    pub call_type: String,
    pub phone_number: String,
    pub contact_name: Option<String>,
    pub duration_seconds: i64,
    pub call_time: Option<String>,
    pub phone_id: Option<String>,
    pub source: Option<String>,
}

impl From<&CallEvent> for NewCall {
    fn from(call: &CallEvent) -> Self {
        Self {
            call_type: call.call_type.clone(),
            phone_number: call.number.clone(),
            contact_name: non_empty(call.name.clone()),
            duration_seconds: call.duration,
            call_time: non_empty(call.time.clone()),
            phone_id: non_empty(call.phone_id.clone()),
            source: non_empty(call.source.clone()),
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}
