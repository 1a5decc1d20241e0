//! API request and response models (DTOs).
//!
//! Every response uses the `{success, message, data?}` envelope expected by
//! the gateway hooks and the web client.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::database::models::{ConversationDbModel, SmsLogDbModel};
use crate::notification::{CallEvent, RuleOutcome, SmsEvent};

/// Default page size for conversation listing.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;
/// Largest accepted page size.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Response envelope.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

// ============================================================================
// Inbound events
// ============================================================================

/// SMS pushed by the gateway.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SmsReceiveRequest {
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(flatten)]
    pub sms: SmsEvent,
}

/// Call notification pushed by the gateway.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CallReceiveRequest {
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(flatten)]
    pub call: CallEvent,
}

/// How many rules fired for an inbound event and how many deliveries worked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ForwardSummary {
    pub matched: usize,
    pub delivered: usize,
}

impl From<&[RuleOutcome]> for ForwardSummary {
    fn from(outcomes: &[RuleOutcome]) -> Self {
        Self {
            matched: outcomes.len(),
            delivered: outcomes.iter().filter(|o| o.result.success).count(),
        }
    }
}

// ============================================================================
// Outbound SMS
// ============================================================================

/// Request to send an SMS through the gateway.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct SendSmsRequest {
    pub secret: Option<String>,
    /// Gateway device; the configured default when absent.
    pub device: Option<String>,
    pub recipient: String,
    pub message: String,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendSmsResponse {
    pub device: String,
    pub recipient: String,
    /// Raw gateway output.
    pub output: String,
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct ValidateSecretRequest {
    pub secret: Option<String>,
}

// ============================================================================
// History
// ============================================================================

/// Paging for the conversation list. `page` starts at 1.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ConversationQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ConversationQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConversationResponse {
    pub other_party: String,
    pub last_message: String,
    /// Unix epoch milliseconds
    pub last_message_at: i64,
}

impl From<ConversationDbModel> for ConversationResponse {
    fn from(model: ConversationDbModel) -> Self {
        Self {
            other_party: model.other_party,
            last_message: model.last_message,
            last_message_at: model.last_message_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SmsMessageResponse {
    pub id: i64,
    /// "incoming" or "outgoing"
    pub direction: String,
    pub from_number: String,
    pub to_number: String,
    pub body: String,
    pub status: String,
    pub phone_id: Option<String>,
    /// Unix epoch milliseconds
    pub created_at: i64,
}

impl From<SmsLogDbModel> for SmsMessageResponse {
    fn from(model: SmsLogDbModel) -> Self {
        Self {
            id: model.id,
            direction: model.direction,
            from_number: model.from_number,
            to_number: model.to_number,
            body: model.body,
            status: model.status,
            phone_id: model.phone_id,
            created_at: model.created_at,
        }
    }
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    /// Number of loaded forwarding rules
    pub rules: usize,
}
