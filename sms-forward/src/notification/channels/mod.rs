//! Notification channels.
//!
//! One adapter per supported service:
//! - WeChat Work group robot (`wechat`)
//! - Bark push (`bark`)
//! - Gotify (`gotify`)
//! - Email over SMTP (`email`)
//! - QQ push relay (`qq`)
//! - Feishu and DingTalk robots (`feishu`, `dingtalk`)
//! - Telegram Bot API (`telegram`)
//!
//! Adapters never return errors to the caller. Every attempt ends in a
//! [`DispatchResult`] that is logged by the engine.

mod bark;
mod dingtalk;
mod email;
mod feishu;
mod gotify;
mod qq;
mod telegram;
mod wechat;

pub use email::EmailConfig;
pub use gotify::GotifyConfig;
pub use qq::QqConfig;
pub use telegram::TelegramConfig;

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use tracing::{info, warn};

use super::formatter::RenderedMessage;
use crate::utils::http_client;

/// Default per-request timeout for channel adapters.
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for the QQ relay and Telegram, which are often slow or proxied.
pub const RELAY_NOTIFY_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_QQ_RELAY_URL: &str = "https://wx.scjtqs.com/qq/push/pushMsg";
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Configuration for channels addressed by a single webhook URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookUrl {
    pub url: String,
}

/// Typed channel configuration, one variant per supported service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelConfig {
    /// WeChat Work robot (chat webhook).
    Wechat(WebhookUrl),
    /// Bark push service.
    Bark(WebhookUrl),
    /// Gotify (generic push with token).
    Gotify(GotifyConfig),
    Email(EmailConfig),
    /// QQ push relay.
    Qq(QqConfig),
    Feishu(WebhookUrl),
    Dingtalk(WebhookUrl),
    Telegram(TelegramConfig),
}

impl ChannelConfig {
    /// Get the channel type name.
    pub fn channel_type(&self) -> &'static str {
        match self {
            Self::Wechat(_) => "wechat",
            Self::Bark(_) => "bark",
            Self::Gotify(_) => "gotify",
            Self::Email(_) => "email",
            Self::Qq(_) => "qq",
            Self::Feishu(_) => "feishu",
            Self::Dingtalk(_) => "dingtalk",
            Self::Telegram(_) => "telegram",
        }
    }

    /// Build a typed config from a raw rule entry.
    ///
    /// `kind` is the rule's `notify` value. Required keys must be present and
    /// non-blank; everything else in `entry` is ignored.
    pub fn from_entry(
        kind: &str,
        entry: &BTreeMap<String, String>,
    ) -> Result<Self, ChannelConfigError> {
        let kind = canonical_kind(kind)
            .ok_or_else(|| ChannelConfigError::UnknownKind(kind.trim().to_string()))?;
        let fields = EntryFields { kind, entry };

        let config = match kind {
            "wechat" => Self::Wechat(fields.webhook_url()?),
            "bark" => Self::Bark(fields.webhook_url()?),
            "feishu" => Self::Feishu(fields.webhook_url()?),
            "dingtalk" => Self::Dingtalk(fields.webhook_url()?),
            "gotify" => Self::Gotify(GotifyConfig {
                url: fields.required("url")?,
                token: fields.required("token")?,
            }),
            "email" => {
                let port = fields.required("smtp_port")?;
                let smtp_port = port.parse::<u16>().map_err(|e| fields.invalid("smtp_port", e))?;
                Self::Email(EmailConfig {
                    smtp_host: fields.required("smtp_host")?,
                    smtp_port,
                    username: fields.required("username")?,
                    password: fields.required("password")?,
                    from: fields.required("from")?,
                    to: fields.required("to")?,
                })
            }
            "qq" => Self::Qq(QqConfig {
                qq: fields.required("qq")?,
                token: fields.required("token")?,
            }),
            "telegram" => {
                let proxy = fields.optional("proxy");
                if let Some(proxy) = proxy.as_deref() {
                    reqwest::Proxy::all(proxy).map_err(|e| fields.invalid("proxy", e))?;
                }
                Self::Telegram(TelegramConfig {
                    bot_token: fields.required("bot_token")?,
                    chat_id: fields.required("chat_id")?,
                    proxy,
                })
            }
            _ => return Err(ChannelConfigError::UnknownKind(kind.to_string())),
        };

        Ok(config)
    }
}

/// Map a `notify` value (or one of its descriptive aliases) to a channel type name.
pub fn canonical_kind(kind: &str) -> Option<&'static str> {
    let kind = match kind.trim() {
        "wechat" | "chat-webhook" => "wechat",
        "bark" | "push-service" => "bark",
        "gotify" | "generic-push-with-token" => "gotify",
        "email" => "email",
        "qq" | "qq-relay" => "qq",
        "feishu" => "feishu",
        "dingtalk" => "dingtalk",
        "telegram" => "telegram",
        _ => return None,
    };
    Some(kind)
}

/// Error produced while converting a raw rule entry into a [`ChannelConfig`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelConfigError {
    #[error("unknown notify type '{0}'")]
    UnknownKind(String),

    #[error("{kind} channel is missing required key '{key}'")]
    MissingKey {
        kind: &'static str,
        key: &'static str,
    },

    #[error("{kind} channel has invalid '{key}': {reason}")]
    InvalidValue {
        kind: &'static str,
        key: &'static str,
        reason: String,
    },
}

struct EntryFields<'a> {
    kind: &'static str,
    entry: &'a BTreeMap<String, String>,
}

impl EntryFields<'_> {
    fn optional(&self, key: &str) -> Option<String> {
        self.entry
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    fn required(&self, key: &'static str) -> Result<String, ChannelConfigError> {
        self.optional(key).ok_or(ChannelConfigError::MissingKey {
            kind: self.kind,
            key,
        })
    }

    fn webhook_url(&self) -> Result<WebhookUrl, ChannelConfigError> {
        Ok(WebhookUrl {
            url: self.required("url")?,
        })
    }

    fn invalid(&self, key: &'static str, reason: impl fmt::Display) -> ChannelConfigError {
        ChannelConfigError::InvalidValue {
            kind: self.kind,
            key,
            reason: reason.to_string(),
        }
    }
}

/// Outcome of one delivery attempt to one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    pub channel: String,
    pub success: bool,
    /// HTTP status (or SMTP reply code) when a response was received.
    pub status: Option<u16>,
    pub error: Option<String>,
}

impl DispatchResult {
    pub fn delivered(channel: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            channel: channel.into(),
            success: true,
            status,
            error: None,
        }
    }

    pub fn failed(
        channel: impl Into<String>,
        status: Option<u16>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            success: false,
            status,
            error: Some(error.into()),
        }
    }

    /// Delivery was not attempted.
    pub fn skipped(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::failed(channel, None, reason)
    }
}

/// Delivers rendered messages to a channel.
#[async_trait]
pub trait ChannelDispatcher: Send + Sync {
    /// Deliver `message` to one channel. Never fails; the outcome is in the result.
    async fn deliver(&self, channel: &ChannelConfig, message: &RenderedMessage) -> DispatchResult;

    /// Deliver using an untyped `notify` kind and key/value bag.
    ///
    /// Unknown kinds and missing keys are logged and skipped without any
    /// network call.
    async fn deliver_entry(
        &self,
        kind: &str,
        entry: &BTreeMap<String, String>,
        message: &RenderedMessage,
    ) -> DispatchResult {
        match ChannelConfig::from_entry(kind, entry) {
            Ok(channel) => self.deliver(&channel, message).await,
            Err(e @ ChannelConfigError::UnknownKind(_)) => {
                warn!(kind = %kind, error = %e, "Unknown notify type, skipping delivery");
                DispatchResult::skipped(kind, e.to_string())
            }
            Err(e) => {
                warn!(kind = %kind, error = %e, "Channel configuration error, skipping delivery");
                DispatchResult::skipped(kind, e.to_string())
            }
        }
    }
}

/// Settings shared by all HTTP-based adapters.
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    /// Timeout for most adapters.
    pub timeout: Duration,
    /// Timeout for the QQ relay and Telegram.
    pub relay_timeout: Duration,
    pub qq_relay_url: String,
    pub telegram_api_base: String,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_NOTIFY_TIMEOUT,
            relay_timeout: RELAY_NOTIFY_TIMEOUT,
            qq_relay_url: DEFAULT_QQ_RELAY_URL.to_string(),
            telegram_api_base: DEFAULT_TELEGRAM_API_BASE.to_string(),
        }
    }
}

/// Production dispatcher backed by `reqwest` and `lettre`.
pub struct HttpChannelDispatcher {
    client: Client,
    relay_client: Client,
    settings: DispatcherSettings,
}

impl HttpChannelDispatcher {
    pub fn new(settings: DispatcherSettings) -> crate::Result<Self> {
        Ok(Self {
            client: http_client::build_client(settings.timeout, None)?,
            relay_client: http_client::build_client(settings.relay_timeout, None)?,
            settings,
        })
    }
}

#[async_trait]
impl ChannelDispatcher for HttpChannelDispatcher {
    async fn deliver(&self, channel: &ChannelConfig, message: &RenderedMessage) -> DispatchResult {
        match channel {
            ChannelConfig::Wechat(config) => wechat::send(&self.client, config, message).await,
            ChannelConfig::Bark(config) => bark::send(&self.client, config, message).await,
            ChannelConfig::Gotify(config) => gotify::send(&self.client, config, message).await,
            ChannelConfig::Email(config) => {
                email::send(config, message, self.settings.timeout).await
            }
            ChannelConfig::Qq(config) => {
                qq::send(&self.relay_client, &self.settings.qq_relay_url, config, message).await
            }
            ChannelConfig::Feishu(config) => feishu::send(&self.client, config, message).await,
            ChannelConfig::Dingtalk(config) => {
                dingtalk::send(&self.client, config, message).await
            }
            ChannelConfig::Telegram(config) => {
                telegram::send(
                    &self.relay_client,
                    &self.settings.telegram_api_base,
                    self.settings.relay_timeout,
                    config,
                    message,
                )
                .await
            }
        }
    }
}

/// Which responses count as a successful delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Acceptance {
    /// Any HTTP response; the service gives no useful status.
    AnyResponse,
    /// Exactly `200 OK`.
    Ok200,
}

/// Longest response body echoed into logs and results.
const MAX_ERROR_BODY: usize = 512;

async fn post_json<T: Serialize + ?Sized>(
    channel: &'static str,
    request: RequestBuilder,
    payload: &T,
    acceptance: Acceptance,
) -> DispatchResult {
    let response = match request.json(payload).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(channel, error = %e, "Notification request failed");
            return DispatchResult::failed(channel, None, format!("request failed: {e}"));
        }
    };

    let status = response.status();
    let accepted = match acceptance {
        Acceptance::AnyResponse => true,
        Acceptance::Ok200 => status == StatusCode::OK,
    };

    if accepted {
        info!(channel, status = status.as_u16(), "Notification delivered");
        return DispatchResult::delivered(channel, Some(status.as_u16()));
    }

    let body = response.text().await.unwrap_or_default();
    let body = truncate(&body, MAX_ERROR_BODY);
    warn!(channel, status = status.as_u16(), body = %body, "Notification rejected");
    DispatchResult::failed(
        channel,
        Some(status.as_u16()),
        format!("unexpected status {status}: {body}"),
    )
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(limit).collect();
    truncated.push_str("...");
    truncated
}

/// `title` and `body` on separate lines, as chat robots display them.
fn titled(message: &RenderedMessage) -> String {
    format!("{}\n{}", message.title, message.long)
}
