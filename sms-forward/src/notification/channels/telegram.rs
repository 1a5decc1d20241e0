//! Telegram Bot API notification channel.
//!
//! Sends the long message via `POST /bot<token>/sendMessage`, optionally
//! through an HTTP or SOCKS proxy configured on the rule.

use std::fmt;
use std::time::Duration;

use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{Acceptance, DispatchResult, post_json};
use crate::notification::formatter::RenderedMessage;
use crate::utils::http_client;

const CHANNEL: &str = "telegram";

/// Telegram `sendMessage` text limit (UTF-8 characters).
const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

#[derive(Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Target chat ID (user, group, or channel).
    pub chat_id: String,
    /// Optional proxy URL (`http://`, `https://` or `socks5://`).
    pub proxy: Option<String>,
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("proxy", &self.proxy)
            .finish()
    }
}

pub(super) fn build_payload(config: &TelegramConfig, message: &RenderedMessage) -> Value {
    json!({
        "chat_id": config.chat_id,
        "text": truncate_message(&message.long, TELEGRAM_MESSAGE_LIMIT),
    })
}

pub(super) async fn send(
    client: &Client,
    api_base: &str,
    timeout: Duration,
    config: &TelegramConfig,
    message: &RenderedMessage,
) -> DispatchResult {
    let proxied;
    let client = match config.proxy.as_deref() {
        Some(proxy) => match http_client::build_client(timeout, Some(proxy)) {
            Ok(built) => {
                debug!(proxy = %proxy, "Sending Telegram message through proxy");
                proxied = built;
                &proxied
            }
            Err(e) => {
                warn!(error = %e, "Telegram proxy unusable, not sending");
                return DispatchResult::failed(CHANNEL, None, e.to_string());
            }
        },
        None => client,
    };

    let url = format!(
        "{}/bot{}/sendMessage",
        api_base.trim_end_matches('/'),
        config.bot_token
    );
    post_json(
        CHANNEL,
        client.post(url),
        &build_payload(config, message),
        Acceptance::Ok200,
    )
    .await
}

/// Truncate a message to fit within the Telegram character limit.
fn truncate_message(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let suffix = "\n\n[truncated]";
    let budget = limit - suffix.chars().count();
    let truncated: String = text.chars().take(budget).collect();
    format!("{truncated}{suffix}")
}
