//! DingTalk custom robot.

use reqwest::Client;
use serde_json::{Value, json};

use super::{Acceptance, DispatchResult, WebhookUrl, post_json, titled};
use crate::notification::formatter::RenderedMessage;

const CHANNEL: &str = "dingtalk";

pub(super) fn build_payload(message: &RenderedMessage) -> Value {
    json!({
        "msgtype": "text",
        "text": { "content": titled(message) },
        "at": { "isAtAll": false },
    })
}

pub(super) async fn send(
    client: &Client,
    config: &WebhookUrl,
    message: &RenderedMessage,
) -> DispatchResult {
    let payload = build_payload(message);
    post_json(CHANNEL, client.post(&config.url), &payload, Acceptance::Ok200).await
}
