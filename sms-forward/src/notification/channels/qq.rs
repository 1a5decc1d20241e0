//! QQ push relay.

use std::fmt;

use reqwest::Client;
use serde_json::{Value, json};

use super::{Acceptance, DispatchResult, post_json, titled};
use crate::notification::formatter::RenderedMessage;

const CHANNEL: &str = "qq";

#[derive(Clone, PartialEq, Eq)]
pub struct QqConfig {
    /// Target QQ number.
    pub qq: String,
    /// Relay token.
    pub token: String,
}

impl fmt::Debug for QqConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QqConfig")
            .field("qq", &self.qq)
            .field("token", &"<redacted>")
            .finish()
    }
}

pub(super) fn build_payload(config: &QqConfig, message: &RenderedMessage) -> Value {
    json!({
        "qq": config.qq,
        "content": [
            { "msgtype": "text", "text": titled(message) }
        ],
        "token": config.token,
    })
}

/// Best effort: the relay answers 200 even for rejected messages.
pub(super) async fn send(
    client: &Client,
    relay_url: &str,
    config: &QqConfig,
    message: &RenderedMessage,
) -> DispatchResult {
    let request = client
        .post(relay_url)
        .query(&[("token", config.token.as_str())]);
    post_json(
        CHANNEL,
        request,
        &build_payload(config, message),
        Acceptance::AnyResponse,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::channels::test_support::{client, message};

    #[tokio::test]
    async fn test_send_to_relay() {
        let mut server = mockito::Server::new_async().await;
        let config = QqConfig {
            qq: "10001".to_string(),
            token: "relay-token".to_string(),
        };
        let mock = server
            .mock("POST", "/qq/push/pushMsg")
            .match_query(mockito::Matcher::UrlEncoded(
                "token".into(),
                "relay-token".into(),
            ))
            .match_body(mockito::Matcher::Json(json!({
                "qq": "10001",
                "content": [{"msgtype": "text", "text": "短信通知\n触发规则: codes\n短信内容: 验证码 9821"}],
                "token": "relay-token",
            })))
            .with_status(200)
            .with_body(r#"{"code":0}"#)
            .create_async()
            .await;

        let relay = format!("{}/qq/push/pushMsg", server.url());
        let result = send(&client(), &relay, &config, &message()).await;

        assert!(result.success);
        mock.assert_async().await;
    }
}
