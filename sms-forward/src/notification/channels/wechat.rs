//! WeChat Work group robot.

use reqwest::Client;
use serde_json::{Value, json};

use super::{Acceptance, DispatchResult, WebhookUrl, post_json, titled};
use crate::notification::formatter::RenderedMessage;

const CHANNEL: &str = "wechat";

pub(super) fn build_payload(message: &RenderedMessage) -> Value {
    json!({
        "msgtype": "text",
        "text": { "content": titled(message) },
    })
}

/// Any response from the robot endpoint counts as delivered.
pub(super) async fn send(
    client: &Client,
    config: &WebhookUrl,
    message: &RenderedMessage,
) -> DispatchResult {
    let payload = build_payload(message);
    post_json(CHANNEL, client.post(&config.url), &payload, Acceptance::AnyResponse).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::channels::test_support::{client, message};

    #[test]
    fn test_build_payload() {
        let payload = build_payload(&message());
        assert_eq!(payload["msgtype"], "text");
        assert_eq!(
            payload["text"]["content"],
            "短信通知\n触发规则: codes\n短信内容: 验证码 9821"
        );
    }

    #[tokio::test]
    async fn test_non_200_still_counts_as_delivered() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/cgi-bin/webhook/send")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::PartialJson(json!({"msgtype": "text"})))
            .with_status(500)
            .create_async()
            .await;

        let config = WebhookUrl {
            url: format!("{}/cgi-bin/webhook/send", server.url()),
        };
        let result = send(&client(), &config, &message()).await;

        assert!(result.success);
        assert_eq!(result.status, Some(500));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connection_error_is_failure() {
        let config = WebhookUrl {
            url: "http://127.0.0.1:9/unreachable".to_string(),
        };
        let result = send(&client(), &config, &message()).await;
        assert!(!result.success);
        assert_eq!(result.channel, "wechat");
    }
}
