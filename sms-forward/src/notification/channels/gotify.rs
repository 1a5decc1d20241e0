//! Gotify push server.

use std::fmt;

use reqwest::Client;
use serde_json::{Value, json};

use super::{Acceptance, DispatchResult, post_json};
use crate::notification::formatter::RenderedMessage;

const CHANNEL: &str = "gotify";

/// Message priority; 9 is shown as a high-priority notification on Android.
const PRIORITY: u8 = 9;

#[derive(Clone, PartialEq, Eq)]
pub struct GotifyConfig {
    /// Server base URL.
    pub url: String,
    /// Application token.
    pub token: String,
}

impl fmt::Debug for GotifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GotifyConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .finish()
    }
}

pub(super) fn build_payload(message: &RenderedMessage) -> Value {
    json!({
        "title": message.mobile_title,
        "message": message.short,
        "priority": PRIORITY,
    })
}

fn message_url(base: &str) -> String {
    format!("{}/message", base.trim_end_matches('/'))
}

/// Best effort: any response is treated as delivered.
pub(super) async fn send(
    client: &Client,
    config: &GotifyConfig,
    message: &RenderedMessage,
) -> DispatchResult {
    let request = client
        .post(message_url(&config.url))
        .query(&[("token", config.token.as_str())]);
    post_json(CHANNEL, request, &build_payload(message), Acceptance::AnyResponse).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::channels::test_support::{client, message};

    #[test]
    fn test_message_url() {
        assert_eq!(message_url("https://push.example.com/"), "https://push.example.com/message");
        assert_eq!(message_url("https://push.example.com"), "https://push.example.com/message");
    }

    #[tokio::test]
    async fn test_send_uses_token_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/message")
            .match_query(mockito::Matcher::UrlEncoded("token".into(), "app-token".into()))
            .match_body(mockito::Matcher::Json(json!({
                "title": "+1555",
                "message": "验证码 9821\nquectel0",
                "priority": 9,
            })))
            .with_status(401)
            .create_async()
            .await;

        let config = GotifyConfig {
            url: server.url(),
            token: "app-token".to_string(),
        };
        let result = send(&client(), &config, &message()).await;

        assert!(result.success);
        assert_eq!(result.status, Some(401));
        mock.assert_async().await;
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = GotifyConfig {
            url: "https://push.example.com".into(),
            token: "app-token".into(),
        };
        assert!(!format!("{config:?}").contains("app-token"));
    }
}
