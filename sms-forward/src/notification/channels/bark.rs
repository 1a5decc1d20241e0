//! Bark push service.
//!
//! Pushes the compact message. When the text carries a verification code the
//! code is attached so the device copies it to the clipboard.

use reqwest::Client;
use serde::Serialize;
use tracing::info;

use super::{Acceptance, DispatchResult, WebhookUrl, post_json};
use crate::notification::formatter::RenderedMessage;
use crate::notification::verification::{extract_verification_code, has_code_keyword};

const CHANNEL: &str = "bark";

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(super) struct BarkPayload {
    title: String,
    body: String,
    is_archive: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    copy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    auto_copy: Option<u8>,
}

pub(super) fn build_payload(message: &RenderedMessage) -> BarkPayload {
    let code = has_code_keyword(&message.short)
        .then(|| extract_verification_code(&message.short))
        .filter(|code| !code.is_empty());

    if let Some(code) = code.as_deref() {
        info!(code = %code, "Verification code detected");
    }

    BarkPayload {
        title: message.mobile_title.clone(),
        body: message.short.clone(),
        is_archive: 1,
        auto_copy: code.as_ref().map(|_| 1),
        copy: code,
    }
}

pub(super) async fn send(
    client: &Client,
    config: &WebhookUrl,
    message: &RenderedMessage,
) -> DispatchResult {
    let payload = build_payload(message);
    post_json(CHANNEL, client.post(&config.url), &payload, Acceptance::Ok200).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::channels::test_support::{client, message};
    use serde_json::json;

    #[test]
    fn test_payload_with_code() {
        let payload = serde_json::to_value(build_payload(&message())).unwrap();
        assert_eq!(
            payload,
            json!({
                "title": "+1555",
                "body": "验证码 9821\nquectel0",
                "isArchive": 1,
                "copy": "9821",
                "autoCopy": 1,
            })
        );
    }

    #[test]
    fn test_payload_without_keyword_has_no_copy() {
        let mut msg = message();
        msg.short = "Your parcel 123456 has arrived".to_string();
        let payload = serde_json::to_value(build_payload(&msg)).unwrap();
        assert!(payload.get("copy").is_none());
        assert!(payload.get("autoCopy").is_none());
        assert_eq!(payload["isArchive"], 1);
    }

    #[tokio::test]
    async fn test_send_requires_200() {
        let mut server = mockito::Server::new_async().await;
        let ok = server
            .mock("POST", "/device-key")
            .match_body(mockito::Matcher::PartialJson(json!({"copy": "9821"})))
            .with_status(200)
            .create_async()
            .await;

        let config = WebhookUrl {
            url: format!("{}/device-key", server.url()),
        };
        let result = send(&client(), &config, &message()).await;
        assert!(result.success);
        ok.assert_async().await;

        let created = server
            .mock("POST", "/other-key")
            .with_status(201)
            .create_async()
            .await;
        let config = WebhookUrl {
            url: format!("{}/other-key", server.url()),
        };
        let result = send(&client(), &config, &message()).await;
        assert!(!result.success);
        assert_eq!(result.status, Some(201));
        created.assert_async().await;
    }
}
