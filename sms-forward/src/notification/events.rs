//! Inbound telephony events.
//!
//! Field names follow the JSON the gateway webhook posts.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A received SMS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct SmsEvent {
    /// Sender number.
    pub number: String,
    /// Receive time as reported by the gateway (ISO-8601).
    pub time: String,
    /// Message body.
    pub text: String,
    pub source: String,
    /// Device (modem) identifier.
    pub phone_id: String,
    pub sms_id: String,
    pub timestamp: String,
}

/// A call record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct CallEvent {
    pub number: String,
    /// Contact name, if the gateway resolved one.
    pub name: String,
    pub time: String,
    /// `incoming`, `outgoing`, `missed`, `ended` or `unknown`.
    #[serde(rename = "type")]
    pub call_type: String,
    /// Call duration in seconds.
    pub duration: i64,
    pub source: String,
    pub phone_id: String,
    pub timestamp: String,
}

/// Any event the gateway can report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Sms(SmsEvent),
    Call(CallEvent),
}

impl InboundEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Sms(_) => "sms",
            Self::Call(_) => "call",
        }
    }

    /// The remote party's number.
    pub fn number(&self) -> &str {
        match self {
            Self::Sms(sms) => &sms.number,
            Self::Call(call) => &call.number,
        }
    }

    /// Text that forwarding rules are matched against.
    ///
    /// For SMS this is the body. Calls have no body, so rules see the number,
    /// contact name and call type, one per line.
    pub fn match_text(&self) -> String {
        match self {
            Self::Sms(sms) => sms.text.clone(),
            Self::Call(call) => format!("{}\n{}\n{}", call.number, call.name, call.call_type),
        }
    }
}

impl From<SmsEvent> for InboundEvent {
    fn from(event: SmsEvent) -> Self {
        Self::Sms(event)
    }
}

impl From<CallEvent> for InboundEvent {
    fn from(event: CallEvent) -> Self {
        Self::Call(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sms_event_deserialize_partial() {
        let event: SmsEvent =
            serde_json::from_str(r#"{"number":"+1555","text":"hi","phone_id":"quectel0"}"#)
                .unwrap();
        assert_eq!(event.number, "+1555");
        assert_eq!(event.text, "hi");
        assert_eq!(event.phone_id, "quectel0");
        assert!(event.time.is_empty());
    }

    #[test]
    fn test_call_event_type_field() {
        let event: CallEvent = serde_json::from_str(
            r#"{"number":"10086","name":"Carrier","type":"missed","duration":0}"#,
        )
        .unwrap();
        assert_eq!(event.call_type, "missed");

        let inbound = InboundEvent::from(event);
        assert_eq!(inbound.kind(), "call");
        assert_eq!(inbound.number(), "10086");
        assert_eq!(inbound.match_text(), "10086\nCarrier\nmissed");
    }

    #[test]
    fn test_sms_match_text_is_body() {
        let inbound = InboundEvent::Sms(SmsEvent {
            number: "+1555".into(),
            text: "验证码 9821".into(),
            ..Default::default()
        });
        assert_eq!(inbound.match_text(), "验证码 9821");
    }
}
