//! Event rendering.
//!
//! Every event becomes a long "desktop" message for chat and email channels
//! and a compact "mobile" message for push services.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::warn;

use super::events::{CallEvent, InboundEvent, SmsEvent};
use crate::domain::Rule;

pub const SMS_TITLE: &str = "短信通知";
pub const CALL_TITLE: &str = "来电通知";

/// Layout used for rendered timestamps.
const DISPLAY_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

/// Zone-less layouts some gateways send; read as civil time in the configured zone.
const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

/// A rendered message pair plus titles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    /// Title for chat, email and webhook channels.
    pub title: String,
    /// Title for push services.
    pub mobile_title: String,
    pub long: String,
    pub short: String,
}

#[derive(Debug, Clone)]
pub struct EventFormatter {
    tz: Tz,
}

impl EventFormatter {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn render(&self, event: &InboundEvent, rule: &Rule) -> RenderedMessage {
        match event {
            InboundEvent::Sms(sms) => self.render_sms(sms, rule),
            InboundEvent::Call(call) => self.render_call(call),
        }
    }

    pub fn render_sms(&self, sms: &SmsEvent, rule: &Rule) -> RenderedMessage {
        let long = format!(
            "触发规则: {}\n发送时间: {}\n发送人: {}\nphoneID: {}\n短信内容: {}\nSource: {}",
            rule.name,
            self.format_timestamp(&sms.time),
            sms.number,
            sms.phone_id,
            sms.text,
            sms.source,
        );
        let short = format!("{}\n{}\n{}\n{}", sms.text, sms.phone_id, sms.time, sms.source);

        RenderedMessage {
            title: SMS_TITLE.to_string(),
            mobile_title: sms.number.clone(),
            long,
            short,
        }
    }

    pub fn render_call(&self, call: &CallEvent) -> RenderedMessage {
        let long = format!(
            "来电时间: {}\n来电号码: {}\n通话类型: {}\nphoneID: {}\n联系人: {}\nSource: {}",
            self.format_timestamp(&call.time),
            call.number,
            call.call_type,
            call.phone_id,
            call.name,
            call.source,
        );
        let short = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            call.number, call.call_type, call.phone_id, call.time, call.name, call.source
        );

        RenderedMessage {
            title: CALL_TITLE.to_string(),
            mobile_title: CALL_TITLE.to_string(),
            long,
            short,
        }
    }

    /// Render `raw` in the configured zone, substituting the current time when
    /// it cannot be parsed.
    pub fn format_timestamp(&self, raw: &str) -> String {
        self.format_timestamp_at(raw, Utc::now())
    }

    pub fn format_timestamp_at(&self, raw: &str, now: DateTime<Utc>) -> String {
        let instant = self.parse_timestamp(raw).unwrap_or_else(|| {
            warn!(time = %raw, "Unparseable event time, using current time");
            now
        });
        instant
            .with_timezone(&self.tz)
            .format(DISPLAY_LAYOUT)
            .to_string()
    }

    fn parse_timestamp(&self, raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }

        NAIVE_LAYOUTS.iter().find_map(|layout| {
            let naive = NaiveDateTime::parse_from_str(raw, layout).ok()?;
            self.tz
                .from_local_datetime(&naive)
                .earliest()
                .map(|local| local.with_timezone(&Utc))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MatchType;
    use crate::notification::channels::{ChannelConfig, WebhookUrl};

    fn formatter() -> EventFormatter {
        EventFormatter::new(chrono_tz::Asia::Shanghai)
    }

    fn rule() -> Rule {
        Rule::new(
            "codes",
            MatchType::Keyword,
            "验证",
            ChannelConfig::Bark(WebhookUrl {
                url: "http://bark".into(),
            }),
        )
    }

    fn sms() -> SmsEvent {
        SmsEvent {
            number: "+1555".into(),
            time: "2024-03-01T08:30:00Z".into(),
            text: "验证码 9821".into(),
            source: "quectel".into(),
            phone_id: "quectel0".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_render_sms_long_and_short() {
        let message = formatter().render_sms(&sms(), &rule());

        assert_eq!(message.title, SMS_TITLE);
        assert_eq!(message.mobile_title, "+1555");
        assert_eq!(
            message.long,
            "触发规则: codes\n发送时间: 2024-03-01 16:30:00\n发送人: +1555\nphoneID: quectel0\n短信内容: 验证码 9821\nSource: quectel"
        );
        assert_eq!(
            message.short,
            "验证码 9821\nquectel0\n2024-03-01T08:30:00Z\nquectel"
        );
        assert!(!message.short.contains("codes"));
    }

    #[test]
    fn test_render_call() {
        let call = CallEvent {
            number: "10086".into(),
            name: "Carrier".into(),
            time: "2024-03-01T16:30:00+08:00".into(),
            call_type: "missed".into(),
            phone_id: "quectel0".into(),
            source: "quectel".into(),
            ..Default::default()
        };
        let message = formatter().render(&InboundEvent::Call(call), &rule());

        assert_eq!(message.title, CALL_TITLE);
        assert_eq!(message.mobile_title, CALL_TITLE);
        assert!(message.long.starts_with("来电时间: 2024-03-01 16:30:00\n来电号码: 10086\n通话类型: missed"));
        assert_eq!(
            message.short,
            "10086\nmissed\nquectel0\n2024-03-01T16:30:00+08:00\nCarrier\nquectel"
        );
    }

    #[test]
    fn test_render_is_idempotent() {
        let f = formatter();
        let event = InboundEvent::Sms(sms());
        assert_eq!(f.render(&event, &rule()), f.render(&event, &rule()));
    }

    #[test]
    fn test_naive_timestamp_uses_configured_zone() {
        let f = formatter();
        assert_eq!(
            f.format_timestamp("2024-03-01 16:30:00"),
            "2024-03-01 16:30:00"
        );
        assert_eq!(
            f.format_timestamp("2024-03-01T16:30:00.250"),
            "2024-03-01 16:30:00"
        );
    }

    #[test]
    fn test_unparseable_timestamp_falls_back_to_now() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let f = formatter();
        assert_eq!(f.format_timestamp_at("yesterday", now), "2024-01-02 08:00:00");
        assert_eq!(f.format_timestamp_at("", now), "2024-01-02 08:00:00");
    }
}
