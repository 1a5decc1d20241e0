//! Notification system module.
//!
//! Turns inbound telephony events into messages and delivers them to the
//! channels of every matching forwarding rule.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sms_forward::notification::{EventFormatter, HttpChannelDispatcher, NotificationEngine};
//!
//! let dispatcher = HttpChannelDispatcher::new(Default::default())?;
//! let engine = NotificationEngine::new(
//!     Arc::new(rule_set),
//!     EventFormatter::new(chrono_tz::Asia::Shanghai),
//!     Arc::new(dispatcher),
//! );
//! engine.process(&event).await;
//! ```

pub mod channels;
pub mod events;
pub mod formatter;
pub mod service;
pub mod verification;

pub use channels::{
    ChannelConfig, ChannelDispatcher, DispatchResult, DispatcherSettings, HttpChannelDispatcher,
};
pub use events::{CallEvent, InboundEvent, SmsEvent};
pub use formatter::{EventFormatter, RenderedMessage};
pub use service::{NotificationEngine, RuleOutcome};
