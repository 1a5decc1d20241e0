//! sms-forward library crate.
//!
//! Forwards SMS and call events received from a telephony gateway to
//! notification channels according to configured rules, and sends SMS back
//! out through the gateway.

pub mod api;
pub mod config;
pub mod database;
pub mod domain;
pub mod error;
pub mod logging;
pub mod notification;
pub mod transport;
pub mod utils;

pub use error::{Error, Result};
