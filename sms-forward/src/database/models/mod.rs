//! Database models for sms-forward.
//!
//! These models map directly to the database schema.

pub mod event_log;

pub use event_log::*;
