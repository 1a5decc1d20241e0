//! Repository layer for database access.

pub mod event_log;

pub use event_log::*;
