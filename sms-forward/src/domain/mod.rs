//! Domain layer for sms-forward.
//!
//! Forwarding rules and the matcher that gates them.

pub mod rule;

pub use rule::{MatchError, MatchType, Rule, RuleSet};
