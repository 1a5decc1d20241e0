//! Notification engine.
//!
//! For each inbound event the engine evaluates every rule, renders the event
//! for each rule that matched and hands the result to the dispatcher. Matched
//! rules are delivered concurrently; each delivery reports its own outcome and
//! a failed one never prevents the others.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::channels::{ChannelDispatcher, DispatchResult};
use super::events::InboundEvent;
use super::formatter::EventFormatter;
use crate::domain::{Rule, RuleSet};

/// Delivery outcome for one matched rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleOutcome {
    pub rule: String,
    pub result: DispatchResult,
}

pub struct NotificationEngine {
    rules: Arc<RuleSet>,
    formatter: EventFormatter,
    dispatcher: Arc<dyn ChannelDispatcher>,
}

impl NotificationEngine {
    pub fn new(
        rules: Arc<RuleSet>,
        formatter: EventFormatter,
        dispatcher: Arc<dyn ChannelDispatcher>,
    ) -> Self {
        Self {
            rules,
            formatter,
            dispatcher,
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Forward `event` to the channel of every matching rule.
    ///
    /// Never fails. Outcomes are returned in rule-name order for logging and
    /// tests; callers acknowledging the event can ignore them.
    pub async fn process(&self, event: &InboundEvent) -> Vec<RuleOutcome> {
        let text = event.match_text();
        let matched: Vec<&Rule> = self.rules.iter().filter(|rule| rule.matches(&text)).collect();

        if matched.is_empty() {
            debug!(
                kind = event.kind(),
                number = %event.number(),
                rules = self.rules.len(),
                "No rule matched"
            );
            return Vec::new();
        }

        let deliveries = matched.into_iter().map(|rule| self.deliver(rule, event));
        let outcomes = join_all(deliveries).await;

        let delivered = outcomes.iter().filter(|o| o.result.success).count();
        info!(
            kind = event.kind(),
            number = %event.number(),
            matched = outcomes.len(),
            delivered,
            "Event processed"
        );
        outcomes
    }

    async fn deliver(&self, rule: &Rule, event: &InboundEvent) -> RuleOutcome {
        let channel = rule.channel.channel_type();
        info!(rule = %rule.name, channel, kind = event.kind(), "Rule triggered");

        let message = self.formatter.render(event, rule);
        let result = self.dispatcher.deliver(&rule.channel, &message).await;

        if !result.success {
            warn!(
                rule = %rule.name,
                channel,
                status = ?result.status,
                error = result.error.as_deref().unwrap_or_default(),
                "Forwarding failed"
            );
        }

        RuleOutcome {
            rule: rule.name.clone(),
            result,
        }
    }
}
