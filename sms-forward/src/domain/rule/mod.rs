//! Forwarding rules.
//!
//! A [`Rule`] pairs a match condition with exactly one notification channel.
//! Rules are validated once when the rule file is loaded and are immutable
//! afterwards; a [`RuleSet`] is shared read-only between request handlers.

pub mod matcher;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::notification::channels::ChannelConfig;

pub use matcher::MatchError;

/// How a rule's pattern is applied to event text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    /// Every event matches.
    All,
    /// Literal, case-sensitive substring.
    Keyword,
    /// Regular expression matched anywhere in the text.
    Regex,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Keyword => "keyword",
            Self::Regex => "regex",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchType {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(Self::All),
            "keyword" => Ok(Self::Keyword),
            "regex" => Ok(Self::Regex),
            other => Err(MatchError::UnknownMatchType(other.to_string())),
        }
    }
}

/// A named forwarding rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub match_type: MatchType,
    pub pattern: String,
    pub channel: ChannelConfig,
}

impl Rule {
    pub fn new(
        name: impl Into<String>,
        match_type: MatchType,
        pattern: impl Into<String>,
        channel: ChannelConfig,
    ) -> Self {
        Self {
            name: name.into(),
            match_type,
            pattern: pattern.into(),
            channel,
        }
    }

    /// Whether this rule fires for `text`. Invalid patterns never match.
    pub fn matches(&self, text: &str) -> bool {
        matcher::matches_rule(self, text)
    }
}

/// The immutable set of loaded rules, keyed and ordered by name.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: BTreeMap<String, Rule>,
}

impl RuleSet {
    pub fn new(rules: impl IntoIterator<Item = Rule>) -> Self {
        Self {
            rules: rules
                .into_iter()
                .map(|rule| (rule.name.clone(), rule))
                .collect(),
        }
    }

    /// Rules in name order. Every rule is visited exactly once.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::channels::{ChannelConfig, WebhookUrl};

    fn wechat(url: &str) -> ChannelConfig {
        ChannelConfig::Wechat(WebhookUrl {
            url: url.to_string(),
        })
    }

    #[test]
    fn test_match_type_from_str() {
        assert_eq!("all".parse::<MatchType>().unwrap(), MatchType::All);
        assert_eq!(" keyword ".parse::<MatchType>().unwrap(), MatchType::Keyword);
        assert_eq!("regex".parse::<MatchType>().unwrap(), MatchType::Regex);
        assert!(matches!(
            "fuzzy".parse::<MatchType>(),
            Err(MatchError::UnknownMatchType(t)) if t == "fuzzy"
        ));
    }

    #[test]
    fn test_rule_set_orders_by_name() {
        let set = RuleSet::new([
            Rule::new("zeta", MatchType::All, "", wechat("http://z")),
            Rule::new("alpha", MatchType::All, "", wechat("http://a")),
            Rule::new("mid", MatchType::All, "", wechat("http://m")),
        ]);

        let names: Vec<_> = set.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
        assert_eq!(set.len(), 3);
        assert!(set.get("mid").is_some());
    }

    #[test]
    fn test_rule_set_duplicate_name_keeps_last() {
        let set = RuleSet::new([
            Rule::new("same", MatchType::Keyword, "first", wechat("http://1")),
            Rule::new("same", MatchType::Keyword, "second", wechat("http://2")),
        ]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("same").unwrap().pattern, "second");
    }
}
