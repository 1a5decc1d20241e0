//! Forwarding rule file loader.
//!
//! The file maps rule names to flat string entries:
//!
//! ```yaml
//! codes:
//!   rule: "验证码"
//!   type: keyword
//!   notify: bark
//!   url: https://api.day.app/${BARK_KEY}/
//! ```
//!
//! Every entry is validated into a typed [`Rule`]. Malformed entries are
//! logged and left out of the [`RuleSet`]; they never stop the others from
//! loading.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use super::env_subst::substitute_env;
use crate::domain::rule::matcher;
use crate::domain::{MatchType, Rule, RuleSet};
use crate::notification::channels::ChannelConfig;
use crate::{Error, Result};

/// A rule left out of the set, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRule {
    pub name: String,
    pub reason: String,
}

/// What happened while loading a rule file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSetReport {
    pub loaded: usize,
    pub rejected: Vec<RejectedRule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Yaml,
    Json,
}

impl FileFormat {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Read and validate the rule file at `path`.
///
/// `${ENV}` placeholders are substituted before parsing. Files ending in
/// `.json` are parsed as JSON, anything else as YAML.
pub async fn load_rule_set(path: impl AsRef<Path>) -> Result<(RuleSet, RuleSetReport)> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::config(format!("cannot read rule file {}: {e}", path.display())))?;

    let text = substitute_env(&text);
    let (rules, report) = parse_rule_set(&text, FileFormat::from_path(path) == FileFormat::Json)?;

    info!(
        path = %path.display(),
        loaded = report.loaded,
        rejected = report.rejected.len(),
        "Forwarding rules loaded"
    );
    Ok((rules, report))
}

/// Parse rule file contents. Only a document that is not a mapping at all
/// is an error; bad entries end up in the report.
pub fn parse_rule_set(text: &str, json: bool) -> Result<(RuleSet, RuleSetReport)> {
    let document: Value = if json {
        serde_json::from_str(text)?
    } else {
        serde_yaml::from_str(text)?
    };

    let entries = match document {
        Value::Object(entries) => entries,
        // empty YAML file
        Value::Null => Default::default(),
        other => {
            return Err(Error::config(format!(
                "rule file must be a mapping of rule names, found {}",
                value_kind(&other)
            )));
        }
    };

    let mut rules = Vec::with_capacity(entries.len());
    let mut report = RuleSetReport::default();

    for (name, value) in entries {
        match parse_rule(&name, &value) {
            Ok(rule) => rules.push(rule),
            Err(reason) => {
                warn!(rule = %name, reason = %reason, "Skipping invalid forwarding rule");
                report.rejected.push(RejectedRule { name, reason });
            }
        }
    }

    let rules = RuleSet::new(rules);
    report.loaded = rules.len();
    Ok((rules, report))
}

fn parse_rule(name: &str, value: &Value) -> std::result::Result<Rule, String> {
    let Value::Object(raw) = value else {
        return Err(format!("entry must be a mapping, found {}", value_kind(value)));
    };

    let entry: BTreeMap<String, String> = raw
        .iter()
        .filter_map(|(key, value)| scalar_to_string(value).map(|v| (key.clone(), v)))
        .collect();

    let pattern = entry
        .get("rule")
        .ok_or_else(|| "missing 'rule'".to_string())?;
    let match_type: MatchType = entry
        .get("type")
        .ok_or_else(|| "missing 'type'".to_string())?
        .parse()
        .map_err(|e: matcher::MatchError| e.to_string())?;
    let notify = entry
        .get("notify")
        .ok_or_else(|| "missing 'notify'".to_string())?;

    let channel = ChannelConfig::from_entry(notify, &entry).map_err(|e| e.to_string())?;

    if match_type == MatchType::Regex
        && let Err(e) = matcher::evaluate(match_type, pattern, "")
    {
        // kept in the set; it never matches
        warn!(rule = %name, error = %e, "Rule pattern does not compile");
    }

    Ok(Rule::new(name, match_type, pattern.clone(), channel))
}

/// Scalars become strings; `smtp_port: 465` is as good as `"465"`.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
