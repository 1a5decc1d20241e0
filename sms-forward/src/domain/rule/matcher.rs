//! Rule matching.
//!
//! Pure functions over their arguments; safe to call from any number of
//! request handlers at once.

use regex::Regex;
use tracing::warn;

use super::{MatchType, Rule};

/// Error type for match evaluation failures.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("Invalid regex pattern: {0}")]
    InvalidRegexPattern(String),

    #[error("Unknown match type: {0}")]
    UnknownMatchType(String),
}

/// Evaluate `pattern` against `text` for a known match type.
///
/// * `All` always matches.
/// * `Keyword` is a case-sensitive substring test; an empty pattern matches everything.
/// * `Regex` matches anywhere in `text`; a pattern that does not compile is an error.
pub fn evaluate(match_type: MatchType, pattern: &str, text: &str) -> Result<bool, MatchError> {
    match match_type {
        MatchType::All => Ok(true),
        MatchType::Keyword => Ok(text.contains(pattern)),
        MatchType::Regex => {
            let regex =
                Regex::new(pattern).map_err(|e| MatchError::InvalidRegexPattern(e.to_string()))?;
            Ok(regex.is_match(text))
        }
    }
}

/// Match with an untyped match type, as found in a raw rule entry.
///
/// Unknown match types and invalid patterns are logged and treated as no match.
pub fn matches(match_type: &str, pattern: &str, text: &str) -> bool {
    let parsed = match match_type.parse::<MatchType>() {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "Unsupported match type, treating as no match");
            return false;
        }
    };

    evaluate(parsed, pattern, text).unwrap_or_else(|e| {
        warn!(pattern = %pattern, error = %e, "Pattern evaluation failed, treating as no match");
        false
    })
}

/// Match a loaded rule against `text` (fail-closed).
pub fn matches_rule(rule: &Rule, text: &str) -> bool {
    match evaluate(rule.match_type, &rule.pattern, text) {
        Ok(matched) => matched,
        Err(e) => {
            warn!(
                rule = %rule.name,
                pattern = %rule.pattern,
                error = %e,
                "Skipping rule for this event"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("验证码", "您的验证码是 123456", true)]
    #[case("", "anything", true)]
    #[case("", "", true)]
    #[case("longer than text", "short", false)]
    #[case("Bank", "bank transfer", false)]
    #[case("transfer", "bank transfer", true)]
    fn test_keyword(#[case] pattern: &str, #[case] text: &str, #[case] expected: bool) {
        assert_eq!(evaluate(MatchType::Keyword, pattern, text).unwrap(), expected);
        assert_eq!(matches("keyword", pattern, text), expected);
    }

    #[rstest]
    #[case(r"\d{6}", "code 123456", true)]
    #[case(r"^\+86", "+8613800000000", true)]
    #[case(r"^\+86", "10086", false)]
    #[case(r"(?i)verification", "Your VERIFICATION code", true)]
    fn test_regex(#[case] pattern: &str, #[case] text: &str, #[case] expected: bool) {
        assert_eq!(evaluate(MatchType::Regex, pattern, text).unwrap(), expected);
    }

    #[test]
    fn test_all_always_matches() {
        assert!(evaluate(MatchType::All, "ignored", "").unwrap());
        assert!(matches("all", "whatever", "text"));
    }

    #[test]
    fn test_invalid_regex_is_no_match() {
        assert!(matches!(
            evaluate(MatchType::Regex, "([unclosed", "text"),
            Err(MatchError::InvalidRegexPattern(_))
        ));
        assert!(!matches("regex", "([unclosed", "([unclosed"));
    }

    #[test]
    fn test_unknown_match_type_is_no_match() {
        assert!(!matches("glob", "*", "anything"));
        assert!(!matches("", "", ""));
    }
}
