/// Replace `${ENV_VAR}` placeholders in the rule file text.
///
/// Unresolvable variables are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// Replace `${ENV_VAR}` placeholders using a custom lookup function.
pub(crate) fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next();

        let mut name = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            name.push(c);
        }

        match (closed, name.is_empty()) {
            (true, false) => match lookup(&name) {
                Some(value) => result.push_str(&value),
                None => {
                    result.push_str("${");
                    result.push_str(&name);
                    result.push('}');
                }
            },
            (true, true) => result.push_str("${}"),
            // unterminated
            (false, _) => {
                result.push_str("${");
                result.push_str(&name);
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "BARK_KEY" => Some("abc123".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_substitutes_known_var() {
        assert_eq!(
            substitute_env_with("url: https://api.day.app/${BARK_KEY}/", lookup),
            "url: https://api.day.app/abc123/"
        );
    }

    #[test]
    fn test_leaves_unknown_and_malformed() {
        assert_eq!(substitute_env_with("${NOPE}", lookup), "${NOPE}");
        assert_eq!(substitute_env_with("${}", lookup), "${}");
        assert_eq!(substitute_env_with("tail ${BARK_KEY", lookup), "tail ${BARK_KEY");
        assert_eq!(substitute_env_with("cost $5", lookup), "cost $5");
    }
}
