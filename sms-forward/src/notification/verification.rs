//! Verification-code extraction for push notifications.
//!
//! Best-effort heuristic: an ordered list of pattern families is tried and the
//! first non-empty capture wins. Postal codes, amounts or years in the text
//! can be picked up by the last-resort family.

use std::sync::LazyLock;

use regex::Regex;

/// Keywords that mark a message as carrying a code at all.
static CODE_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(验证码|授权码|校验码|检验码|确认码|激活码|动态码|安全码|验证代码|CODE|Verification)")
        .unwrap()
});

/// Pattern families in priority order. Each captures the code as `code`.
static CODE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // explicit keyword, optional filler, optional opening bracket
        r"(?:验证码|校验码|动态码|授权码|(?i:verification\s+code|verification|code))(?:[：:\s是为]|(?i:is))*[\(（\[【{「]?(?P<code>[0-9\s]{4,7})",
        // CODE: ABC123
        r"(?i:code)[：:\s]*[\(（\[【{「]?(?P<code>[0-9A-Za-z]{4,6})",
        // digits inside any bracket pair
        r"[\(（\[【{「](?P<code>[0-9]{4,6})[\)）\]】}」]",
        // bare 4-6 digit token
        r"(?-u:\b)(?P<code>[0-9]{4,6})(?-u:\b)",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Whether `text` mentions a verification code keyword.
pub fn has_code_keyword(text: &str) -> bool {
    CODE_KEYWORD.is_match(text)
}

/// Extract a verification code from `text`, or an empty string.
pub fn extract_verification_code(text: &str) -> String {
    CODE_PATTERNS
        .iter()
        .filter_map(|regex| regex.captures(text))
        .filter_map(|caps| caps.name("code"))
        .map(|code| {
            code.as_str()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
        })
        .find(|code| !code.is_empty())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("您的验证码是 123456，请勿泄露", "123456")]
    #[case("验证码 9821", "9821")]
    #[case("【某银行】动态码：889 900，5分钟内有效", "889900")]
    #[case("Your CODE: A1B2C3", "A1B2C3")]
    #[case("登录确认（4821）请勿告诉他人", "4821")]
    #[case("【Service】your one-time pin 774411 expires soon", "774411")]
    #[case("Order 12345 shipped", "12345")]
    #[case("Your verification code: 4821", "4821")]
    #[case("Your verification code is 556677. Do not share it.", "556677")]
    #[case("Use code 9034 to sign in", "9034")]
    fn test_extracts_code(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(extract_verification_code(text), expected);
    }

    #[rstest]
    #[case("no digits here")]
    #[case("")]
    #[case("call me at 12")]
    #[case("1234567890")]
    fn test_no_code(#[case] text: &str) {
        assert_eq!(extract_verification_code(text), "");
    }

    #[test]
    fn test_keyword_priority_over_bare_digits() {
        assert_eq!(
            extract_verification_code("2024年 验证码 5566 有效"),
            "5566"
        );
    }

    #[test]
    fn test_code_keyword_detection() {
        assert!(has_code_keyword("您的验证码是 123456"));
        assert!(has_code_keyword("your verification code"));
        assert!(has_code_keyword("Code 1234"));
        assert!(!has_code_keyword("hello world 1234"));
    }
}
