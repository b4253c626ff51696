//! Spreadsheet wildcard patterns: `*` matches any run of characters, `?`
//! exactly one character and `~` escapes the next character.

use regex::Regex;

/// Longest pattern that can match anything
pub const MAX_PATTERN_LEN: usize = 255;

/// A compiled, case-insensitive wildcard pattern
#[derive(Debug, Clone)]
pub struct Wildcard {
    /// Anchored on both ends, `None` when the pattern can never match
    whole: Option<Regex>,
}

impl Wildcard {
    pub fn new(pattern: &str) -> Self {
        let whole = (pattern.chars().count() <= MAX_PATTERN_LEN)
            .then(|| translate(pattern))
            .and_then(|body| Regex::new(&format!("(?is)^{}$", body)).ok());
        Wildcard { whole }
    }

    /// Does the pattern match the whole text?
    pub fn matches(&self, text: &str) -> bool {
        self.whole.as_ref().is_some_and(|regex| regex.is_match(text))
    }
}

/// Translate a wildcard pattern into regex syntax
fn translate(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() * 2);
    let mut chars = pattern.chars();
    let mut literal = [0u8; 4];

    while let Some(c) = chars.next() {
        match c {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            // A lone trailing tilde is dropped
            '~' => {
                if let Some(escaped) = chars.next() {
                    regex.push_str(&regex::escape(escaped.encode_utf8(&mut literal)));
                }
            }
            _ => regex.push_str(&regex::escape(c.encode_utf8(&mut literal))),
        }
    }
    regex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_patterns_ignore_case() {
        assert!(Wildcard::new("abc").matches("ABC"));
        assert!(!Wildcard::new("ab").matches("abc"));
        assert!(Wildcard::new("").matches(""));
        assert!(Wildcard::new("a.c").matches("A.C"));
        assert!(!Wildcard::new("a.c").matches("abc"));
    }

    #[test]
    fn test_question_mark_is_one_character() {
        let pattern = Wildcard::new("?");
        assert!(pattern.matches("a"));
        assert!(pattern.matches("1"));
        assert!(!pattern.matches("ab"));
        assert!(!pattern.matches(""));
        assert!(Wildcard::new("a?").matches("ab"));
        assert!(Wildcard::new("??").matches("čř"));
    }

    #[test]
    fn test_star_is_any_run() {
        let pattern = Wildcard::new("a*c");
        assert!(pattern.matches("ac"));
        assert!(pattern.matches("abbbc"));
        assert!(!pattern.matches("abcd"));
        assert!(Wildcard::new("*").matches(""));
        assert!(Wildcard::new("**a**").matches("bab"));
        assert!(Wildcard::new("*\n*").matches("line\nbreak"));
    }

    #[test]
    fn test_tilde_escapes() {
        assert!(Wildcard::new("~*").matches("*"));
        assert!(!Wildcard::new("~*").matches("a"));
        assert!(Wildcard::new("what~?").matches("what?"));
        assert!(!Wildcard::new("what~?").matches("whats"));
        assert!(Wildcard::new("~~").matches("~"));
        assert!(Wildcard::new("ab~").matches("ab"));
    }

    #[test]
    fn test_long_patterns_never_match() {
        let long = "a".repeat(MAX_PATTERN_LEN + 1);
        assert!(!Wildcard::new(&long).matches(&long));
        let limit = "a".repeat(MAX_PATTERN_LEN);
        assert!(Wildcard::new(&limit).matches(&limit));
    }
}
