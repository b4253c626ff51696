//! Selection criteria of the conditional aggregates (`COUNTIF`, `SUMIF`, ...).
//!
//! A criteria text is an optional comparison prefix followed by an operand
//! that is interpreted like text typed into a cell. The operand type decides
//! which candidate values can match: a number only matches numbers (and text
//! that converts to one), a logical only logicals, an error only errors and a
//! text only texts. Under `<>` a candidate of another type always matches.

use std::cmp::Ordering;

use sheetcalc_core::{text_to_number, Locale, Scalar, XlError};

use crate::wildcard::Wildcard;

/// Prefixes in the order they are tried, longer ones first
const COMPARISONS: [(&str, Comparison); 6] = [
    ("<>", Comparison::NotEqual),
    (">=", Comparison::GreaterOrEqual),
    ("<=", Comparison::LessOrEqual),
    ("=", Comparison::Equal),
    (">", Comparison::GreaterThan),
    ("<", Comparison::LessThan),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
}

impl Comparison {
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Comparison::Equal => ordering == Ordering::Equal,
            Comparison::NotEqual => ordering != Ordering::Equal,
            Comparison::LessThan => ordering == Ordering::Less,
            Comparison::LessOrEqual => ordering != Ordering::Greater,
            Comparison::GreaterThan => ordering == Ordering::Greater,
            Comparison::GreaterOrEqual => ordering != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone)]
enum Operand {
    Blank,
    Logical(bool),
    Number(f64),
    Text(String, Wildcard),
    Error(XlError),
}

/// A parsed condition, matched against cell values
#[derive(Debug, Clone)]
pub struct Criteria {
    comparison: Comparison,
    operand: Operand,
    locale: Locale,
}

impl Criteria {
    /// Parse a criteria text. The comparison must start at the first character.
    pub fn new(text: &str, locale: &Locale) -> Self {
        let (comparison, rest) = COMPARISONS
            .iter()
            .find_map(|(prefix, comparison)| text.strip_prefix(prefix).map(|rest| (*comparison, rest)))
            .unwrap_or((Comparison::Equal, text));

        let operand = match Scalar::from_text(rest, locale) {
            // An empty criteria is the number zero, a bare comparison is blank
            Scalar::Blank if text.is_empty() => Operand::Number(0.0),
            Scalar::Blank => Operand::Blank,
            Scalar::Logical(b) => Operand::Logical(b),
            Scalar::Number(n) => Operand::Number(n),
            Scalar::Text(s) => {
                let pattern = Wildcard::new(&s);
                Operand::Text(s, pattern)
            }
            Scalar::Error(e) => Operand::Error(e),
        };

        Criteria {
            comparison,
            operand,
            locale: locale.clone(),
        }
    }

    /// Criteria given as a value rather than text: `COUNTIF(A1:A5, 5)`
    pub fn from_value(value: &Scalar, locale: &Locale) -> Self {
        match value {
            Scalar::Blank => Criteria::new("", locale),
            Scalar::Text(text) => Criteria::new(text, locale),
            Scalar::Number(n) => Criteria {
                comparison: Comparison::Equal,
                operand: Operand::Number(*n),
                locale: locale.clone(),
            },
            Scalar::Logical(b) => Criteria {
                comparison: Comparison::Equal,
                operand: Operand::Logical(*b),
                locale: locale.clone(),
            },
            Scalar::Error(e) => Criteria {
                comparison: Comparison::Equal,
                operand: Operand::Error(*e),
                locale: locale.clone(),
            },
        }
    }

    pub fn comparison(&self) -> Comparison {
        self.comparison
    }

    /// Does the value satisfy the criteria?
    pub fn matches(&self, value: &Scalar) -> bool {
        match &self.operand {
            Operand::Blank => self.match_blank(value),
            Operand::Logical(expected) => match value {
                Scalar::Logical(actual) => self.comparison.accepts(actual.cmp(expected)),
                _ => self.mismatched_type(),
            },
            Operand::Number(expected) => match self.candidate_number(value) {
                Some(actual) => self.comparison.accepts(actual.total_cmp(expected)),
                None => self.mismatched_type(),
            },
            Operand::Text(expected, pattern) => match value {
                Scalar::Text(actual) => self.match_text(actual, expected, pattern),
                _ => self.mismatched_type(),
            },
            Operand::Error(expected) => match value {
                Scalar::Error(actual) => self.comparison.accepts(actual.cmp(expected)),
                _ => self.mismatched_type(),
            },
        }
    }

    fn match_blank(&self, value: &Scalar) -> bool {
        if value.is_blank() {
            // Ordering against a blank is never true
            self.comparison == Comparison::Equal
        } else {
            self.comparison == Comparison::NotEqual
        }
    }

    fn mismatched_type(&self) -> bool {
        self.comparison == Comparison::NotEqual
    }

    fn candidate_number(&self, value: &Scalar) -> Option<f64> {
        match value {
            Scalar::Number(n) => Some(*n),
            Scalar::Text(text) => text_to_number(text, &self.locale).ok(),
            _ => None,
        }
    }

    fn match_text(&self, actual: &str, expected: &str, pattern: &Wildcard) -> bool {
        match self.comparison {
            Comparison::Equal => pattern.matches(actual),
            Comparison::NotEqual => !pattern.matches(actual),
            ordering => ordering.accepts(self.locale.compare_text(actual, expected)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Czech uses ',' as a decimal separator and orders "ch" after "h"
    fn check(criteria: &str, value: impl Into<Scalar>, expected: bool) {
        let locale = Locale::cs_cz();
        let value = value.into();
        assert_eq!(
            Criteria::new(criteria, &locale).matches(&value),
            expected,
            "criteria {criteria:?} on {value:?}"
        );
    }

    #[test]
    fn test_empty_criteria_is_zero() {
        check("", 0.0, true);
        check("", "0 0/2", true);
        check("", Scalar::Blank, false);
        check("", "", false);
        check(" ", 0.0, false);
        check(" ", " ", true);
    }

    #[test]
    fn test_bare_comparison_is_blank() {
        check("=", Scalar::Blank, true);
        check("=", 0.0, false);
        check("=", "", false);

        check("<>", Scalar::Blank, false);
        check("<>", 0.0, true);
        check("<>", "", true);

        for cmp in ["<", "<=", ">=", ">"] {
            check(cmp, Scalar::Blank, false);
            check(cmp, 0.0, false);
            check(cmp, "0 0/2", false);
            check(cmp, "", false);
        }
    }

    #[test]
    fn test_logical_operand() {
        for eq in ["", "="] {
            check(&format!("{eq}TRUE"), true, true);
            check(&format!("{eq}true"), true, true);
            check(&format!("{eq}TRUE"), "TRUE", false);
            check(&format!("{eq}TRUE"), 1.0, false);
            check(&format!("{eq}FALSE"), false, true);
            check(&format!("{eq}FALSE"), 0.0, false);
            check(&format!("{eq}FALSE"), Scalar::Blank, false);
        }

        check("<>TRUE", false, true);
        check("<>TRUE", 1.0, true);
        check("<>TRUE", "Text", true);
        check("<>TRUE", XlError::DivisionByZero, true);
        check("<>TRUE", true, false);

        check(">FALSE", true, true);
        check(">FALSE", false, false);
        check(">TRUE", true, false);
        check("<=FALSE", false, true);
        check("<=FALSE", true, false);
        check("<TRUE", false, true);
    }

    #[test]
    fn test_number_operand_converts_text() {
        for eq in ["", "="] {
            check(&format!("{eq}1"), 1.0, true);
            check(&format!("{eq},5"), 0.5, true);
            check(&format!("{eq}36:00"), "1 1/2", true);
            check(&format!("{eq}1,5"), "text", false);
            check(&format!("{eq}1"), true, false);
            check(&format!("{eq}1"), Scalar::Blank, false);
            check(&format!("{eq}1"), XlError::NullValue, false);
        }

        check("<>1", 0.9, true);
        check("<>1", 1.0, false);
        check("<>,5", "0 1/2", false);
        check("<>1", Scalar::Blank, true);
        check("<>1", true, true);
        check("<>1", "text", true);

        check("<1", 1.0, false);
        check("<=1", 1.0, true);
        check("<1", false, false);
        check("<0,5", "0,4", true);
        check("<24:00", "0 1/2", true);
        check("<24:00", "0 3/2", false);

        check(">1", 1.0, false);
        check(">=1", 1.0, true);
        check(">1", 1.1, true);
        check(">1", "", false);
        check(">0", true, false);
    }

    #[test]
    fn test_text_operand_is_wildcard_for_equality() {
        for eq in ["", "="] {
            check(&format!("{eq}abc"), "abc", true);
            check(&format!("{eq}ab"), "abc", false);
            check(&format!("{eq}AbC"), "aBc", true);
            check(&format!("{eq}?"), "a", true);
            check(&format!("{eq}?"), "ab", false);
            check(&format!("{eq}a?"), "ab", true);
            check(&format!("{eq}?"), 1.0, false);
        }

        check("<>?", "a", false);
        check("<>?", "ab", true);
        check("<>?", 1.0, true);
        check("<>?", true, true);
    }

    #[test]
    fn test_text_ordering_uses_collation() {
        check("<a", "a", false);
        check("<=a", "a", true);
        check("<z", "a", true);
        check("<?", "!", true);
        check("<?", "a", false);
        check("<ch", "h", true);
        check("<ch", "i", false);

        check(">a", "b", true);
        check(">?", "a", true);
        check(">ch", "i", true);
        check(">ch", "h", false);
    }

    #[test]
    fn test_error_operand() {
        check("#DIV/0!", XlError::DivisionByZero, true);
        check("=#DIV/0!", "#DIV/0!", false);
        check("#NULL!", 1.0, false);

        check(">#NULL!", XlError::DivisionByZero, true);
        check(">#DIV/0!", XlError::NullValue, false);
        check(">=#NULL!", XlError::NullValue, true);
        check("<=#DIV/0!", XlError::NullValue, true);
        check("<=#NULL!", XlError::DivisionByZero, false);
    }

    #[test]
    fn test_criteria_from_value() {
        let locale = Locale::en_us();
        let five = Criteria::from_value(&Scalar::Number(5.0), &locale);
        assert!(five.matches(&Scalar::Number(5.0)));
        assert!(five.matches(&Scalar::Text("5".into())));
        assert!(!five.matches(&Scalar::Number(6.0)));

        let text = Criteria::from_value(&Scalar::Text(">=b".into()), &locale);
        assert_eq!(text.comparison(), Comparison::GreaterOrEqual);
        assert!(text.matches(&Scalar::Text("C".into())));
    }
}
