//! Culture settings used when text is converted to numbers, numbers are
//! rendered as text and text values are ordered.

use std::cmp::Ordering;
use std::str::FromStr;
use unicode_normalization::UnicodeNormalization as _;

use crate::error::CoreError;

/// Order of day, month and year components in a date literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    MonthDayYear,
    DayMonthYear,
    YearMonthDay,
}

/// Where the currency symbol is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencyPosition {
    Prefix,
    Suffix,
}

/// Text ordering rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collation {
    /// Letters ordered by their base letter, accents break ties
    Root,
    /// "ch" is a letter between "h" and "i"; č, ř, š, ž follow their base letter
    Czech,
}

const ENGLISH_MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const CZECH_MONTHS: [&str; 12] = [
    "leden", "únor", "březen", "duben", "květen", "červen", "červenec", "srpen", "září",
    "říjen", "listopad", "prosinec",
];

const GERMAN_MONTHS: [&str; 12] = [
    "Januar",
    "Februar",
    "März",
    "April",
    "Mai",
    "Juni",
    "Juli",
    "August",
    "September",
    "Oktober",
    "November",
    "Dezember",
];

/// A culture, only the parts the formula engine needs
#[derive(Debug, Clone, PartialEq)]
pub struct Locale {
    pub tag: &'static str,
    pub decimal_separator: char,
    pub group_separator: char,
    pub list_separator: char,
    pub currency_symbol: &'static str,
    pub currency_position: CurrencyPosition,
    pub date_order: DateOrder,
    pub date_separator: char,
    pub time_separator: char,
    pub am_designator: &'static str,
    pub pm_designator: &'static str,
    pub month_names: &'static [&'static str; 12],
    pub collation: Collation,
}

impl Default for Locale {
    fn default() -> Self {
        Locale::en_us()
    }
}

impl Locale {
    pub fn en_us() -> Self {
        Locale {
            tag: "en-US",
            decimal_separator: '.',
            group_separator: ',',
            list_separator: ',',
            currency_symbol: "$",
            currency_position: CurrencyPosition::Prefix,
            date_order: DateOrder::MonthDayYear,
            date_separator: '/',
            time_separator: ':',
            am_designator: "AM",
            pm_designator: "PM",
            month_names: &ENGLISH_MONTHS,
            collation: Collation::Root,
        }
    }

    pub fn en_gb() -> Self {
        Locale {
            tag: "en-GB",
            currency_symbol: "£",
            date_order: DateOrder::DayMonthYear,
            ..Locale::en_us()
        }
    }

    pub fn cs_cz() -> Self {
        Locale {
            tag: "cs-CZ",
            decimal_separator: ',',
            group_separator: '\u{a0}',
            list_separator: ';',
            currency_symbol: "Kč",
            currency_position: CurrencyPosition::Suffix,
            date_order: DateOrder::DayMonthYear,
            date_separator: '.',
            time_separator: ':',
            am_designator: "dop.",
            pm_designator: "odp.",
            month_names: &CZECH_MONTHS,
            collation: Collation::Czech,
        }
    }

    pub fn de_de() -> Self {
        Locale {
            tag: "de-DE",
            decimal_separator: ',',
            group_separator: '.',
            list_separator: ';',
            currency_symbol: "€",
            currency_position: CurrencyPosition::Suffix,
            date_order: DateOrder::DayMonthYear,
            date_separator: '.',
            time_separator: ':',
            am_designator: "AM",
            pm_designator: "PM",
            month_names: &GERMAN_MONTHS,
            collation: Collation::Root,
        }
    }

    /// Whether `c` separates digit groups. A locale grouping with a no-break
    /// space also accepts a plain space, that's what users type.
    pub fn is_group_separator(&self, c: char) -> bool {
        c == self.group_separator || (self.group_separator == '\u{a0}' && c == ' ')
    }

    /// Month number (1-12) of a full month name or of an unambiguous prefix
    /// with at least three letters.
    pub fn month_from_name(&self, text: &str) -> Option<u32> {
        let text = text.to_lowercase();
        let names = self.month_names.iter().map(|m| m.to_lowercase());

        if let Some(index) = names.clone().position(|m| m == text) {
            return Some(index as u32 + 1);
        }

        if text.chars().count() < 3 {
            return None;
        }
        let mut candidates = names
            .enumerate()
            .filter(|(_, m)| m.starts_with(&text));
        match (candidates.next(), candidates.next()) {
            (Some((index, _)), None) => Some(index as u32 + 1),
            _ => None,
        }
    }

    /// Case-insensitive, accent-aware ordering of two texts
    pub fn compare_text(&self, a: &str, b: &str) -> Ordering {
        let (a_primary, a_secondary) = self.collation_keys(a);
        let (b_primary, b_secondary) = self.collation_keys(b);
        a_primary
            .cmp(&b_primary)
            .then_with(|| a_secondary.cmp(&b_secondary))
    }

    /// Texts are equal when they only differ in letter case
    pub fn text_eq(&self, a: &str, b: &str) -> bool {
        self.compare_text(a, b) == Ordering::Equal
    }

    fn collation_keys(&self, text: &str) -> (Vec<u32>, String) {
        let lower = text.to_lowercase();
        let mut primary = Vec::with_capacity(lower.len());
        let mut chars = lower.chars().peekable();

        while let Some(c) = chars.next() {
            if self.collation == Collation::Czech {
                if c == 'c' && chars.peek() == Some(&'h') {
                    chars.next();
                    primary.push(letter_key('h') + 2);
                    continue;
                }
                if let Some(base) = czech_letter(c) {
                    primary.push(letter_key(base) + 2);
                    continue;
                }
            }

            if let Some(base) = c.to_string().nfd().find(|d| !is_combining_mark(*d)) {
                primary.push(letter_key(base));
            }
        }

        (primary, lower)
    }

    /// Render a number the way the "General" format does: integers without
    /// decimals, otherwise up to 15 significant digits.
    pub fn format_number(&self, n: f64) -> String {
        let text = format_general(n);
        if self.decimal_separator == '.' {
            text
        } else {
            text.replace('.', &self.decimal_separator.to_string())
        }
    }
}

impl FromStr for Locale {
    type Err = CoreError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        [Locale::en_us(), Locale::en_gb(), Locale::cs_cz(), Locale::de_de()]
            .into_iter()
            .find(|locale| locale.tag.eq_ignore_ascii_case(tag))
            .ok_or_else(|| CoreError::UnknownLocale(tag.to_string()))
    }
}

fn letter_key(c: char) -> u32 {
    c as u32 * 4
}

fn czech_letter(c: char) -> Option<char> {
    match c {
        'č' => Some('c'),
        'ř' => Some('r'),
        'š' => Some('s'),
        'ž' => Some('z'),
        _ => None,
    }
}

fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF)
}

fn format_general(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }

    // 15 significant digits, mantissa is "d.dddddddddddddd"
    let scientific = format!("{:.14e}", n);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let negative = mantissa.starts_with('-');
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let digits = digits.trim_end_matches('0');
    let digits = if digits.is_empty() { "0" } else { digits };
    let sign = if negative { "-" } else { "" };

    if !(-10..15).contains(&exponent) {
        let (first, rest) = digits.split_at(1);
        let mantissa = if rest.is_empty() {
            first.to_string()
        } else {
            format!("{}.{}", first, rest)
        };
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        return format!("{}{}E{}{:02}", sign, mantissa, exp_sign, exponent.abs());
    }

    if exponent < 0 {
        let zeros = "0".repeat((-exponent - 1) as usize);
        return format!("{}0.{}{}", sign, zeros, digits);
    }

    let int_len = exponent as usize + 1;
    if digits.len() <= int_len {
        format!("{}{}{}", sign, digits, "0".repeat(int_len - digits.len()))
    } else {
        format!("{}{}.{}", sign, &digits[..int_len], &digits[int_len..])
    }
}
