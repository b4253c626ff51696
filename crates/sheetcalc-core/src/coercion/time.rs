//! Time of day and duration texts.
//!
//! Without a designator three shapes are recognised: `h:mm`, `h:mm:ss[.f]`
//! and `mm:ss.f`. A decimal fraction after the second part switches the
//! meaning of the parts from hours/minutes to minutes/seconds, so `20:30` is
//! 20.5 hours and `20:30.0` is 20.5 minutes. Parts may exceed their natural
//! range as long as no two of them do.

use super::date::SECONDS_PER_DAY;
use crate::locale::Locale;

const MAX_PART: u32 = 9999;

pub(crate) fn parse_time(text: &str, locale: &Locale) -> Option<f64> {
    let trimmed = text.trim_matches(' ');
    match strip_designator(trimmed, locale) {
        Some((clock, pm)) => parse_clock(clock, pm, locale),
        None => parse_duration(trimmed, locale),
    }
}

fn parse_duration(text: &str, locale: &Locale) -> Option<f64> {
    let mut cursor = Cursor::new(text);
    cursor.skip_spaces();
    let first = cursor.number()?;
    cursor.skip_spaces();
    if !cursor.eat(locale.time_separator) {
        return None;
    }

    cursor.skip_spaces();
    if cursor.at_end() {
        return Some(days(first, 0, 0, 0));
    }

    let second = cursor.number()?;
    cursor.skip_spaces();
    if cursor.at_end() {
        return (first < 24 || second < 60).then(|| days(first, second, 0, 0));
    }

    if cursor.eat(locale.decimal_separator) {
        cursor.skip_spaces();
        let ms = cursor.fraction_ms();
        cursor.skip_spaces();
        return (cursor.at_end() && (first < 60 || second < 60))
            .then(|| days(0, first, second, ms));
    }

    if !cursor.eat(locale.time_separator) {
        return None;
    }
    cursor.skip_spaces();
    if cursor.at_end() {
        return (first < 24 || second < 60).then(|| days(first, second, 0, 0));
    }

    let third = cursor.number()?;
    let over = [first >= 24, second >= 60, third >= 60];
    if over.iter().filter(|o| **o).count() > 1 {
        return None;
    }

    cursor.skip_spaces();
    if cursor.at_end() {
        return Some(days(first, second, third, 0));
    }
    if !cursor.eat(locale.decimal_separator) {
        return None;
    }
    cursor.skip_spaces();
    let ms = cursor.fraction_ms();
    cursor.skip_spaces();
    cursor.at_end().then(|| days(first, second, third, ms))
}

/// `h[:mm[:ss[.f]]]` followed by an AM/PM designator, hours are 0-12
fn parse_clock(text: &str, pm: bool, locale: &Locale) -> Option<f64> {
    let mut cursor = Cursor::new(text);
    let hours = cursor.number()?;
    let mut minutes = 0;
    let mut seconds = 0;
    let mut ms = 0;

    cursor.skip_spaces();
    if cursor.eat(locale.time_separator) {
        cursor.skip_spaces();
        minutes = cursor.number()?;
        cursor.skip_spaces();
        if cursor.eat(locale.time_separator) {
            cursor.skip_spaces();
            seconds = cursor.number()?;
            cursor.skip_spaces();
            if cursor.eat(locale.decimal_separator) {
                ms = cursor.fraction_ms();
                cursor.skip_spaces();
            }
        }
    }

    if !cursor.at_end() || hours > 12 || minutes >= 60 || seconds >= 60 {
        return None;
    }
    let hours = hours % 12 + if pm { 12 } else { 0 };
    Some(days(hours, minutes, seconds, ms))
}

/// Split a trailing AM/PM designator, the flag is true for PM
fn strip_designator<'a>(text: &'a str, locale: &Locale) -> Option<(&'a str, bool)> {
    [(locale.am_designator, false), (locale.pm_designator, true)]
        .into_iter()
        .find_map(|(designator, pm)| {
            let split = text.len().checked_sub(designator.len())?;
            let (clock, suffix) = (text.get(..split)?, text.get(split..)?);
            let clock = clock.trim_end_matches(' ');
            (suffix.to_lowercase() == designator.to_lowercase() && !clock.is_empty())
                .then_some((clock, pm))
        })
}

fn days(hours: u32, minutes: u32, seconds: u32, ms: u32) -> f64 {
    let seconds = f64::from(hours) * 3600.0 + f64::from(minutes) * 60.0 + f64::from(seconds);
    (seconds + f64::from(ms) / 1000.0) / SECONDS_PER_DAY
}

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Cursor { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos == self.text.len()
    }

    fn skip_spaces(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start_matches(' ').len();
    }

    fn eat(&mut self, c: char) -> bool {
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn digits(&mut self) -> &'a str {
        let rest = self.rest();
        let len = rest.bytes().take_while(u8::is_ascii_digit).count();
        self.pos += len;
        &rest[..len]
    }

    /// A part of at most 9999. Parts with more than two digits can't start with 0.
    fn number(&mut self) -> Option<u32> {
        let digits = self.digits();
        if digits.is_empty() || (digits.starts_with('0') && digits.len() > 2) {
            return None;
        }
        digits.parse().ok().filter(|n| *n <= MAX_PART)
    }

    /// Decimal fraction of a second rounded to milliseconds, no digits is 0
    fn fraction_ms(&mut self) -> u32 {
        let digits = self.digits();
        if digits.is_empty() {
            return 0;
        }
        let value: f64 = digits.parse().unwrap_or(0.0);
        let exponent = i32::try_from(digits.len()).unwrap_or(i32::MAX) - 3;
        (value / 10f64.powi(exponent)).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_changes_meaning_of_parts() {
        let en = Locale::en_us();
        let hours = parse_time("20:30", &en).unwrap();
        let minutes = parse_time("20:30.0", &en).unwrap();
        assert!((hours - 0.854166667).abs() < 1e-6);
        assert!((minutes - 0.014236111).abs() < 1e-6);
    }

    #[test]
    fn test_decimal_point_may_be_padded() {
        let en = Locale::en_us();
        assert!(parse_time("10:20 . 5", &en).is_some());
        assert!(parse_time("10:20.", &en).is_some());
        assert_eq!(parse_time("10:20:30x", &en), None);
    }

    #[test]
    fn test_designator_needs_clock() {
        let en = Locale::en_us();
        assert_eq!(parse_time("PM", &en), None);
        assert_eq!(parse_time("1:00 XM", &en), None);
    }
}
