//! Date texts and serial numbers of the 1900 date system.
//!
//! Serial 1 is 1900-01-01. The system keeps the fictitious 1900-02-29
//! (serial 60), so dates from March 1900 on are one day further than the
//! calendar says.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

use super::time;
use crate::locale::{DateOrder, Locale};

pub const SECONDS_PER_DAY: f64 = 86_400.0;

const LEAP_BUG_SERIAL: f64 = 60.0;
const MAX_YEAR: i32 = 9999;

/// `m/d/y` in any component order, the separators must match
fn numeric_date() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{1,4})\s*([/.\-])\s*(\d{1,2})\s*([/.\-])\s*(\d{1,4})\.?$").ok()
    })
    .as_ref()
}

/// `d-Mon-yyyy` or `Mon d, yyyy`
fn named_month_date() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:(\d{1,2})[\s\-./]*(\p{L}+)\.?|(\p{L}+)\.?[\s\-./]*(\d{1,2}))[\s\-./,]+(\d{2}|\d{4})$",
        )
        .ok()
    })
    .as_ref()
}

/// Serial number of a calendar date, `None` for dates the system can't represent.
/// Day 0 of January 1900 is serial 0 and 1900-02-29 is serial 60.
pub fn serial_from_ymd(year: i32, month: u32, day: u32) -> Option<f64> {
    if year == 1900 && month == 1 && day == 0 {
        return Some(0.0);
    }
    if year == 1900 && month == 2 && day == 29 {
        return Some(LEAP_BUG_SERIAL);
    }
    if !(1900..=MAX_YEAR).contains(&year) {
        return None;
    }

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let leap_bug_start = NaiveDate::from_ymd_opt(1900, 3, 1)?;
    let epoch = if date < leap_bug_start {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    Some(date.signed_duration_since(epoch).num_days() as f64)
}

/// A date optionally followed by a time, the time is added to the date serial
pub(crate) fn parse_date_time(text: &str, locale: &Locale) -> Option<f64> {
    let text = text.trim();
    if let Some(serial) = parse_date(text, locale) {
        return Some(serial);
    }

    text.match_indices(' ').find_map(|(index, _)| {
        let date = parse_date(text[..index].trim_end(), locale)?;
        let time = time::parse_time(&text[index + 1..], locale)?;
        Some(date + time)
    })
}

fn parse_date(text: &str, locale: &Locale) -> Option<f64> {
    if let Some(captures) = numeric_date()?.captures(text) {
        if captures[2] != captures[4] {
            return None;
        }
        let parts = [&captures[1], &captures[3], &captures[5]];
        return numeric_parts(parts, locale);
    }

    let captures = named_month_date()?.captures(text)?;
    let (day, month) = match (captures.get(1), captures.get(2)) {
        (Some(day), Some(month)) => (day.as_str(), month.as_str()),
        _ => (captures.get(4)?.as_str(), captures.get(3)?.as_str()),
    };
    let month = locale.month_from_name(month)?;
    let year = year_from_text(&captures[5])?;
    serial_from_ymd(year, month, day.parse().ok()?)
}

fn numeric_parts(parts: [&str; 3], locale: &Locale) -> Option<f64> {
    // A four digit leading part is always a year (ISO order)
    if parts[0].len() == 4 {
        let year = year_from_text(parts[0])?;
        return serial_from_ymd(year, parts[1].parse().ok()?, parts[2].parse().ok()?);
    }
    if parts[1].len() > 2 {
        return None;
    }

    let (day, month, year) = match locale.date_order {
        DateOrder::MonthDayYear => (parts[1], parts[0], parts[2]),
        DateOrder::DayMonthYear => (parts[0], parts[1], parts[2]),
        DateOrder::YearMonthDay => (parts[2], parts[1], parts[0]),
    };
    serial_from_ymd(
        year_from_text(year)?,
        month.parse().ok()?,
        day.parse().ok()?,
    )
}

/// Two digit years belong to the 1900s
fn year_from_text(text: &str) -> Option<i32> {
    let year: i32 = text.parse().ok()?;
    match text.len() {
        1 | 2 => Some(1900 + year),
        4 => Some(year),
        _ => None,
    }
}
