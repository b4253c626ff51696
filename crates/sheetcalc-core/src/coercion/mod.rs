//! Text to number coercion.
//!
//! A text is tried, in order, as a plain number (with grouping, percent,
//! parentheses, currency and exponent), a fraction, a time and a date with
//! an optional time. The first format that accepts the whole text wins.

mod date;
mod fraction;
mod number;
mod time;

use crate::error::XlError;
use crate::locale::Locale;

pub use date::{serial_from_ymd, SECONDS_PER_DAY};

/// Convert text to a number, `#VALUE!` when no format accepts the text
pub fn text_to_number(text: &str, locale: &Locale) -> Result<f64, XlError> {
    let value = number::parse_number(text, locale)
        .or_else(|| fraction::parse_fraction(text))
        .or_else(|| time::parse_time(text, locale))
        .or_else(|| date::parse_date_time(text, locale))
        .ok_or(XlError::IncompatibleValue)?;

    if value.is_finite() {
        // -0 is 0
        Ok(value + 0.0)
    } else {
        Err(XlError::NumberInvalid)
    }
}
