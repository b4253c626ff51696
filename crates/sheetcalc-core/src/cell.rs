use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::coercion;
use crate::error::XlError;
use crate::locale::Locale;

/// A single value: what a cell holds and what most operators consume
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Scalar {
    /// Value of a cell that contains nothing
    #[default]
    Blank,
    Logical(bool),
    Number(f64),
    Text(String),
    Error(XlError),
}

impl Scalar {
    pub fn is_blank(&self) -> bool {
        matches!(self, Scalar::Blank)
    }

    pub fn as_error(&self) -> Option<XlError> {
        match self {
            Scalar::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// Interpret text the way a typed cell input is interpreted: blank,
    /// logical, number (any format text coercion accepts), error literal
    /// and finally plain text.
    pub fn from_text(text: &str, locale: &Locale) -> Scalar {
        if text.is_empty() {
            return Scalar::Blank;
        }
        if text.eq_ignore_ascii_case("TRUE") {
            return Scalar::Logical(true);
        }
        if text.eq_ignore_ascii_case("FALSE") {
            return Scalar::Logical(false);
        }
        if let Ok(n) = coercion::text_to_number(text, locale) {
            return Scalar::Number(n);
        }
        if let Ok(e) = text.parse::<XlError>() {
            return Scalar::Error(e);
        }
        Scalar::Text(text.to_string())
    }

    /// Coerce to a number. Text is parsed with the locale, blank is 0.
    pub fn to_number(&self, locale: &Locale) -> Result<f64, XlError> {
        match self {
            Scalar::Blank => Ok(0.0),
            Scalar::Logical(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Scalar::Number(n) => Ok(*n),
            Scalar::Text(s) => coercion::text_to_number(s, locale),
            Scalar::Error(e) => Err(*e),
        }
    }

    /// Coerce to a logical. Only "TRUE"/"FALSE" texts convert.
    pub fn to_logical(&self) -> Result<bool, XlError> {
        match self {
            Scalar::Blank => Ok(false),
            Scalar::Logical(b) => Ok(*b),
            Scalar::Number(n) => Ok(*n != 0.0),
            Scalar::Text(s) if s.eq_ignore_ascii_case("TRUE") => Ok(true),
            Scalar::Text(s) if s.eq_ignore_ascii_case("FALSE") => Ok(false),
            Scalar::Text(_) => Err(XlError::IncompatibleValue),
            Scalar::Error(e) => Err(*e),
        }
    }

    /// Coerce to text, numbers use the locale decimal separator
    pub fn to_text(&self, locale: &Locale) -> Result<String, XlError> {
        match self {
            Scalar::Blank => Ok(String::new()),
            Scalar::Logical(b) => Ok(logical_text(*b).to_string()),
            Scalar::Number(n) => Ok(locale.format_number(*n)),
            Scalar::Text(s) => Ok(s.clone()),
            Scalar::Error(e) => Err(*e),
        }
    }

    /// Rank of a type in cross-type comparisons: Number < Text < Logical
    fn type_rank(&self) -> u8 {
        match self {
            Scalar::Number(_) => 0,
            Scalar::Text(_) => 1,
            Scalar::Logical(_) => 2,
            Scalar::Blank | Scalar::Error(_) => 3,
        }
    }

    /// Order two values the way comparison operators do. Values of different
    /// types order by type, a blank takes the neutral value of the other
    /// side's type. Errors must be handled by the caller.
    pub fn compare(&self, other: &Scalar, locale: &Locale) -> Result<Ordering, XlError> {
        if let Scalar::Error(e) = self {
            return Err(*e);
        }
        if let Scalar::Error(e) = other {
            return Err(*e);
        }

        let ordering = match (self, other) {
            (Scalar::Blank, Scalar::Blank) => Ordering::Equal,
            (Scalar::Blank, other) => neutral_of(other).compare(other, locale)?,
            (this, Scalar::Blank) => this.compare(&neutral_of(this), locale)?,
            (Scalar::Number(a), Scalar::Number(b)) => compare_numbers(*a, *b),
            (Scalar::Text(a), Scalar::Text(b)) => locale.compare_text(a, b),
            (Scalar::Logical(a), Scalar::Logical(b)) => a.cmp(b),
            (a, b) => a.type_rank().cmp(&b.type_rank()),
        };
        Ok(ordering)
    }
}

/// Relative tolerance used when numbers are tested for equality
pub const NUMBER_EPSILON: f64 = 1e-15;

/// Numbers within a relative tolerance are equal
pub fn compare_numbers(a: f64, b: f64) -> Ordering {
    let scale = a.abs().max(b.abs());
    if (a - b).abs() <= scale * NUMBER_EPSILON {
        Ordering::Equal
    } else if a < b {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

fn neutral_of(value: &Scalar) -> Scalar {
    match value {
        Scalar::Number(_) => Scalar::Number(0.0),
        Scalar::Text(_) => Scalar::Text(String::new()),
        Scalar::Logical(_) => Scalar::Logical(false),
        other => other.clone(),
    }
}

fn logical_text(b: bool) -> &'static str {
    if b {
        "TRUE"
    } else {
        "FALSE"
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Blank => Ok(()),
            Scalar::Logical(b) => f.write_str(logical_text(*b)),
            Scalar::Number(n) => f.write_str(&Locale::en_us().format_number(*n)),
            Scalar::Text(s) => f.write_str(s),
            Scalar::Error(e) => write!(f, "{}", e),
        }
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Logical(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<XlError> for Scalar {
    fn from(value: XlError) -> Self {
        Scalar::Error(value)
    }
}

/// The content of a cell - either a constant or a formula
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CellContent {
    #[serde(rename = "Value")]
    Value { value: Scalar },
    #[serde(rename = "Formula")]
    Formula {
        /// Formula text without the leading '=' (e.g., "SUM(A1:A10)")
        expression: String,
        /// Value of the last calculation
        #[serde(rename = "cachedValue", default)]
        cached_value: Scalar,
    },
}

impl Default for CellContent {
    fn default() -> Self {
        CellContent::Value {
            value: Scalar::Blank,
        }
    }
}

impl CellContent {
    pub fn formula(expression: impl Into<String>) -> Self {
        CellContent::Formula {
            expression: expression.into(),
            cached_value: Scalar::Blank,
        }
    }

    /// The value for both constants and formulas
    pub fn value(&self) -> &Scalar {
        match self {
            CellContent::Value { value } => value,
            CellContent::Formula { cached_value, .. } => cached_value,
        }
    }

    pub fn is_formula(&self) -> bool {
        matches!(self, CellContent::Formula { .. })
    }

    pub fn formula_expression(&self) -> Option<&str> {
        match self {
            CellContent::Formula { expression, .. } => Some(expression),
            CellContent::Value { .. } => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellContent::Value { value: Scalar::Blank })
    }
}

/// Parse user input into cell content: "=..." is a formula, anything else a constant
pub fn parse_cell_input(input: &str, locale: &Locale) -> CellContent {
    match input.strip_prefix('=') {
        Some(expression) if !expression.is_empty() => CellContent::formula(expression),
        _ => CellContent::Value {
            value: Scalar::from_text(input, locale),
        },
    }
}
