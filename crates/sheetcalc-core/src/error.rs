use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Represents possible formula errors (Excel-compatible)
///
/// The declaration order is the order Excel uses when errors are compared
/// (e.g. by `COUNTIF(A1:A5, "<#N/A")`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum XlError {
    /// #NULL! - Intersection of two references is empty
    NullValue,
    /// #DIV/0! - Division by zero
    DivisionByZero,
    /// #VALUE! - Value has the wrong type or shape
    IncompatibleValue,
    /// #REF! - Reference to a cell that doesn't exist
    CellReference,
    /// #NAME? - Unrecognized function or name
    NameNotRecognized,
    /// #NUM! - Invalid numeric value
    NumberInvalid,
    /// #N/A - Value not available
    NoValueAvailable,
}

impl XlError {
    /// `#VALUE!` produced when a reference can't be used as a value.
    /// It is the same error as [`XlError::IncompatibleValue`].
    pub const CELL_VALUE: XlError = XlError::IncompatibleValue;

    pub const ALL: [XlError; 7] = [
        XlError::NullValue,
        XlError::DivisionByZero,
        XlError::IncompatibleValue,
        XlError::CellReference,
        XlError::NameNotRecognized,
        XlError::NumberInvalid,
        XlError::NoValueAvailable,
    ];

    /// The literal used in formulas and cell text
    pub fn literal(&self) -> &'static str {
        match self {
            XlError::NullValue => "#NULL!",
            XlError::DivisionByZero => "#DIV/0!",
            XlError::IncompatibleValue => "#VALUE!",
            XlError::CellReference => "#REF!",
            XlError::NameNotRecognized => "#NAME?",
            XlError::NumberInvalid => "#NUM!",
            XlError::NoValueAvailable => "#N/A",
        }
    }
}

impl fmt::Display for XlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.literal())
    }
}

impl FromStr for XlError {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        XlError::ALL
            .into_iter()
            .find(|e| e.literal().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::UnknownErrorLiteral(s.to_string()))
    }
}

/// Errors of the data model itself (not formula values)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unknown error literal: {0}")]
    UnknownErrorLiteral(String),

    #[error("Invalid cell reference: {0}")]
    InvalidReference(String),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Invalid sheet name: {0:?}")]
    InvalidSheetName(String),

    #[error("Sheet already exists: {0}")]
    DuplicateSheet(String),

    #[error("Unknown locale: {0}")]
    UnknownLocale(String),

    #[error("Array must have at least one element and rows of equal width")]
    MalformedArray,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals_round_trip_case_insensitive() {
        assert_eq!("#div/0!".parse::<XlError>(), Ok(XlError::DivisionByZero));
        assert_eq!("#N/A".parse::<XlError>(), Ok(XlError::NoValueAvailable));
        assert!("#FOO!".parse::<XlError>().is_err());
        assert_eq!(XlError::NameNotRecognized.to_string(), "#NAME?");
    }

    #[test]
    fn test_error_order() {
        assert!(XlError::NullValue < XlError::DivisionByZero);
        assert!(XlError::DivisionByZero < XlError::CELL_VALUE);
        assert!(XlError::CellReference < XlError::NameNotRecognized);
        assert!(XlError::NumberInvalid < XlError::NoValueAvailable);
    }
}
