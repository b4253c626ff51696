use sheetcalc_core::{BookPoint, CoreError};
use std::fmt;
use thiserror::Error;

/// Language features that parse but cannot be evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    ThreeDReference,
    ExternalReference,
    Dde,
    SpillOperator,
    ArrayConstantIntersection,
    StructuredReference,
    LargeArray,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Feature::ThreeDReference => "3-D references",
            Feature::ExternalReference => "references to other workbooks",
            Feature::Dde => "dynamic data exchange",
            Feature::SpillOperator => "the spill operator",
            Feature::ArrayConstantIntersection => "implicit intersection of array constants",
            Feature::StructuredReference => "structured references",
            Feature::LargeArray => "arrays with more than 4194304 elements",
        };
        f.write_str(text)
    }
}

/// Formula text that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at position {}", self.message, self.position)
    }
}

impl std::error::Error for ParseError {}

/// Failures the formula language itself cannot express as a value
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    #[error("Formula in {cell} is part of a circular reference")]
    CircularReference { cell: BookPoint },

    #[error("Evaluation of {0} is not supported")]
    Unsupported(Feature),

    #[error("Array constant rows must have the same number of elements")]
    MalformedArray,

    #[error("Book point {0} is not in the calculation chain")]
    PointNotInChain(BookPoint),

    #[error("Parse error: {0}")]
    Parse(ParseError),

    #[error("Unknown sheet: {0}")]
    UnknownSheet(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    /// Control signal: a precedent still waits for calculation
    #[error("Precedent {0} has not been calculated yet")]
    PrecedentNotCalculated(BookPoint),
}

impl CalcError {
    pub fn is_circular(&self) -> bool {
        matches!(self, CalcError::CircularReference { .. })
    }
}

impl From<ParseError> for CalcError {
    fn from(error: ParseError) -> Self {
        CalcError::Parse(error)
    }
}

pub type CalcResult<T> = Result<T, CalcError>;
