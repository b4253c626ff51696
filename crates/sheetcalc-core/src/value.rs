use serde::{Deserialize, Serialize};

use crate::array::Array;
use crate::cell::Scalar;
use crate::error::XlError;
use crate::reference::Reference;

/// Result of evaluating any formula expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum AnyValue {
    Scalar(Scalar),
    Array(Array),
    Reference(Reference),
}

impl AnyValue {
    pub fn error(error: XlError) -> Self {
        AnyValue::Scalar(Scalar::Error(error))
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            AnyValue::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            AnyValue::Reference(reference) => Some(reference),
            _ => None,
        }
    }
}

impl Default for AnyValue {
    fn default() -> Self {
        AnyValue::Scalar(Scalar::Blank)
    }
}

impl From<Scalar> for AnyValue {
    fn from(value: Scalar) -> Self {
        AnyValue::Scalar(value)
    }
}

impl From<Array> for AnyValue {
    fn from(value: Array) -> Self {
        AnyValue::Array(value)
    }
}

impl From<Reference> for AnyValue {
    fn from(value: Reference) -> Self {
        AnyValue::Reference(value)
    }
}

impl From<XlError> for AnyValue {
    fn from(value: XlError) -> Self {
        AnyValue::error(value)
    }
}

impl From<f64> for AnyValue {
    fn from(value: f64) -> Self {
        AnyValue::Scalar(Scalar::Number(value))
    }
}

impl From<bool> for AnyValue {
    fn from(value: bool) -> Self {
        AnyValue::Scalar(Scalar::Logical(value))
    }
}

impl From<Result<Scalar, XlError>> for AnyValue {
    fn from(value: Result<Scalar, XlError>) -> Self {
        AnyValue::Scalar(value.unwrap_or_else(Scalar::Error))
    }
}
