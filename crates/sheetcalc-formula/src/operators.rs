//! Value operators applied to a pair of scalars. Shapes (arrays, references)
//! are handled by the evaluator, which calls these per element.

use std::cmp::Ordering;

use sheetcalc_core::{Locale, Scalar, XlError};

use crate::ast::{BinaryOp, UnaryOp};

/// A number result, `#NUM!` when it overflowed or is not a number
pub fn number_result(value: f64) -> Scalar {
    if value.is_finite() {
        Scalar::Number(value)
    } else {
        Scalar::Error(XlError::NumberInvalid)
    }
}

/// Both operands as numbers. The left error wins over the right one.
fn numbers(left: &Scalar, right: &Scalar, locale: &Locale) -> Result<(f64, f64), XlError> {
    if let Some(error) = left.as_error().or_else(|| right.as_error()) {
        return Err(error);
    }
    Ok((left.to_number(locale)?, right.to_number(locale)?))
}

pub fn power(base: f64, exponent: f64) -> Scalar {
    if base == 0.0 {
        if exponent == 0.0 {
            return Scalar::Error(XlError::NumberInvalid);
        }
        if exponent < 0.0 {
            return Scalar::Error(XlError::DivisionByZero);
        }
    }
    number_result(base.powf(exponent))
}

fn arithmetic(op: BinaryOp, left: &Scalar, right: &Scalar, locale: &Locale) -> Scalar {
    let (a, b) = match numbers(left, right, locale) {
        Ok(pair) => pair,
        Err(error) => return Scalar::Error(error),
    };

    match op {
        BinaryOp::Add => number_result(a + b),
        BinaryOp::Sub => number_result(a - b),
        BinaryOp::Mul => number_result(a * b),
        BinaryOp::Div if b == 0.0 => Scalar::Error(XlError::DivisionByZero),
        BinaryOp::Div => number_result(a / b),
        BinaryOp::Pow => power(a, b),
        _ => Scalar::Error(XlError::IncompatibleValue),
    }
}

fn concat(left: &Scalar, right: &Scalar, locale: &Locale) -> Scalar {
    let joined = left
        .to_text(locale)
        .and_then(|l| right.to_text(locale).map(|r| l + &r));
    match joined {
        Ok(text) => Scalar::Text(text),
        Err(error) => Scalar::Error(error),
    }
}

fn comparison(op: BinaryOp, left: &Scalar, right: &Scalar, locale: &Locale) -> Scalar {
    let ordering = match left.compare(right, locale) {
        Ok(ordering) => ordering,
        Err(error) => return Scalar::Error(error),
    };

    let result = match op {
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::Ne => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::Ge => ordering != Ordering::Less,
        _ => return Scalar::Error(XlError::IncompatibleValue),
    };
    Scalar::Logical(result)
}

/// Apply a value operator. Reference operators are not value operators and
/// give `#VALUE!`.
pub fn binary(op: BinaryOp, left: &Scalar, right: &Scalar, locale: &Locale) -> Scalar {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Pow => {
            arithmetic(op, left, right, locale)
        }
        BinaryOp::Concat => concat(left, right, locale),
        op if op.is_comparison() => comparison(op, left, right, locale),
        _ => Scalar::Error(XlError::IncompatibleValue),
    }
}

pub fn unary(op: UnaryOp, operand: &Scalar, locale: &Locale) -> Scalar {
    match op {
        UnaryOp::Pos => operand.clone(),
        UnaryOp::Neg => match operand.to_number(locale) {
            Ok(n) => number_result(-n),
            Err(error) => Scalar::Error(error),
        },
        UnaryOp::Percent => match operand.to_number(locale) {
            Ok(n) => number_result(n / 100.0),
            Err(error) => Scalar::Error(error),
        },
        UnaryOp::ImplicitIntersection | UnaryOp::Spill => Scalar::Error(XlError::IncompatibleValue),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn calc(op: BinaryOp, left: impl Into<Scalar>, right: impl Into<Scalar>) -> Scalar {
        binary(op, &left.into(), &right.into(), &Locale::en_us())
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(calc(BinaryOp::Add, 1.0, 2.0), Scalar::Number(3.0));
        assert_eq!(calc(BinaryOp::Sub, 1.0, "3"), Scalar::Number(-2.0));
        assert_eq!(calc(BinaryOp::Mul, true, 4.0), Scalar::Number(4.0));
        assert_eq!(calc(BinaryOp::Div, 1.0, 4.0), Scalar::Number(0.25));
        assert_eq!(calc(BinaryOp::Add, Scalar::Blank, 2.0), Scalar::Number(2.0));
    }

    #[test]
    fn test_arithmetic_errors() {
        assert_eq!(calc(BinaryOp::Div, 1.0, 0.0), Scalar::Error(XlError::DivisionByZero));
        assert_eq!(calc(BinaryOp::Div, 1.0, Scalar::Blank), Scalar::Error(XlError::DivisionByZero));
        assert_eq!(calc(BinaryOp::Add, "abc", 1.0), Scalar::Error(XlError::IncompatibleValue));
        assert_eq!(calc(BinaryOp::Mul, 1e200, 1e200), Scalar::Error(XlError::NumberInvalid));
    }

    #[test]
    fn test_left_error_wins() {
        assert_eq!(
            calc(BinaryOp::Add, XlError::NullValue, XlError::DivisionByZero),
            Scalar::Error(XlError::NullValue)
        );
        assert_eq!(
            calc(BinaryOp::Add, "abc", XlError::DivisionByZero),
            Scalar::Error(XlError::DivisionByZero)
        );
        assert_eq!(
            calc(BinaryOp::Eq, XlError::NoValueAvailable, XlError::NullValue),
            Scalar::Error(XlError::NoValueAvailable)
        );
    }

    #[test]
    fn test_power_edge_cases() {
        assert_eq!(power(0.0, 0.0), Scalar::Error(XlError::NumberInvalid));
        assert_eq!(power(10.0, 0.0), Scalar::Number(1.0));
        assert_eq!(power(0.0, -1.0), Scalar::Error(XlError::DivisionByZero));
        assert_eq!(power(-8.0, 0.5), Scalar::Error(XlError::NumberInvalid));
        assert_eq!(power(2.0, 10.0), Scalar::Number(1024.0));
    }

    #[test]
    fn test_concat() {
        assert_eq!(calc(BinaryOp::Concat, "a", 1.0), Scalar::Text("a1".into()));
        assert_eq!(calc(BinaryOp::Concat, true, Scalar::Blank), Scalar::Text("TRUE".into()));
        assert_eq!(
            calc(BinaryOp::Concat, "a", XlError::NameNotRecognized),
            Scalar::Error(XlError::NameNotRecognized)
        );
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(calc(BinaryOp::Lt, 1.0, 2.0), Scalar::Logical(true));
        assert_eq!(calc(BinaryOp::Eq, "abc", "ABC"), Scalar::Logical(true));
        assert_eq!(calc(BinaryOp::Lt, 100.0, "a"), Scalar::Logical(true));
        assert_eq!(calc(BinaryOp::Gt, true, "z"), Scalar::Logical(true));
        assert_eq!(calc(BinaryOp::Eq, Scalar::Blank, 0.0), Scalar::Logical(true));
        assert_eq!(calc(BinaryOp::Eq, Scalar::Blank, ""), Scalar::Logical(true));
        assert_eq!(calc(BinaryOp::Ne, Scalar::Blank, false), Scalar::Logical(false));
        assert_eq!(calc(BinaryOp::Ge, 2.0, 2.0), Scalar::Logical(true));
    }

    #[test]
    fn test_unary() {
        let locale = Locale::en_us();
        assert_eq!(unary(UnaryOp::Neg, &"2".into(), &locale), Scalar::Number(-2.0));
        assert_eq!(unary(UnaryOp::Percent, &50.0.into(), &locale), Scalar::Number(0.5));
        assert_eq!(unary(UnaryOp::Pos, &"text".into(), &locale), Scalar::Text("text".into()));
        assert_eq!(
            unary(UnaryOp::Neg, &"x".into(), &locale),
            Scalar::Error(XlError::IncompatibleValue)
        );
    }

    #[test]
    fn test_reference_operator_is_not_a_value_operator() {
        assert_eq!(calc(BinaryOp::Union, 1.0, 2.0), Scalar::Error(XlError::IncompatibleValue));
    }
}
