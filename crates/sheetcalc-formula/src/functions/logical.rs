use sheetcalc_core::{AnyValue, Scalar, XlError};

use super::{ArgValues, Args, FunctionDef, FunctionKind};
use crate::error::CalcResult;

pub const FUNCTIONS: &[FunctionDef] = &[
    FunctionDef {
        name: "IF",
        min_args: 1,
        max_args: Some(3),
        kind: FunctionKind::ReferenceSelector { value_args: &[0] },
        implementation: if_fn,
    },
    FunctionDef {
        name: "AND",
        min_args: 1,
        max_args: Some(255),
        kind: FunctionKind::Value,
        implementation: and,
    },
    FunctionDef {
        name: "OR",
        min_args: 1,
        max_args: Some(255),
        kind: FunctionKind::Value,
        implementation: or,
    },
    FunctionDef {
        name: "NOT",
        min_args: 1,
        max_args: Some(1),
        kind: FunctionKind::Value,
        implementation: not,
    },
];

/// IF - Return one of two values based on a condition. Only the taken
/// branch is evaluated; a reference branch stays a reference.
pub fn if_fn(args: &Args<'_>) -> CalcResult<AnyValue> {
    let condition = match args.scalar(0)?.to_logical() {
        Ok(condition) => condition,
        Err(e) => return Ok(e.into()),
    };

    match (condition, args.len()) {
        (true, n) if n > 1 => args.value(1),
        (false, n) if n > 2 => args.value(2),
        (condition, _) => Ok(condition.into()),
    }
}

/// Logical values of all arguments. Text and blank cells of references are
/// skipped, direct text that is not TRUE/FALSE is `#VALUE!`.
fn logicals(args: &Args<'_>) -> CalcResult<Result<Vec<bool>, XlError>> {
    let mut logicals = Vec::new();

    for index in 0..args.len() {
        match args.values(index)? {
            ArgValues::Direct(value) => match value.to_logical() {
                Ok(b) => logicals.push(b),
                Err(e) => return Ok(Err(e)),
            },
            ArgValues::Cells(values) => {
                for value in values {
                    match value {
                        Scalar::Logical(b) => logicals.push(b),
                        Scalar::Number(n) => logicals.push(n != 0.0),
                        Scalar::Error(e) => return Ok(Err(e)),
                        Scalar::Blank | Scalar::Text(_) => {}
                    }
                }
            }
        }
    }

    // Nothing to decide on
    if logicals.is_empty() {
        return Ok(Err(XlError::IncompatibleValue));
    }
    Ok(Ok(logicals))
}

/// AND - TRUE if all arguments are TRUE
pub fn and(args: &Args<'_>) -> CalcResult<AnyValue> {
    Ok(match logicals(args)? {
        Ok(values) => values.iter().all(|b| *b).into(),
        Err(e) => e.into(),
    })
}

/// OR - TRUE if any argument is TRUE
pub fn or(args: &Args<'_>) -> CalcResult<AnyValue> {
    Ok(match logicals(args)? {
        Ok(values) => values.iter().any(|b| *b).into(),
        Err(e) => e.into(),
    })
}

/// NOT - Reverse a logical value
pub fn not(args: &Args<'_>) -> CalcResult<AnyValue> {
    Ok(match args.scalar(0)?.to_logical() {
        Ok(b) => (!b).into(),
        Err(e) => e.into(),
    })
}

#[cfg(test)]
mod tests {
    use crate::test_support::TestBook;
    use pretty_assertions::assert_eq;
    use sheetcalc_core::{AnyValue, Scalar, XlError};

    #[test]
    fn test_if() {
        let book = TestBook::new();
        assert_eq!(book.eval("IF(TRUE,1,2)"), AnyValue::from(1.0));
        assert_eq!(book.eval("IF(0,1,2)"), AnyValue::from(2.0));
        assert_eq!(book.eval("IF(1>2,1)"), AnyValue::from(false));
        assert_eq!(book.eval("IF(2>1)"), AnyValue::from(true));
        assert_eq!(book.eval("IF(\"x\",1,2)"), AnyValue::error(XlError::IncompatibleValue));
        assert_eq!(book.eval("IF(#N/A,1,2)"), AnyValue::error(XlError::NoValueAvailable));
    }

    #[test]
    fn test_if_skips_the_other_branch() {
        let book = TestBook::new();
        // The untaken branch would not even evaluate
        assert_eq!(book.eval("IF(TRUE,1,A1#)"), AnyValue::from(1.0));
    }

    #[test]
    fn test_if_returns_references() {
        let mut book = TestBook::new();
        book.set("A1", 1.0);
        book.set("A2", 2.0);
        book.set("B1", 10.0);
        assert_eq!(book.eval("SUM(IF(TRUE,A1:A2,B1))"), AnyValue::from(3.0));
        assert_eq!(book.eval("SUM(IF(FALSE,A1:A2,B1))"), AnyValue::from(10.0));
    }

    #[test]
    fn test_and_or() {
        let mut book = TestBook::new();
        book.set("A1", true);
        book.set("A2", "text");
        book.set("A3", 0.0);

        assert_eq!(book.eval("AND(TRUE,1)"), AnyValue::from(true));
        assert_eq!(book.eval("AND(A1:A3)"), AnyValue::from(false));
        assert_eq!(book.eval("OR(A1:A3)"), AnyValue::from(true));
        assert_eq!(book.eval("OR(A2)"), AnyValue::error(XlError::IncompatibleValue));
        assert_eq!(book.eval("AND(\"x\")"), AnyValue::error(XlError::IncompatibleValue));
        assert_eq!(book.eval("OR(FALSE,#DIV/0!)"), AnyValue::error(XlError::DivisionByZero));
    }

    #[test]
    fn test_not() {
        let book = TestBook::new();
        assert_eq!(book.eval("NOT(FALSE)"), AnyValue::from(true));
        assert_eq!(book.eval("NOT(5)"), AnyValue::from(Scalar::Logical(false)));
        assert_eq!(book.eval("NOT(\"TRUE\")"), AnyValue::from(false));
    }
}
