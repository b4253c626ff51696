use sheetcalc_core::{AnyValue, CellCoord, Scalar, SheetArea, XlError};

use super::{ArgValues, Args, FunctionDef, FunctionKind};
use crate::criteria::Criteria;
use crate::error::CalcResult;
use crate::operators::{number_result, power as raise};

pub const FUNCTIONS: &[FunctionDef] = &[
    FunctionDef {
        name: "SUM",
        min_args: 1,
        max_args: Some(255),
        kind: FunctionKind::Value,
        implementation: sum,
    },
    FunctionDef {
        name: "POWER",
        min_args: 2,
        max_args: Some(2),
        kind: FunctionKind::Value,
        implementation: power,
    },
    FunctionDef {
        name: "COUNTIF",
        min_args: 2,
        max_args: Some(2),
        kind: FunctionKind::Value,
        implementation: countif,
    },
    FunctionDef {
        name: "SUMIF",
        min_args: 2,
        max_args: Some(3),
        kind: FunctionKind::Value,
        implementation: sumif,
    },
];

/// SUM - Sum all numeric values. Direct arguments are coerced, cells of
/// references and arrays count only when they hold numbers.
pub fn sum(args: &Args<'_>) -> CalcResult<AnyValue> {
    let mut total = 0.0;

    for index in 0..args.len() {
        match args.values(index)? {
            ArgValues::Direct(value) => match value.to_number(args.locale()) {
                Ok(n) => total += n,
                Err(e) => return Ok(e.into()),
            },
            ArgValues::Cells(values) => {
                for value in values {
                    match value {
                        Scalar::Number(n) => total += n,
                        Scalar::Error(e) => return Ok(e.into()),
                        _ => {} // Skip blank, text and logical cells
                    }
                }
            }
        }
    }

    Ok(number_result(total).into())
}

/// POWER - Base raised to an exponent, same as `^`
pub fn power(args: &Args<'_>) -> CalcResult<AnyValue> {
    let base = args.scalar(0)?.to_number(args.locale());
    let exponent = args.scalar(1)?.to_number(args.locale());

    Ok(match (base, exponent) {
        (Ok(base), Ok(exponent)) => raise(base, exponent).into(),
        (Err(e), _) | (_, Err(e)) => e.into(),
    })
}

/// The area a criteria function reads, or the error to return instead
fn single_area(value: AnyValue) -> Result<SheetArea, XlError> {
    match value {
        AnyValue::Reference(reference) => reference
            .single_area()
            .cloned()
            .ok_or(XlError::IncompatibleValue),
        AnyValue::Scalar(Scalar::Error(e)) => Err(e),
        _ => Err(XlError::IncompatibleValue),
    }
}

/// Cells of an area the criteria may match. Blank cells are only listed
/// when the criteria accepts blanks.
fn candidates(args: &Args<'_>, area: &SheetArea, criteria: &Criteria) -> CalcResult<Vec<(CellCoord, Scalar)>> {
    let evaluator = args.evaluator();
    if !criteria.matches(&Scalar::Blank) {
        return evaluator.used_cells(area);
    }

    area.range
        .iter()
        .map(|coord| Ok((coord, evaluator.cell_value(&area.sheet, coord)?)))
        .collect()
}

/// COUNTIF - Count cells that satisfy a criteria
pub fn countif(args: &Args<'_>) -> CalcResult<AnyValue> {
    let criteria = Criteria::from_value(&args.scalar(1)?, args.locale());

    let count = match args.value(0)? {
        AnyValue::Reference(reference) => {
            let mut count = 0;
            for area in reference.areas() {
                count += candidates(args, area, &criteria)?
                    .iter()
                    .filter(|(_, value)| criteria.matches(value))
                    .count();
            }
            count
        }
        AnyValue::Array(array) => array.iter().filter(|value| criteria.matches(value)).count(),
        AnyValue::Scalar(Scalar::Error(e)) => return Ok(e.into()),
        AnyValue::Scalar(_) => return Ok(XlError::IncompatibleValue.into()),
    };

    Ok((count as f64).into())
}

/// SUMIF - Sum the cells whose counterpart in the criteria range satisfies
/// the criteria. The sum range takes the shape of the criteria range,
/// starting at its own top-left cell.
pub fn sumif(args: &Args<'_>) -> CalcResult<AnyValue> {
    let range = match single_area(args.value(0)?) {
        Ok(area) => area,
        Err(e) => return Ok(e.into()),
    };
    let criteria = Criteria::from_value(&args.scalar(1)?, args.locale());
    let sum_area = if args.len() > 2 {
        match single_area(args.value(2)?) {
            Ok(area) => area,
            Err(e) => return Ok(e.into()),
        }
    } else {
        range.clone()
    };

    let evaluator = args.evaluator();
    let origin = range.range.start;
    let target = sum_area.range.start;
    let mut total = 0.0;

    for (coord, value) in candidates(args, &range, &criteria)? {
        if !criteria.matches(&value) {
            continue;
        }
        let cell = CellCoord::new(
            target.row + (coord.row - origin.row),
            target.col + (coord.col - origin.col),
        );
        match evaluator.cell_value(&sum_area.sheet, cell)? {
            Scalar::Number(n) => total += n,
            Scalar::Error(e) => return Ok(e.into()),
            _ => {}
        }
    }

    Ok(number_result(total).into())
}
