use sheetcalc_core::{AnyValue, Array, CellCoord, CellRange, Reference, SheetArea, XlError};

use super::{Args, FunctionDef, FunctionKind};
use crate::error::CalcResult;

pub const FUNCTIONS: &[FunctionDef] = &[
    FunctionDef {
        name: "CHOOSE",
        min_args: 2,
        max_args: Some(255),
        kind: FunctionKind::ReferenceSelector { value_args: &[0] },
        implementation: choose,
    },
    FunctionDef {
        name: "INDEX",
        min_args: 2,
        max_args: Some(4),
        kind: FunctionKind::ReferenceSelector {
            value_args: &[1, 2, 3],
        },
        implementation: index,
    },
];

/// A 1-based position argument, truncated. A missing argument is 0.
fn position(args: &Args<'_>, index: usize) -> CalcResult<Result<usize, XlError>> {
    if index >= args.len() {
        return Ok(Ok(0));
    }
    let number = match args.scalar(index)?.to_number(args.locale()) {
        Ok(n) => n.trunc(),
        Err(e) => return Ok(Err(e)),
    };
    if number < 0.0 || number > u32::MAX as f64 {
        return Ok(Err(XlError::IncompatibleValue));
    }
    Ok(Ok(number as usize))
}

/// CHOOSE - Pick one of the values by its 1-based position. Only the chosen
/// value is evaluated.
pub fn choose(args: &Args<'_>) -> CalcResult<AnyValue> {
    let chosen = match position(args, 0)? {
        Ok(n) => n,
        Err(e) => return Ok(e.into()),
    };

    if chosen == 0 || chosen >= args.len() {
        return Ok(XlError::IncompatibleValue.into());
    }
    args.value(chosen)
}

/// Rows and columns a selection covers within `0..height` and `0..width`.
/// Position 0 selects the whole extent.
fn select(row: usize, col: usize, height: usize, width: usize) -> Result<((usize, usize), (usize, usize)), XlError> {
    if row > height || col > width {
        return Err(XlError::CellReference);
    }
    let rows = if row == 0 { (0, height - 1) } else { (row - 1, row - 1) };
    let cols = if col == 0 { (0, width - 1) } else { (col - 1, col - 1) };
    Ok((rows, cols))
}

fn index_range(range: CellRange, row: usize, col: usize) -> Result<CellRange, XlError> {
    let ((top, bottom), (left, right)) =
        select(row, col, range.height() as usize, range.width() as usize)?;
    let start = range.start;
    Ok(CellRange::new(
        CellCoord::new(start.row + top as u32, start.col + left as u32),
        CellCoord::new(start.row + bottom as u32, start.col + right as u32),
    ))
}

fn index_array(array: &Array, row: usize, col: usize) -> Result<AnyValue, XlError> {
    let ((top, bottom), (left, right)) = select(row, col, array.height(), array.width())?;
    let rows = (top..=bottom)
        .map(|r| (left..=right).map(|c| array.get_or_na(r, c)).collect())
        .collect();
    let selected = Array::from_rows(rows).map_err(|_| XlError::CellReference)?;
    if selected.width() == 1 && selected.height() == 1 {
        return Ok(selected.top_left().clone().into());
    }
    Ok(selected.into())
}

/// INDEX - The cell (or whole row/column, for position 0) of a reference or
/// array. With a single row and no column, the row number picks the column.
pub fn index(args: &Args<'_>) -> CalcResult<AnyValue> {
    let mut row = match position(args, 1)? {
        Ok(n) => n,
        Err(e) => return Ok(e.into()),
    };
    let mut col = match position(args, 2)? {
        Ok(n) => n,
        Err(e) => return Ok(e.into()),
    };
    let area_number = match position(args, 3)? {
        Ok(0) if args.len() <= 3 => 1,
        Ok(n) => n,
        Err(e) => return Ok(e.into()),
    };
    let has_col = args.len() > 2;

    Ok(match args.value(0)? {
        AnyValue::Reference(reference) => {
            let Some(area) = area_number.checked_sub(1).and_then(|i| reference.areas().get(i)) else {
                return Ok(XlError::CellReference.into());
            };
            if !has_col && area.range.height() == 1 {
                (row, col) = (1, row);
            }
            match index_range(area.range, row, col) {
                Ok(range) => Reference::new(SheetArea::new(area.sheet.clone(), range)).into(),
                Err(e) => e.into(),
            }
        }
        AnyValue::Array(array) => {
            if !has_col && array.height() == 1 {
                (row, col) = (1, row);
            }
            index_array(&array, row, col).unwrap_or_else(AnyValue::error)
        }
        AnyValue::Scalar(value) => match (row, col) {
            (0 | 1, 0 | 1) => value.into(),
            _ => XlError::CellReference.into(),
        },
    })
}

#[cfg(test)]
mod tests {
    use crate::test_support::TestBook;
    use pretty_assertions::assert_eq;
    use sheetcalc_core::{AnyValue, Array, CellRange, Reference, Scalar, SheetArea, XlError};

    fn reference(a1: &str) -> AnyValue {
        Reference::new(SheetArea::new("Sheet1", CellRange::from_a1(a1).unwrap())).into()
    }

    #[test]
    fn test_choose() {
        let book = TestBook::new();
        assert_eq!(book.eval("CHOOSE(2,\"a\",\"b\",\"c\")"), AnyValue::from(Scalar::from("b")));
        assert_eq!(book.eval("CHOOSE(1.9,10,20)"), AnyValue::from(10.0));
        assert_eq!(book.eval("CHOOSE(3,10,20)"), AnyValue::error(XlError::IncompatibleValue));
        assert_eq!(book.eval("CHOOSE(0,10,20)"), AnyValue::error(XlError::IncompatibleValue));
        assert_eq!(book.eval("CHOOSE(1,B2:C3,A1)"), reference("B2:C3"));
    }

    #[test]
    fn test_index_reference() {
        let book = TestBook::new();
        assert_eq!(book.eval("INDEX(B2:D5,2,3)"), reference("D3"));
        assert_eq!(book.eval("INDEX(B2:D5,0,2)"), reference("C2:C5"));
        assert_eq!(book.eval("INDEX(B2:D5,2,0)"), reference("B3:D3"));
        assert_eq!(book.eval("INDEX(B2:D2,3)"), reference("D2"));
        assert_eq!(book.eval("INDEX(B2:D5,5,1)"), AnyValue::error(XlError::CellReference));
        assert_eq!(book.eval("INDEX((A1:B2,D4:E5),1,2,2)"), reference("E4"));
        assert_eq!(book.eval("INDEX((A1:B2,D4:E5),1,1,3)"), AnyValue::error(XlError::CellReference));
    }

    #[test]
    fn test_index_reads_cells_in_value_context() {
        let mut book = TestBook::new();
        book.set("C3", 7.0);
        assert_eq!(book.eval("INDEX(B2:D5,2,2)+1"), AnyValue::from(8.0));
    }

    #[test]
    fn test_index_array() {
        let book = TestBook::new();
        assert_eq!(book.eval("INDEX({1,2;3,4},2,1)"), AnyValue::from(3.0));
        assert_eq!(book.eval("INDEX({1,2,3},2)"), AnyValue::from(2.0));
        assert_eq!(
            book.eval("INDEX({1,2;3,4},0,2)"),
            AnyValue::from(Array::from_rows(vec![vec![2.0.into()], vec![4.0.into()]]).unwrap())
        );
        assert_eq!(book.eval("INDEX({1,2;3,4},3,1)"), AnyValue::error(XlError::CellReference));
        assert_eq!(book.eval("INDEX(5,1,1)"), AnyValue::from(5.0));
    }
}
