use pretty_assertions::assert_eq;
use sheetcalc_core::{Array, AnyValue, BookPoint, CellCoord, Locale, Name, Scalar, Workbook, XlError};
use sheetcalc_formula::{evaluate_formula, CalcEngine, CalcError, Criteria, EngineConfig};

struct Book {
    workbook: Workbook,
    engine: CalcEngine,
}

impl Book {
    fn new() -> Self {
        let mut workbook = Workbook::new(0);
        workbook.add_sheet("Sheet1").unwrap();
        Book {
            workbook,
            engine: CalcEngine::new(EngineConfig::default()).unwrap(),
        }
    }

    fn point(&self, a1: &str) -> BookPoint {
        self.workbook.book_point("Sheet1", a1).unwrap()
    }

    fn input(&mut self, a1: &str, input: &str) {
        let point = self.point(a1);
        self.engine.set_input(&mut self.workbook, point, input).unwrap();
    }

    fn evaluate(&mut self, a1: &str) -> Result<Scalar, CalcError> {
        let point = self.point(a1);
        self.engine.evaluate_cell(&mut self.workbook, point)
    }

    fn dirty(&self, a1: &str) -> bool {
        self.engine.needs_recalculation(self.point(a1))
    }
}

fn cycle_book() -> Book {
    let mut book = Book::new();
    book.input("A2", "=A1*10");
    book.input("A3", "=A2*10");
    book.input("A4", "=A3*10");
    book.input("A1", "=A2+A3+A4");
    book
}

#[test]
fn test_evaluation_is_idempotent() {
    let mut book = Book::new();
    book.input("A1", "2");
    book.input("B1", "=A1*A1+1");

    assert_eq!(book.evaluate("B1"), Ok(Scalar::Number(5.0)));
    assert!(!book.dirty("B1"));
    assert_eq!(book.evaluate("B1"), Ok(Scalar::Number(5.0)));
    assert!(!book.dirty("B1"));
}

#[test]
fn test_dirty_propagates_along_dependents() {
    let mut book = Book::new();
    book.input("A1", "1");
    book.input("A2", "=A1");
    book.input("A3", "=A2");
    book.input("A4", "=A3");
    book.engine.recalculate(&mut book.workbook).unwrap();
    assert_eq!(book.engine.pending(), 0);

    book.input("A1", "7");
    assert!(book.dirty("A2"));
    assert!(book.dirty("A3"));
    assert!(book.dirty("A4"));

    assert_eq!(book.evaluate("A4"), Ok(Scalar::Number(7.0)));
    assert_eq!(book.engine.pending(), 0);
}

#[test]
fn test_every_cell_of_a_cycle_fails() {
    for start in ["A1", "A2", "A3", "A4"] {
        let mut book = cycle_book();
        let result = book.evaluate(start);
        assert!(
            matches!(result, Err(CalcError::CircularReference { .. })),
            "{start}: {result:?}"
        );

        book.engine.recalculate(&mut book.workbook).unwrap();
        for cell in ["A1", "A2", "A3", "A4"] {
            let point = book.point(cell);
            assert_eq!(
                book.engine.failure(point),
                Some(&CalcError::CircularReference { cell: point }),
                "{cell} after starting at {start}"
            );
            assert!(!book.dirty(cell));
        }
    }
}

#[test]
fn test_cells_reading_a_cycle_fail() {
    let mut book = cycle_book();
    book.input("B1", "=SUM(A1:A4)");
    book.input("B2", "=IF(FALSE,A1,3)");
    book.engine.recalculate(&mut book.workbook).unwrap();

    let b1 = book.point("B1");
    assert_eq!(book.engine.failure(b1), Some(&CalcError::CircularReference { cell: b1 }));
    assert_eq!(book.evaluate("B2"), Ok(Scalar::Number(3.0)));
}

#[test]
fn test_names_feed_recalculation() {
    let mut book = Book::new();
    book.input("A1", "100");
    book.input("A2", "200");
    book.engine
        .define_name(&mut book.workbook, Name::book("Amounts"), "Sheet1!A1:A2")
        .unwrap();
    book.input("B1", "=SUM(Amounts)");
    assert_eq!(book.evaluate("B1"), Ok(Scalar::Number(300.0)));

    book.input("A2", "1");
    assert!(book.dirty("B1"));
    assert_eq!(book.evaluate("B1"), Ok(Scalar::Number(101.0)));
}

#[test]
fn test_conditional_aggregates() {
    let mut book = Book::new();
    for (a1, input) in [("A1", "5"), ("A2", "12"), ("A3", "apple"), ("A4", "20"), ("A5", "TRUE")] {
        book.input(a1, input);
    }
    book.input("B1", "=COUNTIF(A1:A5,\">10\")");
    book.input("B2", "=SUMIF(A1:A5,\"<>12\")");
    book.input("B3", "=COUNTIF(A1:A5,\"a*\")");

    assert_eq!(book.evaluate("B1"), Ok(Scalar::Number(2.0)));
    assert_eq!(book.evaluate("B2"), Ok(Scalar::Number(25.0)));
    assert_eq!(book.evaluate("B3"), Ok(Scalar::Number(1.0)));
}

#[test]
fn test_array_operands_of_different_shapes() {
    let mut workbook = Workbook::new(0);
    workbook.add_sheet("Sheet1").unwrap();
    let value = evaluate_formula(
        "{1;2}+{3,4}",
        &workbook,
        "Sheet1",
        CellCoord::new(0, 0),
        &Locale::en_us(),
    )
    .unwrap();

    let na = Scalar::Error(XlError::NoValueAvailable);
    let expected = Array::from_rows(vec![vec![4.0.into(), na.clone()], vec![na.clone(), na]]).unwrap();
    assert_eq!(value, AnyValue::from(expected));
}

#[test]
fn test_zero_to_the_zero() {
    let mut book = Book::new();
    book.input("A1", "=0^0");
    book.input("A2", "=10^0");
    book.input("A3", "=POWER(0,0)");
    assert_eq!(book.evaluate("A1"), Ok(Scalar::Error(XlError::NumberInvalid)));
    assert_eq!(book.evaluate("A2"), Ok(Scalar::Number(1.0)));
    assert_eq!(book.evaluate("A3"), Ok(Scalar::Error(XlError::NumberInvalid)));
}

#[test]
fn test_criteria_properties() {
    let en = Locale::en_us();
    assert!(!Criteria::new("<1", &en).matches(&Scalar::Logical(false)));
    assert!(Criteria::new("?", &en).matches(&Scalar::from("a")));
    assert!(!Criteria::new("?", &en).matches(&Scalar::from("ab")));

    let cs = Locale::cs_cz();
    assert!(Criteria::new(">ch", &cs).matches(&Scalar::from("i")));
    assert!(!Criteria::new(">ch", &cs).matches(&Scalar::from("h")));
}

#[test]
fn test_locale_drives_coercion() {
    let config = EngineConfig {
        locale: "cs-CZ".to_string(),
        ..EngineConfig::default()
    };
    let mut book = Book::new();
    book.engine = CalcEngine::new(config).unwrap();
    book.input("A1", "1,5");
    book.input("A2", "=A1*2");
    book.input("A3", "=A2&\"\"");
    assert_eq!(book.evaluate("A2"), Ok(Scalar::Number(3.0)));
    assert_eq!(book.evaluate("A3"), Ok(Scalar::from("3")));
}
