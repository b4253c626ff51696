//! Workbook fixture for evaluating formulas in unit tests

use std::collections::HashMap;

use sheetcalc_core::{AnyValue, CellContent, CellCoord, Locale, Name, Scalar, SheetName, Workbook};

use crate::ast::Expr;
use crate::context::WorkbookContext;
use crate::error::CalcResult;
use crate::evaluator::Evaluator;
use crate::functions::FunctionRegistry;
use crate::parser::parse_formula;

/// A workbook with the sheets `Sheet1` and `Other`. Formulas are evaluated
/// on `Sheet1`.
pub struct TestBook {
    pub workbook: Workbook,
    pub names: HashMap<Name, Expr>,
    pub locale: Locale,
    pub functions: FunctionRegistry,
}

impl TestBook {
    pub fn new() -> Self {
        let mut workbook = Workbook::new(0);
        workbook.add_sheet("Sheet1").unwrap();
        workbook.add_sheet("Other").unwrap();
        TestBook {
            workbook,
            names: HashMap::new(),
            locale: Locale::en_us(),
            functions: FunctionRegistry::default(),
        }
    }

    /// Store a constant on `Sheet1`
    pub fn set(&mut self, a1: &str, value: impl Into<Scalar>) {
        self.set_on("Sheet1", a1, value);
    }

    pub fn set_on(&mut self, sheet: &str, a1: &str, value: impl Into<Scalar>) {
        let point = self.workbook.book_point(sheet, a1).unwrap();
        self.workbook
            .set_content(point, CellContent::Value { value: value.into() })
            .unwrap();
    }

    pub fn name(&mut self, name: Name, formula: &str) {
        self.names.insert(name, parse_formula(formula).unwrap());
    }

    /// Evaluate a formula placed in `a1` of `Sheet1`
    pub fn eval_at(&self, formula: &str, a1: &str) -> CalcResult<AnyValue> {
        let ctx = WorkbookContext::new(
            &self.workbook,
            SheetName::from("Sheet1"),
            CellCoord::from_a1(a1).unwrap(),
            &self.locale,
            &self.names,
            &self.functions,
        );
        let expr = parse_formula(formula).unwrap();
        Evaluator::new(&ctx).evaluate(&expr)
    }

    /// Evaluate a formula placed far away from the test data
    pub fn eval(&self, formula: &str) -> AnyValue {
        self.eval_at(formula, "Z100").unwrap()
    }
}
