pub mod ast;
pub mod chain;
pub mod config;
pub mod context;
pub mod criteria;
pub mod dependency;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod operators;
pub mod parser;
pub mod wildcard;

#[cfg(test)]
mod test_support;

pub use ast::{AreaRef, BinaryOp, CellRef, Expr, Prefix, UnaryOp};
pub use chain::CalculationChain;
pub use config::EngineConfig;
pub use context::{CalcContext, NameResolver, WorkbookContext};
pub use criteria::{Comparison, Criteria};
pub use dependency::{collect_dependencies, AnalysisContext, DependencyTree, FormulaDependencies};
pub use engine::CalcEngine;
pub use error::{CalcError, CalcResult, Feature, ParseError};
pub use evaluator::Evaluator;
pub use functions::{FunctionDef, FunctionKind, FunctionRegistry};
pub use parser::{parse_formula, FormulaParser};
pub use wildcard::Wildcard;

use sheetcalc_core::{AnyValue, CellCoord, Locale, SheetName, Workbook};
use std::collections::HashMap;

/// Parse and evaluate a formula placed in a cell of a workbook whose cached
/// values are current. Uses the built-in functions and no defined names.
pub fn evaluate_formula(
    expression: &str,
    workbook: &Workbook,
    sheet: &str,
    cell: CellCoord,
    locale: &Locale,
) -> CalcResult<AnyValue> {
    let formula = parse_formula(expression)?;
    let names = HashMap::new();
    let functions = FunctionRegistry::new();
    let ctx = WorkbookContext::new(workbook, SheetName::from(sheet), cell, locale, &names, &functions);
    Evaluator::new(&ctx).evaluate(&formula)
}
