//! Built-in functions and the registry the evaluator looks them up in.
//!
//! A function receives its arguments unevaluated and evaluates only the ones
//! it needs, so `IF` and `CHOOSE` skip the branches they do not take.

pub mod logical;
pub mod lookup;
pub mod math;

use std::collections::HashMap;
use std::fmt;

use sheetcalc_core::{AnyValue, Locale, Scalar};

use crate::ast::Expr;
use crate::error::CalcResult;
use crate::evaluator::Evaluator;

pub type FunctionImpl = fn(&Args<'_>) -> CalcResult<AnyValue>;

/// How a function uses its arguments, as seen by the dependency tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Every argument is read as a value
    Value,
    /// The result may be one of the reference arguments. Only the listed
    /// arguments are read as values, the others pass through.
    ReferenceSelector { value_args: &'static [usize] },
}

impl FunctionKind {
    /// Is the argument at `index` returned as-is rather than read?
    pub fn passes_through(&self, index: usize) -> bool {
        match self {
            FunctionKind::Value => false,
            FunctionKind::ReferenceSelector { value_args } => !value_args.contains(&index),
        }
    }
}

#[derive(Clone, Copy)]
pub struct FunctionDef {
    pub name: &'static str,
    pub min_args: usize,
    /// `None` for functions taking any number of arguments
    pub max_args: Option<usize>,
    pub kind: FunctionKind,
    pub implementation: FunctionImpl,
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Functions by upper-case name
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionDef>,
}

impl FunctionRegistry {
    /// A registry without any function
    pub fn empty() -> Self {
        FunctionRegistry {
            functions: HashMap::new(),
        }
    }

    /// A registry with the built-in functions
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for def in math::FUNCTIONS
            .iter()
            .chain(logical::FUNCTIONS)
            .chain(lookup::FUNCTIONS)
        {
            registry.register(*def);
        }
        registry
    }

    /// Add or replace a function
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_uppercase(), def);
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_uppercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Registered names in alphabetical order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// An argument flattened to its values
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValues {
    /// Given directly, e.g. `SUM(1, "2")`
    Direct(Scalar),
    /// Elements of an array, or the non-blank cells of a reference
    Cells(Vec<Scalar>),
}

/// Lazily evaluated arguments of a function call
pub struct Args<'a> {
    evaluator: &'a Evaluator<'a>,
    exprs: &'a [Expr],
}

impl<'a> Args<'a> {
    pub fn new(evaluator: &'a Evaluator<'a>, exprs: &'a [Expr]) -> Self {
        Args { evaluator, exprs }
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    pub fn locale(&self) -> &Locale {
        self.evaluator.locale()
    }

    pub fn evaluator(&self) -> &Evaluator<'a> {
        self.evaluator
    }

    /// Evaluate an argument. A missing argument is blank.
    pub fn value(&self, index: usize) -> CalcResult<AnyValue> {
        match self.exprs.get(index) {
            Some(expr) => self.evaluator.evaluate(expr),
            None => Ok(AnyValue::default()),
        }
    }

    /// Evaluate an argument to a single value
    pub fn scalar(&self, index: usize) -> CalcResult<Scalar> {
        let value = self.value(index)?;
        self.evaluator.to_scalar(value)
    }

    /// Evaluate an argument and flatten arrays and references
    pub fn values(&self, index: usize) -> CalcResult<ArgValues> {
        Ok(match self.value(index)? {
            AnyValue::Scalar(scalar) => ArgValues::Direct(scalar),
            AnyValue::Array(array) => ArgValues::Cells(array.iter().cloned().collect()),
            AnyValue::Reference(reference) => {
                let mut cells = Vec::new();
                for area in reference.areas() {
                    cells.extend(self.evaluator.used_cells(area)?.into_iter().map(|(_, v)| v));
                }
                ArgValues::Cells(cells)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtins_are_registered() {
        let registry = FunctionRegistry::new();
        assert_eq!(
            registry.names(),
            vec!["AND", "CHOOSE", "COUNTIF", "IF", "INDEX", "NOT", "OR", "POWER", "SUM", "SUMIF"]
        );
        assert!(registry.contains("sum"));
        assert!(!registry.contains("VLOOKUP"));
        assert!(FunctionRegistry::empty().is_empty());
    }

    #[test]
    fn test_register_replaces_by_name() {
        fn answer(_: &Args<'_>) -> CalcResult<AnyValue> {
            Ok(42.0.into())
        }

        let mut registry = FunctionRegistry::new();
        let before = registry.len();
        registry.register(FunctionDef {
            name: "Sum",
            min_args: 0,
            max_args: Some(0),
            kind: FunctionKind::Value,
            implementation: answer,
        });
        assert_eq!(registry.len(), before);
        assert_eq!(registry.get("SUM").map(|def| def.max_args), Some(Some(0)));
    }

    #[test]
    fn test_reference_selector_arguments() {
        let if_kind = FunctionKind::ReferenceSelector { value_args: &[0] };
        assert!(!if_kind.passes_through(0));
        assert!(if_kind.passes_through(1));
        assert!(!FunctionKind::Value.passes_through(1));
    }
}
