//! Formula evaluation over a [`CalcContext`].
//!
//! Expressions evaluate to any value: a scalar, an array or a reference.
//! Value operators see single-cell references as scalars and single-area
//! references as arrays, and apply element-wise over arrays. Reference
//! operators (`:` `,` and space) combine references and never read cells.

use std::cell::Cell;

use sheetcalc_core::{
    AnyValue, Array, CellCoord, Locale, Reference, Scalar, SheetArea, SheetName, XlError,
};

use crate::ast::{AreaRef, BinaryOp, Expr, Prefix, UnaryOp};
use crate::context::CalcContext;
use crate::error::{CalcError, CalcResult, Feature};
use crate::functions::Args;
use crate::operators;

/// Operand of a value operator after references were read
enum Operand {
    Scalar(Scalar),
    Array(Array),
    MultiArea,
}

pub struct Evaluator<'a> {
    ctx: &'a dyn CalcContext,
    name_depth: Cell<usize>,
}

impl<'a> Evaluator<'a> {
    pub fn new(ctx: &'a dyn CalcContext) -> Self {
        Evaluator {
            ctx,
            name_depth: Cell::new(0),
        }
    }

    pub fn context(&self) -> &'a dyn CalcContext {
        self.ctx
    }

    pub fn locale(&self) -> &Locale {
        self.ctx.locale()
    }

    /// Evaluate an expression to any value
    pub fn evaluate(&self, expr: &Expr) -> CalcResult<AnyValue> {
        match expr {
            Expr::Number(n) => Ok(operators::number_result(*n).into()),
            Expr::String(s) => Ok(Scalar::Text(s.clone()).into()),
            Expr::Boolean(b) => Ok((*b).into()),
            Expr::Error(e) => Ok((*e).into()),
            Expr::Array(array) => Ok(array.clone().into()),
            Expr::Reference { prefix, area } => self.evaluate_reference(prefix.as_ref(), area),
            Expr::Name { prefix, name } => self.evaluate_name(prefix.as_ref(), name),
            Expr::StructuredReference { .. } => Err(CalcError::Unsupported(Feature::StructuredReference)),
            Expr::Dde { .. } => Err(CalcError::Unsupported(Feature::Dde)),
            Expr::Binary { left, op, right } if op.is_reference_op() => {
                self.evaluate_reference_op(left, *op, right)
            }
            Expr::Binary { left, op, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.apply_binary(*op, left, right)
            }
            Expr::Unary { op, operand } => self.evaluate_unary(*op, operand),
            Expr::FunctionCall { name, args } => self.evaluate_function(name, args),
            Expr::Grouped(inner) => self.evaluate(inner),
        }
    }

    /// Evaluate an expression to a scalar
    pub fn evaluate_scalar(&self, expr: &Expr) -> CalcResult<Scalar> {
        let value = self.evaluate(expr)?;
        self.to_scalar(value)
    }

    /// Reduce a value to a scalar: arrays give their top-left element and
    /// references are implicitly intersected with the formula cell.
    pub fn to_scalar(&self, value: AnyValue) -> CalcResult<Scalar> {
        match value {
            AnyValue::Scalar(scalar) => Ok(scalar),
            AnyValue::Array(array) => Ok(array.top_left().clone()),
            AnyValue::Reference(reference) => self.intersect_formula_cell(&reference),
        }
    }

    pub fn cell_value(&self, sheet: &SheetName, cell: CellCoord) -> CalcResult<Scalar> {
        self.ctx.cell_value(sheet, cell)
    }

    pub fn used_cells(&self, area: &SheetArea) -> CalcResult<Vec<(CellCoord, Scalar)>> {
        self.ctx.used_cells(area)
    }

    /// All cells of an area as an array, blanks included
    pub fn area_to_array(&self, area: &SheetArea) -> CalcResult<Array> {
        let range = area.range;
        let width = range.width() as usize;
        let height = range.height() as usize;
        if !Array::fits(width, height) {
            return Err(CalcError::Unsupported(Feature::LargeArray));
        }
        let mut data = vec![Scalar::Blank; width * height];

        for (coord, value) in self.ctx.used_cells(area)? {
            let row = (coord.row - range.start.row) as usize;
            let col = (coord.col - range.start.col) as usize;
            if let Some(slot) = data.get_mut(row * width + col) {
                *slot = value;
            }
        }
        Ok(Array::new(width, height, data)?)
    }

    fn intersect_formula_cell(&self, reference: &Reference) -> CalcResult<Scalar> {
        match reference.implicit_intersection(self.ctx.formula_cell()) {
            Ok((sheet, cell)) => self.ctx.cell_value(sheet, cell),
            Err(error) => Ok(Scalar::Error(error)),
        }
    }

    fn prefix_sheet(&self, prefix: Option<&Prefix>) -> CalcResult<SheetName> {
        match prefix {
            None => Ok(self.ctx.formula_sheet().clone()),
            Some(Prefix::Sheet(name)) => Ok(SheetName::from(name.as_str())),
            Some(Prefix::SheetSpan { .. }) => Err(CalcError::Unsupported(Feature::ThreeDReference)),
            Some(Prefix::External { .. }) => Err(CalcError::Unsupported(Feature::ExternalReference)),
        }
    }

    fn evaluate_reference(&self, prefix: Option<&Prefix>, area: &AreaRef) -> CalcResult<AnyValue> {
        let sheet = self.prefix_sheet(prefix)?;
        if !self.ctx.sheet_exists(&sheet) {
            return Ok(XlError::CellReference.into());
        }
        Ok(Reference::new(SheetArea::new(sheet, area.range())).into())
    }

    fn evaluate_name(&self, prefix: Option<&Prefix>, name: &str) -> CalcResult<AnyValue> {
        let scope = self.prefix_sheet(prefix)?;
        let Some((_, formula)) = self.ctx.names().resolve(Some(&scope), name) else {
            return Ok(XlError::NameNotRecognized.into());
        };

        // Names defined through each other never finish
        let depth = self.name_depth.get();
        if depth >= self.ctx.max_name_depth() {
            return Ok(XlError::NameNotRecognized.into());
        }
        self.name_depth.set(depth + 1);
        let result = self.evaluate(formula);
        self.name_depth.set(depth);
        result
    }

    fn evaluate_reference_op(&self, left: &Expr, op: BinaryOp, right: &Expr) -> CalcResult<AnyValue> {
        let left = match self.reference_operand(op, self.evaluate(left)?)? {
            Ok(reference) => reference,
            Err(error) => return Ok(error.into()),
        };

        // The right side of a range without a sheet continues on the left sheet
        let right = match (op, right, left.areas().first()) {
            (BinaryOp::Range, Expr::Reference { prefix: None, area }, Some(first)) => {
                AnyValue::from(Reference::new(SheetArea::new(first.sheet.clone(), area.range())))
            }
            _ => self.evaluate(right)?,
        };
        let right = match self.reference_operand(op, right)? {
            Ok(reference) => reference,
            Err(error) => return Ok(error.into()),
        };

        let combined = match op {
            BinaryOp::Range => left.range(&right),
            BinaryOp::Union => Ok(left.union(&right)),
            BinaryOp::Intersection => left.intersect(&right),
            _ => Err(XlError::IncompatibleValue),
        };
        Ok(combined.map_or_else(AnyValue::error, AnyValue::from))
    }

    /// Operand of a reference operator. An error propagates, other
    /// non-references are `#VALUE!`.
    fn reference_operand(&self, op: BinaryOp, value: AnyValue) -> CalcResult<Result<Reference, XlError>> {
        match value {
            AnyValue::Reference(reference) => Ok(Ok(reference)),
            AnyValue::Scalar(Scalar::Error(error)) => Ok(Err(error)),
            AnyValue::Array(_) if op == BinaryOp::Intersection => {
                Err(CalcError::Unsupported(Feature::ArrayConstantIntersection))
            }
            _ => Ok(Err(XlError::IncompatibleValue)),
        }
    }

    fn evaluate_unary(&self, op: UnaryOp, operand: &Expr) -> CalcResult<AnyValue> {
        match op {
            UnaryOp::Spill => Err(CalcError::Unsupported(Feature::SpillOperator)),
            UnaryOp::ImplicitIntersection => match self.evaluate(operand)? {
                AnyValue::Reference(reference) => Ok(self.intersect_formula_cell(&reference)?.into()),
                AnyValue::Array(_) => Err(CalcError::Unsupported(Feature::ArrayConstantIntersection)),
                scalar @ AnyValue::Scalar(_) => Ok(scalar),
            },
            _ => {
                let locale = self.ctx.locale();
                let value = self.evaluate(operand)?;
                Ok(match self.operand(value)? {
                    Operand::Scalar(scalar) => operators::unary(op, &scalar, locale).into(),
                    Operand::Array(array) => array.map(|x| operators::unary(op, x, locale)).into(),
                    Operand::MultiArea => XlError::IncompatibleValue.into(),
                })
            }
        }
    }

    /// Apply a value operator with array broadcasting
    pub fn apply_binary(&self, op: BinaryOp, left: AnyValue, right: AnyValue) -> CalcResult<AnyValue> {
        let locale = self.ctx.locale();
        let apply = |a: &Scalar, b: &Scalar| operators::binary(op, a, b, locale);
        let left = self.operand(left)?;
        let right = self.operand(right)?;

        Ok(match (left, right) {
            (Operand::Scalar(a), Operand::Scalar(b)) => apply(&a, &b).into(),
            (Operand::Array(a), Operand::Scalar(b)) => a.map(|x| apply(x, &b)).into(),
            (Operand::Scalar(a), Operand::Array(b)) => b.map(|y| apply(&a, y)).into(),
            (Operand::Array(a), Operand::Array(b)) => {
                if !Array::fits(a.width().max(b.width()), a.height().max(b.height())) {
                    return Err(CalcError::Unsupported(Feature::LargeArray));
                }
                a.zip_with(&b, |x, y| apply(x, y)).into()
            }
            // A multi-area operand poisons the result in the other operand's shape
            (Operand::MultiArea, Operand::Array(other)) | (Operand::Array(other), Operand::MultiArea) => {
                Array::filled(Scalar::Error(XlError::IncompatibleValue), other.width(), other.height())
                    .into()
            }
            (Operand::MultiArea, _) | (_, Operand::MultiArea) => XlError::IncompatibleValue.into(),
        })
    }

    fn operand(&self, value: AnyValue) -> CalcResult<Operand> {
        Ok(match value {
            AnyValue::Scalar(scalar) => Operand::Scalar(scalar),
            AnyValue::Array(array) => Operand::Array(array),
            AnyValue::Reference(reference) => match reference.single_area() {
                None => Operand::MultiArea,
                Some(area) if area.range.is_single_cell() => {
                    Operand::Scalar(self.ctx.cell_value(&area.sheet, area.range.start)?)
                }
                Some(area) => Operand::Array(self.area_to_array(area)?),
            },
        })
    }

    fn evaluate_function(&self, name: &str, args: &[Expr]) -> CalcResult<AnyValue> {
        let Some(function) = self.ctx.functions().get(name) else {
            if self.ctx.reject_unknown_functions() {
                return Err(CalcError::UnknownFunction(name.to_string()));
            }
            return Ok(XlError::NameNotRecognized.into());
        };

        let too_many = function.max_args.is_some_and(|max| args.len() > max);
        if args.len() < function.min_args || too_many {
            return Ok(XlError::IncompatibleValue.into());
        }
        (function.implementation)(&Args::new(self, args))
    }
}
