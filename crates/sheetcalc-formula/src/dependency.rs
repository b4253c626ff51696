//! Which cells and names a formula reads, and which formulas go stale when
//! cells change.
//!
//! Dependencies are collected statically from the formula tree. Every node
//! either propagates the areas it refers to (when its parent can still use
//! them as a reference, e.g. `:` or the branches of `IF`) or adds them as
//! final dependencies. The result is a superset of what an evaluation reads:
//! at worst a formula is recalculated more often than strictly necessary.

use std::collections::{HashMap, HashSet};

use sheetcalc_core::{BookPoint, CellRange, Ident, Name, SheetArea, SheetId, SheetName};

use crate::ast::{BinaryOp, Expr, Prefix, UnaryOp};
use crate::context::{NameResolver, DEFAULT_MAX_NAME_DEPTH};
use crate::functions::{FunctionKind, FunctionRegistry};

/// Everything a formula reads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormulaDependencies {
    pub areas: HashSet<SheetArea>,
    pub names: HashSet<Name>,
}

impl FormulaDependencies {
    pub fn is_empty(&self) -> bool {
        self.areas.is_empty() && self.names.is_empty()
    }
}

/// Lookups needed to analyze a formula
#[derive(Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub names: &'a dyn NameResolver,
    pub functions: &'a FunctionRegistry,
    pub max_name_depth: usize,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(names: &'a dyn NameResolver, functions: &'a FunctionRegistry) -> Self {
        AnalysisContext {
            names,
            functions,
            max_name_depth: DEFAULT_MAX_NAME_DEPTH,
        }
    }
}

/// Areas a node hands to its parent, `None` when the node is not a reference
type Areas = Option<Vec<SheetArea>>;

struct Collector<'a> {
    sheet: &'a SheetName,
    ctx: &'a AnalysisContext<'a>,
    /// Names whose formulas are being visited
    visiting: Vec<Name>,
    dependencies: FormulaDependencies,
}

impl<'a> Collector<'a> {
    fn add(&mut self, areas: Areas) {
        if let Some(areas) = areas {
            self.dependencies.areas.extend(areas);
        }
    }

    fn visit(&mut self, expr: &Expr) -> Areas {
        match expr {
            Expr::Number(_) | Expr::String(_) | Expr::Boolean(_) | Expr::Error(_) | Expr::Array(_) => None,
            // Not evaluated, so nothing to depend on
            Expr::StructuredReference { .. } | Expr::Dde { .. } => None,
            Expr::Reference { prefix, area } => match prefix {
                None => Some(vec![SheetArea::new(self.sheet.clone(), area.range())]),
                Some(Prefix::Sheet(sheet)) => Some(vec![SheetArea::new(sheet.as_str(), area.range())]),
                Some(Prefix::SheetSpan { .. } | Prefix::External { .. }) => None,
            },
            Expr::Name { prefix, name } => self.visit_name(prefix.as_ref(), name),
            Expr::Unary { op, operand } => {
                let areas = self.visit(operand)?;
                match op {
                    // Sign operators turn the reference into values
                    UnaryOp::Neg | UnaryOp::Pos => {
                        self.add(Some(areas));
                        None
                    }
                    UnaryOp::Percent | UnaryOp::ImplicitIntersection | UnaryOp::Spill => Some(areas),
                }
            }
            Expr::Binary { left, op, right } => self.visit_binary(left, *op, right),
            Expr::FunctionCall { name, args } => self.visit_function(name, args),
            Expr::Grouped(inner) => self.visit(inner),
        }
    }

    fn visit_binary(&mut self, left: &Expr, op: BinaryOp, right: &Expr) -> Areas {
        let left = self.visit(left);

        // `Other!A1:B2:C3` continues on the sheet of the left side
        let right = match (op, right, left.as_deref()) {
            (BinaryOp::Range, Expr::Reference { prefix: None, area }, Some([first, rest @ ..]))
                if rest.iter().all(|a| a.sheet == first.sheet) =>
            {
                Some(vec![SheetArea::new(first.sheet.clone(), area.range())])
            }
            _ => self.visit(right),
        };

        match (left, right) {
            (Some(left), Some(right)) if op.is_reference_op() => combine(op, left, right),
            (left, right) => {
                self.add(left);
                self.add(right);
                None
            }
        }
    }

    fn visit_function(&mut self, name: &str, args: &[Expr]) -> Areas {
        // Unknown functions read their arguments like any other function
        let kind = self
            .ctx
            .functions
            .get(name)
            .map_or(FunctionKind::Value, |def| def.kind);

        let mut propagated: Areas = None;
        for (index, arg) in args.iter().enumerate() {
            let areas = self.visit(arg);
            match areas {
                Some(areas) if kind.passes_through(index) => {
                    propagated.get_or_insert_with(Vec::new).extend(areas);
                }
                areas => self.add(areas),
            }
        }
        propagated
    }

    fn visit_name(&mut self, prefix: Option<&Prefix>, name: &str) -> Areas {
        let (scope, written) = match prefix {
            None => (self.sheet.clone(), Name::book(name)),
            Some(Prefix::Sheet(sheet)) => {
                let sheet = SheetName::from(sheet.as_str());
                (sheet.clone(), Name::scoped(sheet, name))
            }
            Some(_) => return None,
        };
        self.dependencies.names.insert(written);

        let ctx = self.ctx;
        let (resolved, formula) = ctx.names.resolve(Some(&scope), name)?;
        if self.visiting.contains(&resolved) || self.visiting.len() >= ctx.max_name_depth {
            return None;
        }

        self.visiting.push(resolved);
        // A name that is a reference propagates, so `A1:Name` works
        let areas = self.visit(formula);
        self.visiting.pop();
        areas
    }
}

/// Apply a reference operator to the areas of both operands
fn combine(op: BinaryOp, mut left: Vec<SheetArea>, right: Vec<SheetArea>) -> Areas {
    match op {
        BinaryOp::Range => {
            // Largest area per sheet. Exact for `A1:B2:C3`, a superset for
            // operands that may come from several sheets.
            let mut bounds: Vec<SheetArea> = Vec::new();
            for area in left.into_iter().chain(right) {
                match bounds.iter_mut().find(|b| b.sheet == area.sheet) {
                    Some(bound) => bound.range = bound.range.bounding(&area.range),
                    None => bounds.push(area),
                }
            }
            Some(bounds)
        }
        // The common case of two areas is resolved, cells outside of the
        // intersection are never read
        BinaryOp::Intersection if left.len() == 1 && right.len() == 1 => {
            left[0].intersection(&right[0]).map(|area| vec![area])
        }
        _ => {
            left.extend(right);
            Some(left)
        }
    }
}

/// Collect the dependencies of a formula placed on `sheet`
pub fn collect_dependencies(formula: &Expr, sheet: &SheetName, ctx: &AnalysisContext<'_>) -> FormulaDependencies {
    let mut collector = Collector {
        sheet,
        ctx,
        visiting: Vec::new(),
        dependencies: FormulaDependencies::default(),
    };
    let root = collector.visit(formula);
    collector.add(root);
    collector.dependencies
}

/// Tracks which formulas read which areas and names
#[derive(Debug, Default)]
pub struct DependencyTree {
    /// Maps an area to the formulas reading it, per sheet
    dependents: HashMap<SheetName, HashMap<CellRange, HashSet<BookPoint>>>,

    /// Maps a name to the formulas using it
    name_dependents: HashMap<Name, HashSet<BookPoint>>,

    /// Maps a formula to its sheet and what it reads
    precedents: HashMap<BookPoint, (SheetName, FormulaDependencies)>,
}

impl DependencyTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the formula of a cell, replacing its previous formula
    pub fn add_formula(
        &mut self,
        point: BookPoint,
        sheet: &SheetName,
        formula: &Expr,
        ctx: &AnalysisContext<'_>,
    ) -> FormulaDependencies {
        self.remove_formula(point);

        let dependencies = collect_dependencies(formula, sheet, ctx);
        for area in &dependencies.areas {
            self.dependents
                .entry(area.sheet.clone())
                .or_default()
                .entry(area.range)
                .or_default()
                .insert(point);
        }
        for name in &dependencies.names {
            self.name_dependents.entry(name.clone()).or_default().insert(point);
        }

        self.precedents
            .insert(point, (sheet.clone(), dependencies.clone()));
        dependencies
    }

    /// Forget the formula of a cell
    pub fn remove_formula(&mut self, point: BookPoint) -> Option<FormulaDependencies> {
        let (_, dependencies) = self.precedents.remove(&point)?;

        for area in &dependencies.areas {
            let Some(ranges) = self.dependents.get_mut(&area.sheet) else {
                continue;
            };
            if let Some(owners) = ranges.get_mut(&area.range) {
                owners.remove(&point);
                if owners.is_empty() {
                    ranges.remove(&area.range);
                }
            }
            if ranges.is_empty() {
                self.dependents.remove(&area.sheet);
            }
        }
        for name in &dependencies.names {
            if let Some(owners) = self.name_dependents.get_mut(name) {
                owners.remove(&point);
                if owners.is_empty() {
                    self.name_dependents.remove(name);
                }
            }
        }

        Some(dependencies)
    }

    /// Forget all formulas of a deleted sheet
    pub fn purge_sheet(&mut self, sheet: SheetId) {
        let owners: Vec<BookPoint> = self
            .precedents
            .keys()
            .filter(|point| point.sheet == sheet)
            .copied()
            .collect();
        for point in owners {
            self.remove_formula(point);
        }
    }

    pub fn dependencies(&self, point: BookPoint) -> Option<&FormulaDependencies> {
        self.precedents.get(&point).map(|(_, dependencies)| dependencies)
    }

    /// Sheet of a registered formula
    pub fn formula_sheet(&self, point: BookPoint) -> Option<&SheetName> {
        self.precedents.get(&point).map(|(sheet, _)| sheet)
    }

    /// Formulas that use a name as it is written in them
    pub fn name_dependents(&self, name: &Name) -> Vec<BookPoint> {
        self.name_dependents
            .get(name)
            .map(|owners| owners.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Formulas using a name with this text, in any scope. Redefining a name
    /// may change what all of them resolve to.
    pub fn name_text_dependents(&self, name: &Ident) -> Vec<BookPoint> {
        let mut owners: Vec<BookPoint> = self
            .name_dependents
            .iter()
            .filter(|(written, _)| &written.name == name)
            .flat_map(|(_, owners)| owners.iter().copied())
            .collect();
        owners.sort();
        owners.dedup();
        owners
    }

    /// Formulas whose dependencies overlap an area
    pub fn area_dependents(&self, area: &SheetArea) -> Vec<BookPoint> {
        let Some(ranges) = self.dependents.get(&area.sheet) else {
            return Vec::new();
        };
        ranges
            .iter()
            .filter(|(range, _)| range.intersects(&area.range))
            .flat_map(|(_, owners)| owners.iter().copied())
            .collect()
    }

    /// Mark stale every formula that reads a changed area, and recursively
    /// their dependents. `mark` returns false for a formula that was already
    /// stale, its dependents are not visited again.
    pub fn mark_dirty(&self, area: &SheetArea, mut mark: impl FnMut(BookPoint) -> bool) {
        let mut pending = vec![area.clone()];

        while let Some(changed) = pending.pop() {
            for owner in self.area_dependents(&changed) {
                if !mark(owner) {
                    continue;
                }
                if let Some(sheet) = self.formula_sheet(owner) {
                    pending.push(SheetArea::cell(sheet.clone(), owner.cell));
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.precedents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.precedents.is_empty()
    }

    pub fn clear(&mut self) {
        self.dependents.clear();
        self.name_dependents.clear();
        self.precedents.clear();
    }
}
