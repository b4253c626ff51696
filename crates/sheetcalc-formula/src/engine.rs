//! Recalculation of the formulas of a workbook.
//!
//! The engine keeps the parsed formulas, their dependencies and the set of
//! stale formula cells. Changing a cell only marks formulas stale; they are
//! calculated by [`CalcEngine::recalculate`] or on demand by
//! [`CalcEngine::evaluate_cell`].
//!
//! A formula that reads a stale cell does not calculate it recursively. The
//! evaluation gives up with a [`CalcError::PrecedentNotCalculated`] signal,
//! the stale cell is moved in front of the formula in the calculation chain
//! and calculated first. A cell reached again before it could finish is part
//! of a circular reference.

use std::collections::{HashMap, HashSet};

use sheetcalc_core::{
    parse_cell_input, BookPoint, CellContent, CellCoord, CellRange, Locale, Name, Scalar, Sheet,
    SheetArea, SheetId, SheetName, Workbook, MAX_COLS, MAX_ROWS,
};
use tracing::{debug, trace, warn};

use crate::ast::Expr;
use crate::chain::CalculationChain;
use crate::config::EngineConfig;
use crate::context::{workbook_cells, CalcContext, NameResolver};
use crate::dependency::{AnalysisContext, DependencyTree};
use crate::error::{CalcError, CalcResult};
use crate::evaluator::Evaluator;
use crate::functions::FunctionRegistry;
use crate::parser::parse_formula;

fn whole_sheet(sheet: SheetName) -> SheetArea {
    SheetArea::new(
        sheet,
        CellRange::new(CellCoord::new(0, 0), CellCoord::new(MAX_ROWS - 1, MAX_COLS - 1)),
    )
}

fn sheet_name(workbook: &Workbook, sheet: SheetId) -> CalcResult<SheetName> {
    workbook
        .sheet(sheet)
        .map(|s| s.name.clone())
        .ok_or_else(|| CalcError::UnknownSheet(format!("#{}", sheet.0)))
}

/// Drives recalculation of the formulas of one workbook
#[derive(Debug)]
pub struct CalcEngine {
    config: EngineConfig,
    locale: Locale,
    functions: FunctionRegistry,
    names: HashMap<Name, Expr>,
    formulas: HashMap<BookPoint, Expr>,
    tree: DependencyTree,
    chain: CalculationChain,
    dirty: HashSet<BookPoint>,
    failures: HashMap<BookPoint, CalcError>,
}

impl Default for CalcEngine {
    fn default() -> Self {
        Self::with_locale(EngineConfig::default(), Locale::en_us())
    }
}

impl CalcEngine {
    pub fn new(config: EngineConfig) -> CalcResult<Self> {
        let locale = config.locale()?;
        Ok(Self::with_locale(config, locale))
    }

    fn with_locale(config: EngineConfig, locale: Locale) -> Self {
        Self {
            config,
            locale,
            functions: FunctionRegistry::new(),
            names: HashMap::new(),
            formulas: HashMap::new(),
            tree: DependencyTree::new(),
            chain: CalculationChain::new(),
            dirty: HashSet::new(),
            failures: HashMap::new(),
        }
    }

    /// Engine for the names and formulas already stored in a workbook. All
    /// formulas start stale.
    pub fn from_workbook(workbook: &Workbook, config: EngineConfig) -> CalcResult<Self> {
        let mut engine = Self::new(config)?;

        for defined in workbook.names() {
            match parse_formula(&defined.formula) {
                Ok(formula) => {
                    engine.names.insert(defined.name.clone(), formula);
                }
                Err(error) => warn!(name = %defined.name, %error, "skipping unparsable name"),
            }
        }

        let mut formulas: Vec<(BookPoint, SheetName, &str)> = workbook
            .sheets()
            .flat_map(|sheet| {
                sheet.formulas().map(move |(cell, expression)| {
                    (BookPoint::new(workbook.id, sheet.id, cell), sheet.name.clone(), expression)
                })
            })
            .collect();
        formulas.sort_by_key(|(point, _, _)| *point);

        for (point, sheet, expression) in formulas {
            match parse_formula(expression) {
                Ok(formula) => {
                    engine.register_formula(point, &sheet, formula);
                    engine.dirty.insert(point);
                }
                Err(error) => {
                    warn!(%point, %error, "formula does not parse");
                    engine.failures.insert(point, error);
                }
            }
        }

        debug!(formulas = engine.formulas.len(), names = engine.names.len(), "loaded workbook");
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Register additional functions. Formulas already set keep the
    /// dependencies they were analyzed with.
    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.functions
    }

    pub fn dependencies(&self) -> &DependencyTree {
        &self.tree
    }

    pub fn chain(&self) -> &CalculationChain {
        &self.chain
    }

    /// Does the formula of a cell wait for calculation?
    pub fn needs_recalculation(&self, point: BookPoint) -> bool {
        self.dirty.contains(&point)
    }

    /// Number of formulas waiting for calculation
    pub fn pending(&self) -> usize {
        self.dirty.len()
    }

    /// Why the last calculation of a formula failed
    pub fn failure(&self, point: BookPoint) -> Option<&CalcError> {
        self.failures.get(&point)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&BookPoint, &CalcError)> {
        self.failures.iter()
    }

    /// Store a constant in a cell
    pub fn set_value(
        &mut self,
        workbook: &mut Workbook,
        point: BookPoint,
        value: impl Into<Scalar>,
    ) -> CalcResult<()> {
        let sheet = sheet_name(workbook, point.sheet)?;
        workbook.set_content(point, CellContent::Value { value: value.into() })?;
        self.forget_formula(point);
        self.invalidate(&SheetArea::cell(sheet, point.cell));
        Ok(())
    }

    /// Store a formula in a cell, with or without the leading `=`
    pub fn set_formula(&mut self, workbook: &mut Workbook, point: BookPoint, text: &str) -> CalcResult<()> {
        let expression = text.strip_prefix('=').unwrap_or(text);
        let formula = parse_formula(expression)?;
        let sheet = sheet_name(workbook, point.sheet)?;
        workbook.set_content(point, CellContent::formula(expression))?;

        self.failures.remove(&point);
        self.register_formula(point, &sheet, formula);
        self.dirty.insert(point);
        self.invalidate(&SheetArea::cell(sheet, point.cell));
        Ok(())
    }

    /// Store user input: text starting with `=` is a formula, anything else
    /// is coerced to a constant
    pub fn set_input(&mut self, workbook: &mut Workbook, point: BookPoint, input: &str) -> CalcResult<()> {
        match parse_cell_input(input, &self.locale) {
            CellContent::Formula { expression, .. } => self.set_formula(workbook, point, &expression),
            CellContent::Value { value } => self.set_value(workbook, point, value),
        }
    }

    pub fn clear_cell(&mut self, workbook: &mut Workbook, point: BookPoint) -> CalcResult<()> {
        let sheet = sheet_name(workbook, point.sheet)?;
        if let Some(s) = workbook.sheet_mut(point.sheet) {
            s.clear(point.cell);
        }
        self.forget_formula(point);
        self.invalidate(&SheetArea::cell(sheet, point.cell));
        Ok(())
    }

    /// Define or redefine a name. Formulas using the name are analyzed again
    /// and become stale.
    pub fn define_name(&mut self, workbook: &mut Workbook, name: Name, text: &str) -> CalcResult<()> {
        let expression = text.strip_prefix('=').unwrap_or(text);
        let formula = parse_formula(expression)?;
        workbook.define_name(name.clone(), expression);
        self.names.insert(name.clone(), formula);
        self.refresh_name(&name);
        Ok(())
    }

    pub fn remove_name(&mut self, workbook: &mut Workbook, name: &Name) -> bool {
        workbook.remove_name(name);
        if self.names.remove(name).is_none() {
            return false;
        }
        self.refresh_name(name);
        true
    }

    /// Add a sheet. Formulas that referred to it while it was missing become
    /// stale.
    pub fn add_sheet(&mut self, workbook: &mut Workbook, name: impl Into<SheetName>) -> CalcResult<SheetId> {
        let name = name.into();
        let id = workbook.add_sheet(name.clone())?;
        self.invalidate(&whole_sheet(name));
        Ok(id)
    }

    /// Delete a sheet with its formulas and scoped names. Formulas on other
    /// sheets reading it become stale.
    pub fn remove_sheet(&mut self, workbook: &mut Workbook, id: SheetId) -> CalcResult<Sheet> {
        let sheet = workbook.remove_sheet(id)?;

        self.tree.purge_sheet(id);
        let points: Vec<BookPoint> = self
            .formulas
            .keys()
            .chain(self.failures.keys())
            .filter(|point| point.sheet == id)
            .copied()
            .collect();
        for point in points {
            self.forget_formula(point);
        }

        let scoped: Vec<Name> = self
            .names
            .keys()
            .filter(|name| name.sheet.as_ref() == Some(&sheet.name))
            .cloned()
            .collect();
        for name in scoped {
            self.names.remove(&name);
            self.refresh_name(&name);
        }

        self.invalidate(&whole_sheet(sheet.name.clone()));
        debug!(sheet = %sheet.name, "removed sheet");
        Ok(sheet)
    }

    /// Calculate every stale formula. Returns how many formulas were
    /// calculated.
    pub fn recalculate(&mut self, workbook: &mut Workbook) -> CalcResult<usize> {
        if self.dirty.is_empty() {
            return Ok(0);
        }
        self.chain.set_target(None);
        self.run(workbook)
    }

    /// Value of one cell, calculating only what the chain holds up to it
    pub fn evaluate_cell(&mut self, workbook: &mut Workbook, point: BookPoint) -> CalcResult<Scalar> {
        if self.dirty.contains(&point) {
            self.chain.set_target(Some(point));
            self.run(workbook)?;
        }
        match self.failures.get(&point) {
            Some(failure) => Err(failure.clone()),
            None => Ok(workbook.value(point)),
        }
    }

    fn register_formula(&mut self, point: BookPoint, sheet: &SheetName, formula: Expr) {
        let analysis = AnalysisContext {
            names: &self.names,
            functions: &self.functions,
            max_name_depth: self.config.max_name_depth,
        };
        self.tree.add_formula(point, sheet, &formula, &analysis);
        self.formulas.insert(point, formula);
        if !self.chain.contains(point) {
            self.chain.add_last(point);
        }
    }

    fn forget_formula(&mut self, point: BookPoint) {
        self.tree.remove_formula(point);
        self.formulas.remove(&point);
        self.dirty.remove(&point);
        self.failures.remove(&point);
        if self.chain.contains(point) {
            // Contained, so removing cannot fail
            let _ = self.chain.remove(point);
        }
    }

    /// Mark stale the formulas reading an area, and their dependents
    fn invalidate(&mut self, area: &SheetArea) {
        let dirty = &mut self.dirty;
        self.tree.mark_dirty(area, |point| dirty.insert(point));
    }

    /// Analyze again the formulas using a name and mark them stale
    fn refresh_name(&mut self, name: &Name) {
        for point in self.tree.name_text_dependents(&name.name) {
            let Some(sheet) = self.tree.formula_sheet(point).cloned() else {
                continue;
            };
            if let Some(formula) = self.formulas.get(&point) {
                let analysis = AnalysisContext {
                    names: &self.names,
                    functions: &self.functions,
                    max_name_depth: self.config.max_name_depth,
                };
                self.tree.add_formula(point, &sheet, formula, &analysis);
            }
            self.dirty.insert(point);
            self.invalidate(&SheetArea::cell(sheet, point.cell));
        }
    }

    /// Walk the chain and calculate stale formulas until the walk ends or
    /// reaches the target
    fn run(&mut self, workbook: &mut Workbook) -> CalcResult<usize> {
        debug!(pending = self.dirty.len(), "recalculation started");
        let mut calculated = 0;
        let mut cycles = 0;

        while self.chain.move_ahead() {
            while let Some(point) = self.chain.current() {
                if self.chain.is_current_in_cycle() {
                    warn!(%point, "circular reference");
                    self.dirty.remove(&point);
                    self.failures
                        .insert(point, CalcError::CircularReference { cell: point });
                    cycles += 1;
                    break;
                }
                if !self.dirty.contains(&point) {
                    break;
                }

                match self.calculate(workbook, point) {
                    Err(CalcError::PrecedentNotCalculated(precedent)) => {
                        trace!(%point, %precedent, "calculating precedent first");
                        if let Err(error) = self.chain.move_to_current(precedent) {
                            warn!(%point, %error, "precedent cannot be calculated");
                            self.dirty.remove(&point);
                            self.failures.insert(point, error);
                            break;
                        }
                    }
                    Ok(value) => {
                        if let Some(sheet) = workbook.sheet_mut(point.sheet) {
                            sheet.set_cached_value(point.cell, value);
                        }
                        self.dirty.remove(&point);
                        self.failures.remove(&point);
                        calculated += 1;
                        break;
                    }
                    Err(error) => {
                        // Readers of a failed cell fail the same way
                        let error = match error {
                            CalcError::CircularReference { .. } => {
                                CalcError::CircularReference { cell: point }
                            }
                            error => error,
                        };
                        warn!(%point, %error, "formula failed");
                        self.dirty.remove(&point);
                        self.failures.insert(point, error);
                        break;
                    }
                }
            }
        }

        self.chain.reset();
        debug!(calculated, cycles, pending = self.dirty.len(), "recalculation finished");
        Ok(calculated)
    }

    /// Evaluate the formula of a cell to the value stored in the cell
    fn calculate(&self, workbook: &Workbook, point: BookPoint) -> CalcResult<Scalar> {
        let formula = self
            .formulas
            .get(&point)
            .ok_or(CalcError::PointNotInChain(point))?;
        let ctx = EngineContext {
            engine: self,
            workbook,
            sheet: sheet_name(workbook, point.sheet)?,
            cell: point.cell,
        };

        let evaluator = Evaluator::new(&ctx);
        let value = evaluator.evaluate(formula)?;
        let value = evaluator.to_scalar(value)?;
        // A formula showing an empty cell shows 0
        Ok(if value.is_blank() { Scalar::Number(0.0) } else { value })
    }

    /// Fails when a formula cell has no current value
    fn check_calculated(&self, point: BookPoint) -> CalcResult<()> {
        if self.dirty.contains(&point) {
            return Err(CalcError::PrecedentNotCalculated(point));
        }
        match self.failures.get(&point) {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }
}

/// Evaluation context of one formula cell during recalculation
struct EngineContext<'a> {
    engine: &'a CalcEngine,
    workbook: &'a Workbook,
    sheet: SheetName,
    cell: CellCoord,
}

impl CalcContext for EngineContext<'_> {
    fn locale(&self) -> &Locale {
        &self.engine.locale
    }

    fn formula_sheet(&self) -> &SheetName {
        &self.sheet
    }

    fn formula_cell(&self) -> CellCoord {
        self.cell
    }

    fn sheet_exists(&self, sheet: &SheetName) -> bool {
        self.workbook.sheet_id(sheet).is_some()
    }

    fn cell_value(&self, sheet: &SheetName, cell: CellCoord) -> CalcResult<Scalar> {
        let Some(id) = self.workbook.sheet_id(sheet) else {
            return Ok(Scalar::Blank);
        };
        let point = BookPoint::new(self.workbook.id, id, cell);
        self.engine.check_calculated(point)?;
        Ok(self.workbook.value(point))
    }

    fn used_cells(&self, area: &SheetArea) -> CalcResult<Vec<(CellCoord, Scalar)>> {
        let Some(sheet) = self.workbook.sheet_by_name(area.sheet.as_str()) else {
            return Ok(Vec::new());
        };
        for (cell, _) in sheet.formulas().filter(|(cell, _)| area.range.contains(*cell)) {
            self.engine
                .check_calculated(BookPoint::new(self.workbook.id, sheet.id, cell))?;
        }
        Ok(workbook_cells(self.workbook, area))
    }

    fn names(&self) -> &dyn NameResolver {
        &self.engine.names
    }

    fn functions(&self) -> &FunctionRegistry {
        &self.engine.functions
    }

    fn max_name_depth(&self) -> usize {
        self.engine.config.max_name_depth
    }

    fn reject_unknown_functions(&self) -> bool {
        self.engine.config.reject_unknown_functions
    }
}
