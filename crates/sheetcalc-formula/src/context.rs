use std::collections::HashMap;

use sheetcalc_core::{CellCoord, Locale, Name, Scalar, SheetArea, SheetName, Workbook};

use crate::ast::Expr;
use crate::error::CalcResult;
use crate::functions::FunctionRegistry;

/// Default limit of nested defined names
pub const DEFAULT_MAX_NAME_DEPTH: usize = 64;

/// Lookup of defined names and their parsed formulas
pub trait NameResolver {
    /// The name a formula on `sheet` means by `name`: a name scoped to the
    /// sheet shadows a workbook-scoped one.
    fn resolve(&self, sheet: Option<&SheetName>, name: &str) -> Option<(Name, &Expr)>;
}

impl NameResolver for HashMap<Name, Expr> {
    fn resolve(&self, sheet: Option<&SheetName>, name: &str) -> Option<(Name, &Expr)> {
        let scoped = sheet
            .map(|sheet| Name::scoped(sheet.clone(), name))
            .and_then(|scoped| self.get_key_value(&scoped));
        scoped
            .or_else(|| self.get_key_value(&Name::book(name)))
            .map(|(name, formula)| (name.clone(), formula))
    }
}

/// Everything a formula can see while it is evaluated
pub trait CalcContext {
    fn locale(&self) -> &Locale;

    /// Sheet of the formula being evaluated
    fn formula_sheet(&self) -> &SheetName;

    /// Cell of the formula being evaluated, used for implicit intersection
    fn formula_cell(&self) -> CellCoord;

    fn sheet_exists(&self, sheet: &SheetName) -> bool;

    /// Value of one cell. Fails when the cell waits for calculation.
    fn cell_value(&self, sheet: &SheetName, cell: CellCoord) -> CalcResult<Scalar>;

    /// Non-blank cells of an area in row-major order
    fn used_cells(&self, area: &SheetArea) -> CalcResult<Vec<(CellCoord, Scalar)>>;

    fn names(&self) -> &dyn NameResolver;

    fn functions(&self) -> &FunctionRegistry;

    fn max_name_depth(&self) -> usize {
        DEFAULT_MAX_NAME_DEPTH
    }

    /// Unknown functions evaluate to `#NAME?` unless this is true
    fn reject_unknown_functions(&self) -> bool {
        false
    }
}

/// Non-blank cells of a sheet area, read straight from a workbook
pub(crate) fn workbook_cells(workbook: &Workbook, area: &SheetArea) -> Vec<(CellCoord, Scalar)> {
    let Some(sheet) = workbook.sheet_by_name(area.sheet.as_str()) else {
        return Vec::new();
    };

    let mut cells: Vec<(CellCoord, Scalar)> = sheet
        .iter()
        .filter(|(coord, content)| area.range.contains(**coord) && !content.value().is_blank())
        .map(|(coord, content)| (*coord, content.value().clone()))
        .collect();
    cells.sort_by_key(|(coord, _)| (coord.row, coord.col));
    cells
}

/// Evaluation context over a workbook whose cached values are all current
pub struct WorkbookContext<'a> {
    workbook: &'a Workbook,
    sheet: SheetName,
    cell: CellCoord,
    locale: &'a Locale,
    names: &'a HashMap<Name, Expr>,
    functions: &'a FunctionRegistry,
}

impl<'a> WorkbookContext<'a> {
    pub fn new(
        workbook: &'a Workbook,
        sheet: SheetName,
        cell: CellCoord,
        locale: &'a Locale,
        names: &'a HashMap<Name, Expr>,
        functions: &'a FunctionRegistry,
    ) -> Self {
        Self {
            workbook,
            sheet,
            cell,
            locale,
            names,
            functions,
        }
    }
}

impl CalcContext for WorkbookContext<'_> {
    fn locale(&self) -> &Locale {
        self.locale
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
        Ok(self
            .workbook
            .sheet_by_name(sheet.as_str())
            .map(|s| s.value(cell).clone())
            .unwrap_or_default())
    }

    fn used_cells(&self, area: &SheetArea) -> CalcResult<Vec<(CellCoord, Scalar)>> {
        Ok(workbook_cells(self.workbook, area))
    }

    fn names(&self) -> &dyn NameResolver {
        self.names
    }

    fn functions(&self) -> &FunctionRegistry {
        self.functions
    }
}
