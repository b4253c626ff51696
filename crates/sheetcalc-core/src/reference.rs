use serde::{Deserialize, Serialize};

use crate::area::{SheetArea, SheetName};
use crate::error::XlError;
use crate::range::{CellCoord, CellRange};

/// One or more areas of a workbook. More than one area is a multi-area reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    areas: Vec<SheetArea>,
}

impl Reference {
    pub fn new(area: SheetArea) -> Self {
        Reference { areas: vec![area] }
    }

    /// `None` when there are no areas
    pub fn from_areas(areas: Vec<SheetArea>) -> Option<Self> {
        (!areas.is_empty()).then_some(Reference { areas })
    }

    pub fn areas(&self) -> &[SheetArea] {
        &self.areas
    }

    /// The only area of a single-area reference
    pub fn single_area(&self) -> Option<&SheetArea> {
        match self.areas.as_slice() {
            [area] => Some(area),
            _ => None,
        }
    }

    pub fn is_multi_area(&self) -> bool {
        self.areas.len() > 1
    }

    /// The `,` operator: areas of both references, nothing is merged
    pub fn union(&self, other: &Reference) -> Reference {
        let mut areas = self.areas.clone();
        areas.extend(other.areas.iter().cloned());
        Reference { areas }
    }

    /// The `:` operator: smallest area containing every area of both references.
    /// All areas must be on one sheet.
    pub fn range(&self, other: &Reference) -> Result<Reference, XlError> {
        let sheet = self.single_sheet(other)?;
        let bounds = self
            .areas
            .iter()
            .chain(&other.areas)
            .map(|area| area.range)
            .reduce(|acc, range| acc.bounding(&range))
            .ok_or(XlError::IncompatibleValue)?;
        Ok(Reference::new(SheetArea::new(sheet.clone(), bounds)))
    }

    /// The ` ` operator. Every area of the left reference is intersected with
    /// all areas of the right one, empty results are dropped.
    pub fn intersect(&self, other: &Reference) -> Result<Reference, XlError> {
        let sheet = self.single_sheet(other)?;
        let areas: Vec<SheetArea> = self
            .areas
            .iter()
            .filter_map(|left| {
                other
                    .areas
                    .iter()
                    .try_fold(left.range, |acc, right| acc.intersection(&right.range))
            })
            .map(|range| SheetArea::new(sheet.clone(), range))
            .collect();

        Reference::from_areas(areas).ok_or(XlError::NullValue)
    }

    /// The cell a scalar context reads from this reference when the formula is in
    /// `formula_cell`: a single cell, or the cell of a single row/column area on
    /// the formula's row/column.
    pub fn implicit_intersection(&self, formula_cell: CellCoord) -> Result<(&SheetName, CellCoord), XlError> {
        let area = self.single_area().ok_or(XlError::IncompatibleValue)?;
        let range = area.range;

        if range.is_single_cell() {
            return Ok((&area.sheet, range.start));
        }
        if range.width() == 1 && (range.start.row..=range.end.row).contains(&formula_cell.row) {
            return Ok((&area.sheet, CellCoord::new(formula_cell.row, range.start.col)));
        }
        if range.height() == 1 && (range.start.col..=range.end.col).contains(&formula_cell.col) {
            return Ok((&area.sheet, CellCoord::new(range.start.row, formula_cell.col)));
        }
        Err(XlError::IncompatibleValue)
    }

    /// Number of cells in all areas, overlapping cells are counted repeatedly
    pub fn cell_count(&self) -> u64 {
        self.areas.iter().map(|area| area.range.cell_count()).sum()
    }

    fn single_sheet<'a>(&'a self, other: &'a Reference) -> Result<&'a SheetName, XlError> {
        let mut sheets = self.areas.iter().chain(&other.areas).map(|area| &area.sheet);
        let first = sheets.next().ok_or(XlError::IncompatibleValue)?;
        if sheets.all(|sheet| sheet == first) {
            Ok(first)
        } else {
            Err(XlError::IncompatibleValue)
        }
    }
}

impl From<SheetArea> for Reference {
    fn from(area: SheetArea) -> Self {
        Reference::new(area)
    }
}

/// Reference to an area written in A1 notation, test and tooling helper
pub fn area_ref(sheet: &str, a1: &str) -> Option<Reference> {
    CellRange::from_a1(a1)
        .ok()
        .map(|range| Reference::new(SheetArea::new(sheet, range)))
}
