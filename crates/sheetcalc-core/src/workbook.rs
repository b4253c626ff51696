use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::area::{BookPoint, Name, SheetId, SheetName};
use crate::cell::{CellContent, Scalar};
use crate::error::CoreError;
use crate::range::CellCoord;
use crate::sheet::Sheet;

/// A defined name and the formula it stands for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinedName {
    pub name: Name,
    /// Formula text without the leading '='
    pub formula: String,
}

/// A workbook containing multiple sheets and defined names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workbook {
    /// Workbook number used in book points
    pub id: u32,
    sheets: Vec<Sheet>,
    #[serde(default)]
    next_sheet_id: u32,
    #[serde(default)]
    names: Vec<DefinedName>,
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Workbook {
    /// Create an empty workbook, sheets are added with [`Workbook::add_sheet`]
    pub fn new(id: u32) -> Self {
        Self {
            id,
            sheets: Vec::new(),
            next_sheet_id: 0,
            names: Vec::new(),
        }
    }

    /// Add a new sheet with the given name
    pub fn add_sheet(&mut self, name: impl Into<SheetName>) -> Result<SheetId, CoreError> {
        let name = name.into();

        if name.as_str().trim().is_empty() {
            return Err(CoreError::InvalidSheetName(name.to_string()));
        }
        if self.sheets.iter().any(|s| s.name == name) {
            return Err(CoreError::DuplicateSheet(name.to_string()));
        }

        let id = SheetId(self.next_sheet_id);
        self.next_sheet_id += 1;
        self.sheets.push(Sheet::new(id, name));
        Ok(id)
    }

    /// Remove a sheet together with the names scoped to it
    pub fn remove_sheet(&mut self, id: SheetId) -> Result<Sheet, CoreError> {
        let index = self
            .sheets
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| CoreError::SheetNotFound(format!("#{}", id.0)))?;
        let sheet = self.sheets.remove(index);
        self.names
            .retain(|defined| defined.name.sheet.as_ref() != Some(&sheet.name));
        Ok(sheet)
    }

    pub fn sheet(&self, id: SheetId) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.id == id)
    }

    pub fn sheet_mut(&mut self, id: SheetId) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| s.id == id)
    }

    /// Get a sheet by name, names are case-insensitive
    pub fn sheet_by_name(&self, name: &str) -> Option<&Sheet> {
        let name = SheetName::from(name);
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_id(&self, name: &SheetName) -> Option<SheetId> {
        self.sheets.iter().find(|s| &s.name == name).map(|s| s.id)
    }

    pub fn sheets(&self) -> impl Iterator<Item = &Sheet> {
        self.sheets.iter()
    }

    /// Get the number of sheets
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Book point of a cell given by sheet name and A1 address
    pub fn book_point(&self, sheet: &str, a1: &str) -> Result<BookPoint, CoreError> {
        let id = self
            .sheet_by_name(sheet)
            .map(|s| s.id)
            .ok_or_else(|| CoreError::SheetNotFound(sheet.to_string()))?;
        Ok(BookPoint::new(self.id, id, CellCoord::from_a1(a1)?))
    }

    /// Value of a cell, blank for missing sheets and empty cells
    pub fn value(&self, point: BookPoint) -> Scalar {
        self.sheet(point.sheet)
            .map(|s| s.value(point.cell).clone())
            .unwrap_or_default()
    }

    pub fn content(&self, point: BookPoint) -> Option<&CellContent> {
        self.sheet(point.sheet)?.get(point.cell)
    }

    pub fn set_content(&mut self, point: BookPoint, content: CellContent) -> Result<(), CoreError> {
        let sheet = self
            .sheet_mut(point.sheet)
            .ok_or_else(|| CoreError::SheetNotFound(format!("#{}", point.sheet.0)))?;
        sheet.set(point.cell, content);
        Ok(())
    }

    /// Define or redefine a name
    pub fn define_name(&mut self, name: Name, formula: impl Into<String>) {
        let formula = formula.into();
        match self.names.iter_mut().find(|defined| defined.name == name) {
            Some(defined) => defined.formula = formula,
            None => self.names.push(DefinedName { name, formula }),
        }
    }

    pub fn remove_name(&mut self, name: &Name) -> Option<DefinedName> {
        let index = self.names.iter().position(|defined| &defined.name == name)?;
        Some(self.names.remove(index))
    }

    pub fn names(&self) -> impl Iterator<Item = &DefinedName> {
        self.names.iter()
    }

    /// Formula of a name as seen from a sheet: a name scoped to the sheet
    /// shadows a workbook-scoped name with the same text.
    pub fn resolve_name(&self, sheet: Option<&SheetName>, name: &str) -> Option<&DefinedName> {
        let scoped = sheet.map(|sheet| Name::scoped(sheet.clone(), name));
        let global = Name::book(name);
        scoped
            .and_then(|scoped| self.names.iter().find(|d| d.name == scoped))
            .or_else(|| self.names.iter().find(|d| d.name == global))
    }

    /// Names grouped by scope, workbook scope first
    pub fn names_by_scope(&self) -> BTreeMap<Option<&SheetName>, Vec<&DefinedName>> {
        let mut scopes: BTreeMap<_, Vec<_>> = BTreeMap::new();
        for defined in &self.names {
            scopes.entry(defined.name.sheet.as_ref()).or_default().push(defined);
        }
        scopes
    }

    /// Serialize the workbook to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize the workbook to pretty JSON
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a workbook from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
