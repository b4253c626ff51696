use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use unicode_normalization::UnicodeNormalization as _;

use crate::range::{CellCoord, CellRange};

/// Case-insensitive identifier. Sheet names and defined names compare this way.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ident(String);

impl Ident {
    pub fn new(text: impl Into<String>) -> Self {
        Ident(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn folded(&self) -> impl Iterator<Item = char> + '_ {
        self.0.nfkc().flat_map(char::to_uppercase)
    }
}

impl PartialEq for Ident {
    fn eq(&self, other: &Self) -> bool {
        self.folded().eq(other.folded())
    }
}

impl Eq for Ident {}

impl Hash for Ident {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for c in self.folded() {
            c.hash(state);
        }
    }
}

impl PartialOrd for Ident {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ident {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded().cmp(other.folded())
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Ident {
    fn from(value: &str) -> Self {
        Ident::new(value)
    }
}

impl From<String> for Ident {
    fn from(value: String) -> Self {
        Ident(value)
    }
}

pub type SheetName = Ident;

/// Stable sheet identity inside a workbook, survives renames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SheetId(pub u32);

/// A rectangular area on a named sheet
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SheetArea {
    pub sheet: SheetName,
    pub range: CellRange,
}

impl SheetArea {
    pub fn new(sheet: impl Into<SheetName>, range: CellRange) -> Self {
        SheetArea {
            sheet: sheet.into(),
            range,
        }
    }

    pub fn cell(sheet: impl Into<SheetName>, coord: CellCoord) -> Self {
        SheetArea::new(sheet, CellRange::cell(coord))
    }

    /// Both areas are on the same sheet and share at least one cell
    pub fn overlaps(&self, other: &SheetArea) -> bool {
        self.sheet == other.sheet && self.range.intersects(&other.range)
    }

    pub fn intersection(&self, other: &SheetArea) -> Option<SheetArea> {
        if self.sheet != other.sheet {
            return None;
        }
        self.range
            .intersection(&other.range)
            .map(|range| SheetArea::new(self.sheet.clone(), range))
    }
}

impl fmt::Display for SheetArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.sheet.as_str();
        if name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            write!(f, "{}!{}", name, self.range)
        } else {
            write!(f, "'{}'!{}", name.replace('\'', "''"), self.range)
        }
    }
}

/// Global identity of a cell: workbook, sheet and position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BookPoint {
    pub book: u32,
    pub sheet: SheetId,
    pub cell: CellCoord,
}

impl BookPoint {
    pub fn new(book: u32, sheet: SheetId, cell: CellCoord) -> Self {
        BookPoint { book, sheet, cell }
    }
}

impl fmt::Display for BookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]#{}!{}", self.book, self.sheet.0, self.cell)
    }
}

/// A defined name. A sheet-scoped name is a different entity than
/// a workbook-scoped name with the same text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Name {
    pub sheet: Option<SheetName>,
    pub name: Ident,
}

impl Name {
    /// Workbook-scoped name
    pub fn book(name: impl Into<Ident>) -> Self {
        Name {
            sheet: None,
            name: name.into(),
        }
    }

    /// Sheet-scoped name
    pub fn scoped(sheet: impl Into<SheetName>, name: impl Into<Ident>) -> Self {
        Name {
            sheet: Some(sheet.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sheet {
            Some(sheet) => write!(f, "{}!{}", sheet, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}
