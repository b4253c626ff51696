use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Number of rows in a sheet (Excel compatibility)
pub const MAX_ROWS: u32 = 1_048_576;
/// Number of columns in a sheet (column XFD)
pub const MAX_COLS: u32 = 16_384;

/// Cell coordinate (0-indexed internally)
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    pub row: u32,
    pub col: u32,
}

impl CellCoord {
    pub const fn new(row: u32, col: u32) -> Self {
        CellCoord { row, col }
    }

    /// Parse A1 notation, `$` markers are accepted and ignored ("$B$2" -> (1, 1))
    pub fn from_a1(notation: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::InvalidReference(notation.to_string());
        let text: String = notation.trim().chars().filter(|c| *c != '$').collect();
        let split = text
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (letters, digits) = text.split_at(split);

        let col = col_from_label(letters).ok_or_else(invalid)?;
        let row: u32 = digits.parse().map_err(|_| invalid())?;
        if row == 0 || row > MAX_ROWS || col >= MAX_COLS {
            return Err(invalid());
        }

        Ok(CellCoord::new(row - 1, col))
    }

    /// Convert to A1 notation (e.g., (0, 0) -> "A1")
    pub fn to_a1(&self) -> String {
        format!("{}{}", col_to_label(self.col), self.row + 1)
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1())
    }
}

/// Convert column index (0-indexed) to label (A, B, ..., Z, AA, AB, ...)
pub fn col_to_label(col: u32) -> String {
    let mut label = Vec::new();
    let mut n = col + 1;

    while n > 0 {
        n -= 1;
        label.push(b'A' + (n % 26) as u8);
        n /= 26;
    }

    label.iter().rev().map(|b| char::from(*b)).collect()
}

/// Convert column label (A, B, ..., Z, AA, AB, ...) to index (0-indexed)
pub fn col_from_label(label: &str) -> Option<u32> {
    if label.is_empty() || label.len() > 3 {
        return None;
    }

    let mut col: u32 = 0;
    for c in label.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }

    Some(col - 1)
}

/// A rectangular block of cells on one sheet (e.g., A1:B10).
/// `start` is always the top-left and `end` the bottom-right corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRange {
    pub start: CellCoord,
    pub end: CellCoord,
}

impl CellRange {
    pub fn new(a: CellCoord, b: CellCoord) -> Self {
        CellRange {
            start: CellCoord::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellCoord::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    /// A range covering exactly one cell
    pub fn cell(coord: CellCoord) -> Self {
        CellRange {
            start: coord,
            end: coord,
        }
    }

    /// Parse "A1" or "A1:B10"
    pub fn from_a1(notation: &str) -> Result<Self, CoreError> {
        match notation.split_once(':') {
            Some((first, second)) => Ok(CellRange::new(
                CellCoord::from_a1(first)?,
                CellCoord::from_a1(second)?,
            )),
            None => CellCoord::from_a1(notation).map(CellRange::cell),
        }
    }

    pub fn to_a1(&self) -> String {
        if self.is_single_cell() {
            self.start.to_a1()
        } else {
            format!("{}:{}", self.start.to_a1(), self.end.to_a1())
        }
    }

    pub fn contains(&self, coord: CellCoord) -> bool {
        (self.start.row..=self.end.row).contains(&coord.row)
            && (self.start.col..=self.end.col).contains(&coord.col)
    }

    /// Number of rows
    pub fn height(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    /// Number of columns
    pub fn width(&self) -> u32 {
        self.end.col - self.start.col + 1
    }

    pub fn cell_count(&self) -> u64 {
        u64::from(self.height()) * u64::from(self.width())
    }

    pub fn is_single_cell(&self) -> bool {
        self.start == self.end
    }

    pub fn intersects(&self, other: &CellRange) -> bool {
        self.start.row <= other.end.row
            && other.start.row <= self.end.row
            && self.start.col <= other.end.col
            && other.start.col <= self.end.col
    }

    /// The overlapping block of both ranges, `None` when they are disjoint
    pub fn intersection(&self, other: &CellRange) -> Option<CellRange> {
        if !self.intersects(other) {
            return None;
        }

        Some(CellRange {
            start: CellCoord::new(
                self.start.row.max(other.start.row),
                self.start.col.max(other.start.col),
            ),
            end: CellCoord::new(
                self.end.row.min(other.end.row),
                self.end.col.min(other.end.col),
            ),
        })
    }

    /// The smallest range containing both ranges (the `:` operator)
    pub fn bounding(&self, other: &CellRange) -> CellRange {
        CellRange {
            start: CellCoord::new(
                self.start.row.min(other.start.row),
                self.start.col.min(other.start.col),
            ),
            end: CellCoord::new(
                self.end.row.max(other.end.row),
                self.end.col.max(other.end.col),
            ),
        }
    }

    /// Coordinate at an offset from the top-left corner, `None` outside of the range
    pub fn at(&self, row_offset: u32, col_offset: u32) -> Option<CellCoord> {
        let coord = CellCoord::new(
            self.start.row.checked_add(row_offset)?,
            self.start.col.checked_add(col_offset)?,
        );
        self.contains(coord).then_some(coord)
    }

    /// Iterate over all coordinates in the range (row by row)
    pub fn iter(&self) -> CellRangeIter {
        CellRangeIter {
            range: *self,
            next: Some(self.start),
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

impl IntoIterator for CellRange {
    type Item = CellCoord;
    type IntoIter = CellRangeIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Row-major iterator over coordinates in a range
pub struct CellRangeIter {
    range: CellRange,
    next: Option<CellCoord>,
}

impl Iterator for CellRangeIter {
    type Item = CellCoord;

    fn next(&mut self) -> Option<Self::Item> {
        let coord = self.next?;

        self.next = if coord.col < self.range.end.col {
            Some(CellCoord::new(coord.row, coord.col + 1))
        } else if coord.row < self.range.end.row {
            Some(CellCoord::new(coord.row + 1, self.range.start.col))
        } else {
            None
        };

        Some(coord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_col_labels() {
        assert_eq!(col_to_label(0), "A");
        assert_eq!(col_to_label(26), "AA");
        assert_eq!(col_to_label(701), "ZZ");
        assert_eq!(col_to_label(16_383), "XFD");
        assert_eq!(col_from_label("ab"), Some(27));
        assert_eq!(col_from_label("XFD"), Some(16_383));
        assert_eq!(col_from_label("ABCD"), None);
    }

    #[test]
    fn test_coord_a1() {
        assert_eq!(CellCoord::from_a1("B2"), Ok(CellCoord::new(1, 1)));
        assert_eq!(CellCoord::from_a1("$AA$100"), Ok(CellCoord::new(99, 26)));
        assert_eq!(CellCoord::new(99, 26).to_a1(), "AA100");
        assert!(CellCoord::from_a1("A0").is_err());
        assert!(CellCoord::from_a1("XFE1").is_err());
        assert!(CellCoord::from_a1("1A").is_err());
    }

    #[test]
    fn test_range_normalizes_corners() {
        let range = CellRange::from_a1("C3:A1").unwrap();
        assert_eq!(range.to_a1(), "A1:C3");
        assert_eq!(range.width(), 3);
        assert_eq!(range.height(), 3);
    }

    #[test]
    fn test_intersection_and_bounding() {
        let a = CellRange::from_a1("A1:C3").unwrap();
        let b = CellRange::from_a1("B2:D2").unwrap();
        assert_eq!(a.intersection(&b), CellRange::from_a1("B2:C2").ok());
        assert_eq!(a.bounding(&b).to_a1(), "A1:D3");

        let far = CellRange::from_a1("F5").unwrap();
        assert_eq!(a.intersection(&far), None);
    }

    #[test]
    fn test_range_iteration() {
        let coords: Vec<_> = CellRange::from_a1("A1:B2").unwrap().iter().collect();
        assert_eq!(
            coords,
            vec![
                CellCoord::new(0, 0),
                CellCoord::new(0, 1),
                CellCoord::new(1, 0),
                CellCoord::new(1, 1)
            ]
        );
    }
}
