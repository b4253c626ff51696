use serde::{Deserialize, Serialize};

use crate::cell::Scalar;
use crate::error::{CoreError, XlError};

/// A rectangular grid of scalars stored row by row. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Array {
    width: usize,
    height: usize,
    data: Vec<Scalar>,
}

impl Array {
    /// Largest number of elements an operator builds
    pub const MAX_CELLS: usize = 1 << 22;

    /// Can an array of this size be built?
    pub fn fits(width: usize, height: usize) -> bool {
        width.checked_mul(height).is_some_and(|cells| cells <= Self::MAX_CELLS)
    }

    pub fn new(width: usize, height: usize, data: Vec<Scalar>) -> Result<Self, CoreError> {
        if width == 0 || height == 0 || width * height != data.len() {
            return Err(CoreError::MalformedArray);
        }
        Ok(Array {
            width,
            height,
            data,
        })
    }

    /// Build an array from rows, all rows must have the same width
    pub fn from_rows(rows: Vec<Vec<Scalar>>) -> Result<Self, CoreError> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != width) {
            return Err(CoreError::MalformedArray);
        }
        Array::new(width, height, rows.into_iter().flatten().collect())
    }

    /// An array where every element is `value`
    pub fn filled(value: Scalar, width: usize, height: usize) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        Array {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Scalar> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.data.get(row * self.width + col)
    }

    /// Element at a position, `#N/A` outside of the array
    pub fn get_or_na(&self, row: usize, col: usize) -> Scalar {
        self.get(row, col)
            .cloned()
            .unwrap_or(Scalar::Error(XlError::NoValueAvailable))
    }

    pub fn top_left(&self) -> &Scalar {
        static BLANK: Scalar = Scalar::Blank;
        self.data.first().unwrap_or(&BLANK)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Scalar> {
        self.data.iter()
    }

    pub fn rows(&self) -> std::slice::Chunks<'_, Scalar> {
        self.data.chunks(self.width.max(1))
    }

    pub fn map(&self, mut op: impl FnMut(&Scalar) -> Scalar) -> Array {
        Array {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(&mut op).collect(),
        }
    }

    /// Combine two arrays element by element. The result covers both arrays,
    /// elements missing in one of them are `#N/A`.
    pub fn zip_with(&self, other: &Array, mut op: impl FnMut(&Scalar, &Scalar) -> Scalar) -> Array {
        let width = self.width.max(other.width);
        let height = self.height.max(other.height);
        let mut data = Vec::with_capacity(width * height);
        for row in 0..height {
            for col in 0..width {
                data.push(op(&self.get_or_na(row, col), &other.get_or_na(row, col)));
            }
        }
        Array {
            width,
            height,
            data,
        }
    }
}

impl<'a> IntoIterator for &'a Array {
    type Item = &'a Scalar;
    type IntoIter = std::slice::Iter<'a, Scalar>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
