use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::area::{SheetId, SheetName};
use crate::cell::{CellContent, Scalar};
use crate::range::{CellCoord, CellRange};

/// A sheet with sparse cell storage, only non-empty cells are stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sheet {
    pub id: SheetId,
    /// Sheet name (displayed in tab)
    pub name: SheetName,
    #[serde(default, with = "a1_cells_serde")]
    cells: HashMap<CellCoord, CellContent>,
}

/// Cells are serialized as a map keyed by A1 addresses ("B2": {...})
mod a1_cells_serde {
    use super::*;
    use serde::ser::SerializeMap;
    use serde::{de, Deserializer, Serializer};
    use std::collections::BTreeMap;
    use std::fmt;

    pub fn serialize<S>(cells: &HashMap<CellCoord, CellContent>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Sorted for stable output
        let sorted: BTreeMap<_, _> = cells.iter().collect();
        let mut map = serializer.serialize_map(Some(sorted.len()))?;
        for (coord, content) in sorted {
            map.serialize_entry(&coord.to_a1(), content)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<HashMap<CellCoord, CellContent>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CellsVisitor;

        impl<'de> de::Visitor<'de> for CellsVisitor {
            type Value = HashMap<CellCoord, CellContent>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map with A1 address keys")
            }

            fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
            where
                M: de::MapAccess<'de>,
            {
                let mut cells = HashMap::new();
                while let Some(key) = map.next_key::<String>()? {
                    let content: CellContent = map.next_value()?;
                    let coord = CellCoord::from_a1(&key).map_err(de::Error::custom)?;
                    if !content.is_empty() {
                        cells.insert(coord, content);
                    }
                }
                Ok(cells)
            }
        }

        deserializer.deserialize_map(CellsVisitor)
    }
}

impl Sheet {
    pub fn new(id: SheetId, name: impl Into<SheetName>) -> Self {
        Self {
            id,
            name: name.into(),
            cells: HashMap::new(),
        }
    }

    pub fn get(&self, coord: CellCoord) -> Option<&CellContent> {
        self.cells.get(&coord)
    }

    /// Value of a cell, blank for cells that were never set
    pub fn value(&self, coord: CellCoord) -> &Scalar {
        static BLANK: Scalar = Scalar::Blank;
        self.cells.get(&coord).map_or(&BLANK, CellContent::value)
    }

    /// Store content, empty content removes the cell
    pub fn set(&mut self, coord: CellCoord, content: CellContent) -> Option<CellContent> {
        if content.is_empty() {
            self.cells.remove(&coord)
        } else {
            self.cells.insert(coord, content)
        }
    }

    pub fn clear(&mut self, coord: CellCoord) -> Option<CellContent> {
        self.cells.remove(&coord)
    }

    /// Store the calculated value of a formula cell, other cells are left alone
    pub fn set_cached_value(&mut self, coord: CellCoord, value: Scalar) -> bool {
        match self.cells.get_mut(&coord) {
            Some(CellContent::Formula { cached_value, .. }) => {
                *cached_value = value;
                true
            }
            _ => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CellCoord, &CellContent)> {
        self.cells.iter()
    }

    /// Formula cells with their formula text
    pub fn formulas(&self) -> impl Iterator<Item = (CellCoord, &str)> {
        self.cells
            .iter()
            .filter_map(|(coord, content)| content.formula_expression().map(|f| (*coord, f)))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Smallest range containing all non-empty cells
    pub fn used_range(&self) -> Option<CellRange> {
        self.cells
            .keys()
            .map(|coord| CellRange::cell(*coord))
            .reduce(|acc, range| acc.bounding(&range))
    }
}
