pub mod area;
pub mod array;
pub mod cell;
pub mod coercion;
pub mod error;
pub mod locale;
pub mod range;
pub mod reference;
pub mod sheet;
pub mod value;
pub mod workbook;

pub use area::{BookPoint, Ident, Name, SheetArea, SheetId, SheetName};
pub use array::Array;
pub use cell::{compare_numbers, parse_cell_input, CellContent, Scalar};
pub use coercion::text_to_number;
pub use error::{CoreError, XlError};
pub use locale::{Collation, CurrencyPosition, DateOrder, Locale};
pub use range::{col_from_label, col_to_label, CellCoord, CellRange, MAX_COLS, MAX_ROWS};
pub use reference::Reference;
pub use sheet::Sheet;
pub use value::AnyValue;
pub use workbook::{DefinedName, Workbook};
