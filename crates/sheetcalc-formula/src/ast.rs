use sheetcalc_core::{col_to_label, Array, CellCoord, CellRange, XlError};
use std::fmt;

/// A cell address as written in a formula (e.g., A1, $B$2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
    pub abs_row: bool, // A$1 vs A1
    pub abs_col: bool, // $A1 vs A1
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        CellRef {
            row,
            col,
            abs_row: false,
            abs_col: false,
        }
    }

    pub fn coord(&self) -> CellCoord {
        CellCoord::new(self.row, self.col)
    }
}

/// A rectangular area written as `A1` or `A1:B10`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AreaRef {
    pub start: CellRef,
    pub end: CellRef,
}

impl AreaRef {
    pub fn cell(cell: CellRef) -> Self {
        AreaRef {
            start: cell,
            end: cell,
        }
    }

    pub fn range(&self) -> CellRange {
        CellRange::new(self.start.coord(), self.end.coord())
    }
}

/// Qualifier in front of a reference or a name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Prefix {
    /// `Sheet1!` or `'My Sheet'!`
    Sheet(String),
    /// `Sheet1:Sheet3!`, a 3-D reference
    SheetSpan { first: String, last: String },
    /// `[1]Sheet1!` or `[Book.xlsx]!`, a link to another workbook
    External { book: String, sheet: Option<String> },
}

/// Abstract Syntax Tree for formula expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // Literals
    Number(f64),
    String(String),
    Boolean(bool),
    Error(XlError),
    Array(Array),

    // Area reference (e.g., A1, Sheet1!$B$2:C10)
    Reference {
        prefix: Option<Prefix>,
        area: AreaRef,
    },

    // Defined name (e.g., TaxRate, Sheet1!Total)
    Name {
        prefix: Option<Prefix>,
        name: String,
    },

    // Table reference (e.g., Sales[Amount])
    StructuredReference {
        table: String,
        specifier: String,
    },

    // Dynamic data exchange link (e.g., app|topic!item)
    Dde {
        application: String,
        topic: String,
        item: String,
    },

    // Binary operation
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },

    // Unary operation
    Unary { op: UnaryOp, operand: Box<Expr> },

    // Function call (e.g., SUM(A1:A10))
    FunctionCall { name: String, args: Vec<Expr> },

    // Parenthesized expression
    Grouped(Box<Expr>),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Pow,

    // String
    Concat,

    // Comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,

    // Reference
    Range,        // :
    Union,        // ,
    Intersection, // space
}

impl BinaryOp {
    /// Get the precedence of this operator (higher = binds tighter)
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => 1,
            BinaryOp::Concat => 2,
            BinaryOp::Add | BinaryOp::Sub => 3,
            BinaryOp::Mul | BinaryOp::Div => 4,
            BinaryOp::Pow => 5,
            BinaryOp::Union => 6,
            BinaryOp::Intersection => 7,
            BinaryOp::Range => 8,
        }
    }

    pub fn is_comparison(&self) -> bool {
        self.precedence() == 1
    }

    pub fn is_reference_op(&self) -> bool {
        matches!(self, BinaryOp::Range | BinaryOp::Union | BinaryOp::Intersection)
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,                  // -
    Pos,                  // +
    Percent,              // %
    ImplicitIntersection, // @
    Spill,                // #
}

impl Expr {
    /// Create a number expression
    pub fn number(n: f64) -> Self {
        Expr::Number(n)
    }

    /// Create a string expression
    pub fn string(s: impl Into<String>) -> Self {
        Expr::String(s.into())
    }

    /// Create a reference to a single cell on the formula's sheet
    pub fn cell_ref(row: u32, col: u32) -> Self {
        Expr::Reference {
            prefix: None,
            area: AreaRef::cell(CellRef::new(row, col)),
        }
    }

    /// Create a reference to an area on the formula's sheet
    pub fn area_ref(start: CellRef, end: CellRef) -> Self {
        Expr::Reference {
            prefix: None,
            area: AreaRef { start, end },
        }
    }

    /// Create a name expression without a prefix
    pub fn name(name: impl Into<String>) -> Self {
        Expr::Name {
            prefix: None,
            name: name.into(),
        }
    }

    /// Create a binary expression
    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Create a unary expression
    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Create a function call expression
    pub fn function(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::FunctionCall {
            name: name.into(),
            args,
        }
    }

    /// Reference or name without a sheet, workbook or 3-D qualifier
    pub fn is_unqualified(&self) -> bool {
        matches!(
            self,
            Expr::Reference { prefix: None, .. } | Expr::Name { prefix: None, .. }
        )
    }
}

fn write_sheet(f: &mut fmt::Formatter<'_>, sheet: &str) -> fmt::Result {
    let plain = sheet.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.');
    if plain && !crate::parser::is_cell_address(sheet) {
        write!(f, "{}", sheet)
    } else {
        write!(f, "'{}'", sheet.replace('\'', "''"))
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::Sheet(sheet) => write_sheet(f, sheet)?,
            Prefix::SheetSpan { first, last } => {
                write_sheet(f, first)?;
                write!(f, ":")?;
                write_sheet(f, last)?;
            }
            Prefix::External { book, sheet } => {
                write!(f, "[{}]", book)?;
                if let Some(sheet) = sheet {
                    write_sheet(f, sheet)?;
                }
            }
        }
        write!(f, "!")
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}",
            if self.abs_col { "$" } else { "" },
            col_to_label(self.col),
            if self.abs_row { "$" } else { "" },
            self.row + 1 // Convert back to 1-indexed
        )
    }
}

impl fmt::Display for AreaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => {
                // Format numbers without unnecessary decimals
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Expr::String(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            Expr::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Expr::Error(e) => write!(f, "{}", e),
            Expr::Array(array) => {
                write!(f, "{{")?;
                for (r, row) in array.rows().enumerate() {
                    if r > 0 {
                        write!(f, ";")?;
                    }
                    for (c, value) in row.iter().enumerate() {
                        if c > 0 {
                            write!(f, ",")?;
                        }
                        match value {
                            sheetcalc_core::Scalar::Text(s) => write!(f, "\"{}\"", s.replace('"', "\"\""))?,
                            other => write!(f, "{}", other)?,
                        }
                    }
                }
                write!(f, "}}")
            }
            Expr::Reference { prefix, area } => {
                if let Some(prefix) = prefix {
                    write!(f, "{}", prefix)?;
                }
                write!(f, "{}", area)
            }
            Expr::Name { prefix, name } => {
                if let Some(prefix) = prefix {
                    write!(f, "{}", prefix)?;
                }
                write!(f, "{}", name)
            }
            Expr::StructuredReference { table, specifier } => write!(f, "{}[{}]", table, specifier),
            Expr::Dde {
                application,
                topic,
                item,
            } => write!(f, "{}|'{}'!'{}'", application, topic, item),
            Expr::Binary { left, op, right } => {
                write!(f, "{}{}{}", left, op, right)
            }
            Expr::Unary { op, operand } => match op {
                UnaryOp::Neg => write!(f, "-{}", operand),
                UnaryOp::Pos => write!(f, "+{}", operand),
                UnaryOp::Percent => write!(f, "{}%", operand),
                UnaryOp::ImplicitIntersection => write!(f, "@{}", operand),
                UnaryOp::Spill => write!(f, "{}#", operand),
            },
            Expr::FunctionCall { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::Grouped(inner) => write!(f, "({})", inner),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "+"),
            BinaryOp::Sub => write!(f, "-"),
            BinaryOp::Mul => write!(f, "*"),
            BinaryOp::Div => write!(f, "/"),
            BinaryOp::Pow => write!(f, "^"),
            BinaryOp::Concat => write!(f, "&"),
            BinaryOp::Eq => write!(f, "="),
            BinaryOp::Ne => write!(f, "<>"),
            BinaryOp::Lt => write!(f, "<"),
            BinaryOp::Gt => write!(f, ">"),
            BinaryOp::Le => write!(f, "<="),
            BinaryOp::Ge => write!(f, ">="),
            BinaryOp::Range => write!(f, ":"),
            BinaryOp::Union => write!(f, ","),
            BinaryOp::Intersection => write!(f, " "),
        }
    }
}
