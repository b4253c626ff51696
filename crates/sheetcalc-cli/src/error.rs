use sheetcalc_core::CoreError;
use sheetcalc_formula::CalcError;
use thiserror::Error;

/// Command line error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Cannot read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid workbook JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid cell {cell}: {source}")]
    Cell {
        cell: String,
        #[source]
        source: CalcError,
    },

    #[error(transparent)]
    Calc(#[from] CalcError),

    #[error(transparent)]
    Core(#[from] CoreError),
}
