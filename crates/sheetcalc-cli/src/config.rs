use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use sheetcalc_formula::EngineConfig;

/// How results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One `Sheet!A1 = value` line per cell
    #[default]
    Text,
    /// Cells grouped by sheet in one JSON object
    Json,
}

/// Command line arguments
#[derive(Debug, Clone, PartialEq, Parser)]
#[command(
    name = "sheetcalc",
    version,
    about = "Recalculates a workbook given as JSON and prints every cell.",
    after_help = "Environment: SHEETCALC_LOCALE, SHEETCALC_MAX_NAME_DEPTH, SHEETCALC_OUTPUT, RUST_LOG"
)]
pub struct Args {
    /// Workbook JSON file, read from standard input when missing or `-`
    pub input: Option<PathBuf>,

    /// Locale for coercion and formatting (en-US, en-GB, cs-CZ, de-DE).
    /// Wins over the locale of the workbook file.
    #[arg(short, long, value_name = "TAG")]
    pub locale: Option<String>,

    /// Output format
    #[arg(
        short,
        long,
        value_enum,
        env = "SHEETCALC_OUTPUT",
        ignore_case = true,
        default_value_t = OutputFormat::Text
    )]
    pub output: OutputFormat,

    /// Fail formulas calling unknown functions
    #[arg(long)]
    pub strict: bool,
}

/// Command line configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Workbook JSON file, standard input when missing
    pub input: Option<PathBuf>,
    pub format: OutputFormat,
    /// Locale given on the command line, wins over the workbook file
    pub locale: Option<String>,
    pub engine: EngineConfig,
}

impl Config {
    /// Combine parsed arguments with the engine configuration read from the
    /// environment
    pub fn new(args: Args, mut engine: EngineConfig) -> Self {
        if args.strict {
            engine.reject_unknown_functions = true;
        }
        Self {
            input: args.input.filter(|path| path.as_os_str() != "-"),
            format: args.output,
            locale: args.locale,
            engine,
        }
    }

    /// Load configuration from the command line and environment variables
    pub fn load() -> anyhow::Result<Self> {
        let engine = EngineConfig::from_env()?;
        Ok(Self::new(Args::parse(), engine))
    }
}
