pub mod config;
pub mod error;

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use sheetcalc_core::{BookPoint, CellCoord, Locale, Name, Scalar, Workbook};
use sheetcalc_formula::{CalcEngine, CalcError};
use tracing::{debug, info};

use crate::config::{Config, OutputFormat};
use crate::error::CliError;

/// Workbook description read by the command line
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BookInput {
    pub locale: Option<String>,
    pub sheets: Vec<SheetInput>,
    pub names: Vec<NameInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetInput {
    pub name: String,
    /// Cell input by A1 address, formulas start with `=`
    #[serde(default)]
    pub cells: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NameInput {
    pub name: String,
    /// Sheet the name is scoped to, the whole workbook when missing
    pub scope: Option<String>,
    pub formula: String,
}

/// Result of one cell after recalculation
#[derive(Debug, Clone, PartialEq)]
pub struct CellResult {
    pub sheet: String,
    pub cell: CellCoord,
    pub outcome: Result<Scalar, CalcError>,
}

/// Recalculated workbook
#[derive(Debug)]
pub struct Report {
    pub locale: Locale,
    pub cells: Vec<CellResult>,
}

impl Report {
    pub fn render(&self, format: OutputFormat) -> Result<String, CliError> {
        match format {
            OutputFormat::Text => Ok(self.render_text()),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&self.render_json())?),
        }
    }

    fn render_text(&self) -> String {
        let lines: Vec<String> = self
            .cells
            .iter()
            .map(|result| {
                let address = format!("{}!{}", result.sheet, result.cell.to_a1());
                match &result.outcome {
                    Ok(value) => format!("{address} = {}", display(value, &self.locale)),
                    Err(error) => format!("{address} failed: {error}"),
                }
            })
            .collect();
        lines.join("\n")
    }

    fn render_json(&self) -> Value {
        let mut sheets = Map::new();
        for result in &self.cells {
            let value = match &result.outcome {
                Ok(Scalar::Blank) => Value::Null,
                Ok(Scalar::Logical(b)) => json!(b),
                Ok(Scalar::Number(n)) => json!(n),
                Ok(Scalar::Text(t)) => json!(t),
                Ok(Scalar::Error(e)) => json!(e.to_string()),
                Err(error) => json!({ "failure": error.to_string() }),
            };
            let cells = sheets
                .entry(result.sheet.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(cells) = cells {
                cells.insert(result.cell.to_a1(), value);
            }
        }
        Value::Object(sheets)
    }
}

fn display(value: &Scalar, locale: &Locale) -> String {
    match value {
        Scalar::Error(e) => e.to_string(),
        Scalar::Text(t) => format!("{t:?}"),
        other => other.to_text(locale).unwrap_or_default(),
    }
}

/// Build the workbook, recalculate it and collect every cell
pub fn run(config: &Config, source: &str) -> Result<Report, CliError> {
    let input: BookInput = serde_json::from_str(source)?;

    let mut engine_config = config.engine.clone();
    if let Some(locale) = config.locale.clone().or(input.locale) {
        engine_config.locale = locale;
    }
    let mut engine = CalcEngine::new(engine_config)?;
    let mut workbook = Workbook::new(0);

    for sheet in &input.sheets {
        workbook.add_sheet(sheet.name.as_str())?;
    }
    for defined in &input.names {
        let name = match &defined.scope {
            Some(sheet) => Name::scoped(sheet.as_str(), defined.name.as_str()),
            None => Name::book(defined.name.as_str()),
        };
        engine.define_name(&mut workbook, name, &defined.formula)?;
    }

    let mut points: Vec<(String, BookPoint)> = Vec::new();
    for sheet in &input.sheets {
        for (a1, text) in &sheet.cells {
            let point = workbook.book_point(&sheet.name, a1)?;
            engine
                .set_input(&mut workbook, point, text)
                .map_err(|source| CliError::Cell {
                    cell: format!("{}!{a1}", sheet.name),
                    source,
                })?;
            points.push((sheet.name.clone(), point));
        }
    }
    debug!(sheets = input.sheets.len(), cells = points.len(), "workbook loaded");

    let calculated = engine.recalculate(&mut workbook)?;
    info!(calculated, "recalculated workbook");

    points.sort_by_key(|(_, point)| *point);
    let cells = points
        .into_iter()
        .map(|(sheet, point)| CellResult {
            sheet,
            cell: point.cell,
            outcome: match engine.failure(point) {
                Some(failure) => Err(failure.clone()),
                None => Ok(workbook.value(point)),
            },
        })
        .collect();

    Ok(Report {
        locale: engine.locale().clone(),
        cells,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use pretty_assertions::assert_eq;
    use sheetcalc_formula::EngineConfig;

    fn config() -> Config {
        Config {
            input: None,
            format: OutputFormat::Text,
            locale: None,
            engine: EngineConfig::default(),
        }
    }

    const BOOK: &str = r#"{
        "sheets": [
            {"name": "Sheet1", "cells": {"A1": "5", "A2": "=A1*2", "A3": "=Rate*A2", "B1": "=B2", "B2": "=B1"}},
            {"name": "Data", "cells": {"A1": "=\"x\"&Sheet1!A1"}}
        ],
        "names": [{"name": "Rate", "formula": "=1.5"}]
    }"#;

    #[test]
    fn test_run_renders_text() {
        let report = run(&config(), BOOK).unwrap();
        let text = report.render(OutputFormat::Text).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Sheet1!A1 = 5",
                "Sheet1!B1 failed: Formula in [0]#0!B1 is part of a circular reference",
                "Sheet1!A2 = 10",
                "Sheet1!B2 failed: Formula in [0]#0!B2 is part of a circular reference",
                "Sheet1!A3 = 15",
                "Data!A1 = \"x5\"",
            ]
        );
    }

    #[test]
    fn test_run_renders_json() {
        let report = run(&config(), BOOK).unwrap();
        let value: Value = serde_json::from_str(&report.render(OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(value["Sheet1"]["A2"], json!(10.0));
        assert_eq!(value["Data"]["A1"], json!("x5"));
        assert!(value["Sheet1"]["B1"]["failure"].is_string());
    }

    #[test]
    fn test_locale_from_file_and_flag() {
        let source = r#"{"locale": "cs-CZ", "sheets": [{"name": "S", "cells": {"A1": "1,5", "A2": "=A1*2"}}]}"#;
        let report = run(&config(), source).unwrap();
        assert_eq!(report.cells[1].outcome, Ok(Scalar::Number(3.0)));
        assert_eq!(report.render(OutputFormat::Text).unwrap(), "S!A1 = 1,5\nS!A2 = 3");

        let mut flagged = config();
        flagged.locale = Some("en-US".to_string());
        let report = run(&flagged, source).unwrap();
        assert_eq!(report.cells[0].outcome, Ok(Scalar::Text("1,5".to_string())));
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(run(&config(), "{"), Err(CliError::Json(_))));
        let bad_formula = r#"{"sheets": [{"name": "S", "cells": {"A1": "=1+"}}]}"#;
        assert!(matches!(run(&config(), bad_formula), Err(CliError::Cell { .. })));
        let bad_locale = r#"{"locale": "xx-XX"}"#;
        assert!(matches!(run(&config(), bad_locale), Err(CliError::Calc(_))));
    }
}
