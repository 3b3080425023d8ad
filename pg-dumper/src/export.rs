//! Result set export
//!
//! Serializes a [`ResultSet`] into CSV, JSON, or an Excel workbook.
//!
//! Values that a format has no native representation for are stringified
//! rather than dropped:
//!
//! - nested JSON (arrays, objects) is written as compact JSON text in CSV and
//!   spreadsheets
//! - binary columns already arrive as base64 text
//! - exact numerics a double cannot hold already arrive as text and are
//!   written verbatim
//! - integers outside ±2^53 are written as text in spreadsheets, where every
//!   number is a double
//!
//! Values that still cannot be written (a string longer than a spreadsheet
//! cell allows, more rows than a worksheet holds) fail with
//! [`Error::Encoding`].

use chrono::NaiveDateTime;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::schema::{ResultSet, Row};
use crate::{Error, Result};

/// Largest worksheet: one header row plus this many data rows
const SPREADSHEET_MAX_ROWS: usize = 1_048_575;

/// Excel's per-cell character limit
const SPREADSHEET_MAX_STRING: usize = 32_767;

const SPREADSHEET_MAX_COLUMNS: usize = 16_384;

const MAX_COLUMN_WIDTH: usize = 50;

/// Largest integer magnitude a double represents exactly
const MAX_SAFE_INTEGER: i64 = 1 << 53;

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    Spreadsheet,
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
            ExportFormat::Spreadsheet => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Spreadsheet => "xlsx",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "xlsx" | "excel" | "spreadsheet" => Ok(ExportFormat::Spreadsheet),
            other => Err(Error::Validation(format!(
                "unsupported export format '{other}' (expected csv, json or xlsx)"
            ))),
        }
    }
}

/// Download file name, e.g. `orders_20240131_154500.csv`
pub fn export_file_name(
    table: &str,
    format: ExportFormat,
    full_table: bool,
    timestamp: NaiveDateTime,
) -> String {
    let safe_table: String = table
        .chars()
        .map(|character| {
            if character.is_alphanumeric() || character == '-' || character == '_' {
                character
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "{}{}_{}.{}",
        safe_table,
        if full_table { "_full" } else { "" },
        timestamp.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

/// Serialize a result set in the requested format
pub fn encode(result: &ResultSet, format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Csv => encode_csv(result),
        ExportFormat::Json => encode_json(result),
        ExportFormat::Spreadsheet => encode_spreadsheet(result),
    }
}

fn cell<'a>(row: &'a Row, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&Value::Null)
}

/// Locale-independent text rendering used by CSV and as the spreadsheet fallback
fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        // serde_json prints the shortest representation that round-trips
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        nested @ (Value::Array(_) | Value::Object(_)) => nested.to_string(),
    }
}

fn encode_csv(result: &ResultSet) -> Result<Vec<u8>> {
    let columns = result.column_names();
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(&columns)
        .map_err(|error| Error::Encoding(error.to_string()))?;

    for row in &result.rows {
        let record: Vec<String> = columns
            .iter()
            .map(|column| value_to_text(cell(row, column)))
            .collect();
        writer
            .write_record(&record)
            .map_err(|error| Error::Encoding(error.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|error| Error::Encoding(error.to_string()))
}

fn encode_json(result: &ResultSet) -> Result<Vec<u8>> {
    let columns = result.column_names();
    let records: Vec<Row> = result
        .rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|column| (column.clone(), cell(row, column).clone()))
                .collect()
        })
        .collect();

    Ok(serde_json::to_vec_pretty(&records)?)
}

/// Excel sheet names: 1-31 characters, none of `[]:*?/\`
fn sheet_name(table: &str) -> String {
    let cleaned: String = table
        .chars()
        .map(|character| match character {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            other => other,
        })
        .take(31)
        .collect();

    let trimmed = cleaned.trim_matches('\'');
    if trimmed.is_empty() {
        "Data".to_string()
    } else {
        trimmed.to_string()
    }
}

fn xlsx_error(error: rust_xlsxwriter::XlsxError) -> Error {
    Error::Encoding(error.to_string())
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    column: u16,
    name: &str,
    value: &Value,
) -> Result<()> {
    match value {
        Value::Null => {}
        Value::Bool(flag) => {
            worksheet
                .write_boolean(row, column, *flag)
                .map_err(xlsx_error)?;
        }
        Value::Number(number) => {
            let exact = match (number.as_i64(), number.as_u64()) {
                (Some(integer), _) => (-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&integer),
                (None, Some(unsigned)) => unsigned <= MAX_SAFE_INTEGER as u64,
                (None, None) => true,
            };

            match number.as_f64() {
                Some(float) if exact => {
                    worksheet
                        .write_number(row, column, float)
                        .map_err(xlsx_error)?;
                }
                _ => {
                    worksheet
                        .write_string(row, column, number.to_string())
                        .map_err(xlsx_error)?;
                }
            }
        }
        other => {
            let text = value_to_text(other);
            if text.chars().count() > SPREADSHEET_MAX_STRING {
                return Err(Error::Encoding(format!(
                    "value in column '{}' row {} exceeds the spreadsheet limit of {} characters",
                    name, row, SPREADSHEET_MAX_STRING
                )));
            }
            worksheet
                .write_string(row, column, text)
                .map_err(xlsx_error)?;
        }
    }
    Ok(())
}

fn encode_spreadsheet(result: &ResultSet) -> Result<Vec<u8>> {
    if result.rows.len() > SPREADSHEET_MAX_ROWS {
        return Err(Error::Encoding(format!(
            "{} rows exceed the spreadsheet limit of {}",
            result.rows.len(),
            SPREADSHEET_MAX_ROWS
        )));
    }

    let columns = result.column_names();
    if columns.len() > SPREADSHEET_MAX_COLUMNS {
        return Err(Error::Encoding(format!(
            "{} columns exceed the spreadsheet limit of {}",
            columns.len(),
            SPREADSHEET_MAX_COLUMNS
        )));
    }

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(sheet_name(&result.spec.table))
        .map_err(xlsx_error)?;

    let mut widths: Vec<usize> = columns.iter().map(|name| name.chars().count()).collect();

    for (index, name) in columns.iter().enumerate() {
        worksheet
            .write_string_with_format(0, index as u16, name, &header_format)
            .map_err(xlsx_error)?;
    }

    for (row_index, row) in result.rows.iter().enumerate() {
        let sheet_row = row_index as u32 + 1;
        for (column_index, name) in columns.iter().enumerate() {
            let value = cell(row, name);
            write_cell(worksheet, sheet_row, column_index as u16, name, value)?;
            widths[column_index] = widths[column_index].max(value_to_text(value).chars().count());
        }
    }

    for (index, width) in widths.iter().enumerate() {
        let width = (width + 2).min(MAX_COLUMN_WIDTH);
        worksheet
            .set_column_width(index as u16, width as f64)
            .map_err(xlsx_error)?;
    }

    workbook.save_to_buffer().map_err(xlsx_error)
}
