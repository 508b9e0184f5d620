//! Test-case file parsing.
//!
//! A test-case file is a spreadsheet (first sheet) or CSV whose header row
//! must contain the four required columns. Extra columns are ignored and
//! column order does not matter.

use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use thiserror::Error;

use crate::ingest::is_empty_row;
use crate::utils::normalize_string;

/// Columns every test-case file must provide.
pub const REQUIRED_COLUMNS: [&str; 4] = ["TC_Name", "Call Type", "SQL/Keyword", "Expected_Result"];

/// One validation case read from the test-case file.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub name: String,
    /// `SQL` or `KEYWORD`, matched case-insensitively by the runner.
    pub call_type: String,
    /// The SQL statement or keyword call, depending on `call_type`.
    pub code: String,
    pub expected: String,
}

#[derive(Error, Debug)]
pub enum TestCaseError {
    #[error("Unsupported test case file type: '{path}' (expected .xlsx, .xlsm, .xlsb, .xls or .csv)")]
    UnsupportedFileType { path: String },

    #[error("Test case file must contain columns: TC_Name, Call Type, SQL/Keyword, Expected_Result")]
    MissingColumns,

    #[error("Test case file '{path}' has no sheets")]
    NoSheets { path: String },

    #[error("Error reading sheet '{sheet}': {message}")]
    SheetRead { sheet: String, message: String },

    #[error(transparent)]
    Workbook(#[from] calamine::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Load every case from a test-case file. Spreadsheets are read from their
/// first sheet only.
pub fn load_test_cases(path: &Path) -> Result<Vec<TestCase>, TestCaseError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" => load_from_workbook(path),
        "csv" => load_from_csv(path),
        _ => Err(TestCaseError::UnsupportedFileType {
            path: path.display().to_string(),
        }),
    }
}

/// Parse cases out of raw sheet rows (header row first). Exposed so the
/// session and tests can feed rows that did not come from a file.
pub fn cases_from_rows(rows: Vec<Vec<Data>>) -> Result<Vec<TestCase>, TestCaseError> {
    let mut iter = rows.into_iter();
    let header_row = iter.next().ok_or(TestCaseError::MissingColumns)?;
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| normalize_string(&cell.to_string()))
        .collect();

    let indices = REQUIRED_COLUMNS
        .iter()
        .map(|wanted| headers.iter().position(|h| h == wanted))
        .collect::<Option<Vec<usize>>>()
        .ok_or(TestCaseError::MissingColumns)?;
    let [name_idx, call_type_idx, code_idx, expected_idx] = indices[..] else {
        return Err(TestCaseError::MissingColumns);
    };

    let mut cases = Vec::new();
    for row in iter {
        if is_empty_row(&row) {
            continue;
        }
        cases.push(TestCase {
            name: cell_text(&row, name_idx),
            call_type: cell_text(&row, call_type_idx),
            code: cell_text(&row, code_idx),
            expected: cell_text(&row, expected_idx),
        });
    }
    Ok(cases)
}

fn cell_text(row: &[Data], idx: usize) -> String {
    match row.get(idx) {
        Some(Data::Empty) | None => String::new(),
        Some(cell) => cell.to_string().trim().to_string(),
    }
}

fn load_from_workbook(path: &Path) -> Result<Vec<TestCase>, TestCaseError> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| TestCaseError::NoSheets {
            path: path.display().to_string(),
        })?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| TestCaseError::SheetRead {
            sheet: sheet.clone(),
            message: e.to_string(),
        })?;
    cases_from_rows(range.rows().map(|r| r.to_vec()).collect())
}

fn load_from_csv(path: &Path) -> Result<Vec<TestCase>, TestCaseError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut rows: Vec<Vec<Data>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|cell| {
                    if cell.is_empty() {
                        Data::Empty
                    } else {
                        Data::String(cell.to_string())
                    }
                })
                .collect(),
        );
    }
    cases_from_rows(rows)
}
