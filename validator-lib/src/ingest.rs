//! Data-file ingestion: spreadsheets and CSV files become store tables.
//!
//! Every sheet of a workbook is imported as one table named
//! `{file_stem}.{sheet_name}` (filtered to alphanumerics, `.` and `_`).
//! The first row supplies column headers; column types are inferred from the
//! data below them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use calamine::{Data, Reader, open_workbook_auto};
use thiserror::Error;

use crate::store::{Affinity, SqlStore, Value};
use crate::utils::{normalize_string, write_error_to_log};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Unsupported data file type: '{path}' (expected .xlsx, .xlsm, .xlsb, .xls or .csv)")]
    UnsupportedFileType { path: String },

    #[error("Error reading sheet '{sheet}': {message}")]
    SheetRead { sheet: String, message: String },

    #[error(
        "Sheet contains duplicate column headers:\n{listing}\nPlease ensure all column headers are unique."
    )]
    DuplicateHeaders { listing: String },

    #[error("Sheet '{sheet}' in '{file}' produces no usable table name")]
    UnusableTableName { file: String, sheet: String },

    #[error(transparent)]
    Workbook(#[from] calamine::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Store(#[from] crate::store::StoreError),
}

/// One sheet imported into one table.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSheet {
    pub sheet: String,
    pub table: String,
    pub rows: usize,
}

/// What loading a single data file produced.
#[derive(Debug, Clone, Default)]
pub struct LoadSummary {
    pub file: PathBuf,
    pub sheets: Vec<LoadedSheet>,
}

impl LoadSummary {
    /// One-line human summary for console progress.
    pub fn summary(&self) -> String {
        let total_rows: usize = self.sheets.iter().map(|s| s.rows).sum();
        let tables: Vec<&str> = self.sheets.iter().map(|s| s.table.as_str()).collect();
        format!(
            "Loaded {} sheet(s), {} row(s) from '{}': {}",
            self.sheets.len(),
            total_rows,
            self.file.display(),
            tables.join(", ")
        )
    }
}

/// Tracks which files are loaded and which tables each file produced.
#[derive(Debug, Default)]
pub struct Catalog {
    files: Vec<(PathBuf, Vec<String>)>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog::default()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.iter().any(|(p, _)| p == path)
    }

    pub fn register(&mut self, path: &Path, tables: Vec<String>) {
        self.files.push((path.to_path_buf(), tables));
    }

    /// Forget a file, returning the tables it had produced.
    pub fn remove(&mut self, path: &Path) -> Option<Vec<String>> {
        let idx = self.files.iter().position(|(p, _)| p == path)?;
        Some(self.files.remove(idx).1)
    }

    pub fn files(&self) -> impl Iterator<Item = &Path> + '_ {
        self.files.iter().map(|(p, _)| p.as_path())
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> + '_ {
        self.files
            .iter()
            .flat_map(|(_, tables)| tables.iter().map(|t| t.as_str()))
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }
}

/// Build the table name for one sheet of one file: `{file_stem}.{sheet}`,
/// keeping only alphanumerics, `.` and `_`. Returns `None` when nothing
/// alphanumeric survives the filter.
pub fn table_name(file_stem: &str, sheet: &str) -> Option<String> {
    let raw = format!("{}.{}", file_stem, sheet);
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '_'))
        .collect();
    if cleaned.chars().any(|c| c.is_alphanumeric()) {
        Some(cleaned)
    } else {
        None
    }
}

/// Load one data file into the store. Spreadsheet files contribute one table
/// per sheet; CSV files contribute a single table.
pub fn load_data_file(store: &mut SqlStore, path: &Path) -> Result<LoadSummary, IngestError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" => load_workbook(store, path),
        "csv" => load_csv(store, path),
        _ => Err(IngestError::UnsupportedFileType {
            path: path.display().to_string(),
        }),
    }
}

/// Import one sheet's rows (header row first) into `table`. Exposed so the
/// session and tests can import rows that did not come from a file.
pub fn load_sheet(
    store: &mut SqlStore,
    sheet: &str,
    table: &str,
    rows: Vec<Vec<Data>>,
) -> Result<LoadedSheet, IngestError> {
    let mut iter = rows.into_iter();
    let header_row = match iter.next() {
        Some(row) => row,
        None => {
            return Ok(LoadedSheet {
                sheet: sheet.to_string(),
                table: table.to_string(),
                rows: 0,
            });
        }
    };

    let headers = header_names(&header_row);
    check_header_duplicates(&headers)?;

    let data_rows: Vec<Vec<Data>> = iter.filter(|row| !is_empty_row(row)).collect();
    let affinities = infer_affinities(headers.len(), &data_rows);

    store.create_table(table, &headers, &affinities)?;
    let values: Vec<Vec<Value>> = data_rows
        .iter()
        .map(|row| {
            (0..headers.len())
                .map(|idx| cell_to_value(row.get(idx).unwrap_or(&Data::Empty), affinities[idx]))
                .collect()
        })
        .collect();
    let inserted = store.insert_rows(table, &values)?;

    Ok(LoadedSheet {
        sheet: sheet.to_string(),
        table: table.to_string(),
        rows: inserted,
    })
}

/// A row is empty when every cell is blank, whitespace or an error cell.
pub(crate) fn is_empty_row(row: &[Data]) -> bool {
    row.iter().all(|cell| match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        Data::Error(_) => true,
        _ => false,
    })
}

//////////////////////////////////////////////////////////////
///  Private helpers
//////////////////////////////////////////////////////////////

fn load_workbook(store: &mut SqlStore, path: &Path) -> Result<LoadSummary, IngestError> {
    let mut workbook = open_workbook_auto(path)?;
    let stem = file_stem(path);
    let mut summary = LoadSummary {
        file: path.to_path_buf(),
        sheets: Vec::new(),
    };

    for sheet in workbook.sheet_names().to_owned() {
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| IngestError::SheetRead {
                sheet: sheet.clone(),
                message: e.to_string(),
            })?;
        let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
        if rows.is_empty() {
            // Blank sheets are common in hand-maintained workbooks
            continue;
        }
        let table = table_name(&stem, &sheet).ok_or_else(|| IngestError::UnusableTableName {
            file: stem.clone(),
            sheet: sheet.clone(),
        })?;
        let loaded = load_sheet(store, &sheet, &table, rows)?;
        summary.sheets.push(loaded);
    }
    Ok(summary)
}

fn load_csv(store: &mut SqlStore, path: &Path) -> Result<LoadSummary, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut rows: Vec<Vec<Data>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(csv_cell_to_data).collect());
    }

    let stem = file_stem(path);
    let mut summary = LoadSummary {
        file: path.to_path_buf(),
        sheets: Vec::new(),
    };
    if rows.is_empty() {
        return Ok(summary);
    }
    let table = table_name(&stem, "csv").ok_or_else(|| IngestError::UnusableTableName {
        file: stem.clone(),
        sheet: "csv".to_string(),
    })?;
    let loaded = load_sheet(store, "csv", &table, rows)?;
    summary.sheets.push(loaded);
    Ok(summary)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("data")
        .to_string()
}

/// Type inference for CSV cells: integers, then floats, then text. A cell
/// only counts as numeric when the parsed value renders back to the same
/// text, so codes like "007" stay text.
fn csv_cell_to_data(cell: &str) -> Data {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Data::Empty;
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        if int.to_string() == trimmed {
            return Data::Int(int);
        }
    }
    if let Ok(float) = trimmed.parse::<f64>() {
        if float.to_string() == trimmed {
            return Data::Float(float);
        }
    }
    Data::String(cell.to_string())
}

fn header_names(header_row: &[Data]) -> Vec<String> {
    header_row
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let name = normalize_string(&cell.to_string());
            if name.is_empty() {
                format!("column_{}", idx + 1)
            } else {
                name
            }
        })
        .collect()
}

/// Check for duplicate column headers in sheet data
///
/// # Arguments
/// * `headers` - Header strings, already normalized
///
/// # Returns
/// * `Ok(())` if no duplicates are found
/// * `Err(IngestError::DuplicateHeaders)` listing every duplicate and where it appears
fn check_header_duplicates(headers: &[String]) -> Result<(), IngestError> {
    let mut header_positions: HashMap<&str, Vec<usize>> = HashMap::new();
    for (index, header) in headers.iter().enumerate() {
        header_positions.entry(header).or_default().push(index);
    }

    let mut duplicate_headers: Vec<String> = header_positions
        .iter()
        .filter(|(_, positions)| positions.len() > 1)
        .map(|(header, positions)| {
            let columns_str = positions
                .iter()
                .map(|p| format!("column {}", p + 1)) // 1-based column indexing
                .collect::<Vec<_>>()
                .join(", ");
            format!("  • Header '{}' appears in: {}", header, columns_str)
        })
        .collect();

    if duplicate_headers.is_empty() {
        return Ok(());
    }

    duplicate_headers.sort();
    let error = IngestError::DuplicateHeaders {
        listing: duplicate_headers.join("\n"),
    };
    write_error_to_log("Sheet Header Duplicate Check Error", &error.to_string());
    Err(error)
}

fn infer_affinities(width: usize, rows: &[Vec<Data>]) -> Vec<Affinity> {
    (0..width)
        .map(|idx| infer_affinity(rows.iter().map(|row| row.get(idx).unwrap_or(&Data::Empty))))
        .collect()
}

/// A column is INTEGER when every non-empty cell is a whole number that
/// converts to i64 exactly, REAL when numeric otherwise, and TEXT for
/// anything else.
fn infer_affinity<'a>(cells: impl Iterator<Item = &'a Data>) -> Affinity {
    let mut saw_value = false;
    let mut saw_real = false;
    for cell in cells {
        match cell {
            Data::Empty | Data::Error(_) => {}
            Data::Int(_) | Data::Bool(_) => saw_value = true,
            Data::Float(f) => {
                saw_value = true;
                if !converts_to_integer(*f) {
                    saw_real = true;
                }
            }
            _ => return Affinity::Text,
        }
    }
    if !saw_value {
        Affinity::Text
    } else if saw_real {
        Affinity::Real
    } else {
        Affinity::Integer
    }
}

// 2^53, the largest whole magnitude an f64 stores exactly.
const MAX_EXACT_WHOLE_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Whole floats up to 2^53 convert to i64 without loss; larger magnitudes
/// stay REAL rather than saturating the cast.
fn converts_to_integer(f: f64) -> bool {
    f.fract() == 0.0 && f.abs() <= MAX_EXACT_WHOLE_FLOAT
}

fn cell_to_value(cell: &Data, affinity: Affinity) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::Text(s.clone()),
        Data::Int(i) => Value::Integer(*i),
        Data::Float(f) => {
            if affinity == Affinity::Integer && converts_to_integer(*f) {
                Value::Integer(*f as i64)
            } else {
                Value::Real(*f)
            }
        }
        Data::Bool(b) => Value::Integer(i64::from(*b)),
        Data::DateTime(dt) => Value::Text(excel_datetime_to_text(dt)),
        Data::DateTimeIso(s) => Value::Text(s.clone()),
        Data::DurationIso(s) => Value::Text(s.clone()),
        Data::Error(_) => Value::Null,
    }
}

/// Excel stores datetimes as day serials counted from 1899-12-30.
fn excel_datetime_to_text(dt: &calamine::ExcelDateTime) -> String {
    use chrono::{Duration, NaiveDate};

    let base = NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0));
    let Some(base) = base else {
        return dt.as_f64().to_string();
    };
    let value = dt.as_f64();
    let days = value as i64;
    let seconds = ((value - days as f64) * 86400.0).round() as i64;
    let datetime = base + Duration::days(days) + Duration::seconds(seconds);
    datetime.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{CellErrorType, ExcelDateTime, ExcelDateTimeType};
    use crate::store::StoreMode;
    use proptest::prelude::*;

    fn memory_store() -> SqlStore {
        SqlStore::open(StoreMode::Memory).unwrap()
    }

    fn text(s: &str) -> Data {
        Data::String(s.to_string())
    }

    #[test]
    fn test_table_name_filters_characters() {
        assert_eq!(
            table_name("Sales Report 2024", "Sheet 1").as_deref(),
            Some("SalesReport2024.Sheet1")
        );
        assert_eq!(
            table_name("a-b_c", "x(y)z").as_deref(),
            Some("ab_c.xyz")
        );
        assert_eq!(table_name("--", "()"), None);
    }

    #[test]
    fn test_csv_cell_inference() {
        assert_eq!(csv_cell_to_data(""), Data::Empty);
        assert_eq!(csv_cell_to_data("42"), Data::Int(42));
        assert_eq!(csv_cell_to_data("-3"), Data::Int(-3));
        assert_eq!(csv_cell_to_data("2.5"), Data::Float(2.5));
        assert_eq!(csv_cell_to_data("abc"), Data::String("abc".to_string()));
        assert_eq!(csv_cell_to_data("  7  "), Data::Int(7));
    }

    #[test]
    fn test_csv_cells_that_do_not_round_trip_stay_text() {
        assert_eq!(csv_cell_to_data("007"), Data::String("007".to_string()));
        assert_eq!(csv_cell_to_data("2.50"), Data::String("2.50".to_string()));
        assert_eq!(csv_cell_to_data("+1"), Data::String("+1".to_string()));
    }

    #[test]
    fn test_affinity_inference() {
        let rows = vec![
            vec![Data::Int(1), Data::Float(1.5), text("x"), Data::Empty],
            vec![Data::Float(2.0), Data::Int(3), text("y"), Data::Empty],
        ];
        let affinities = infer_affinities(4, &rows);
        assert_eq!(
            affinities,
            vec![
                Affinity::Integer,
                Affinity::Real,
                Affinity::Text,
                Affinity::Text
            ]
        );
    }

    #[test]
    fn test_affinity_mixed_numbers_and_text_is_text() {
        let rows = vec![vec![Data::Int(1)], vec![text("n/a")]];
        assert_eq!(infer_affinities(1, &rows), vec![Affinity::Text]);
    }

    #[test]
    fn test_bool_and_error_cells_convert_to_store_values() {
        assert_eq!(
            cell_to_value(&Data::Bool(true), Affinity::Integer),
            Value::Integer(1)
        );
        assert_eq!(
            cell_to_value(&Data::Bool(false), Affinity::Integer),
            Value::Integer(0)
        );
        assert_eq!(
            cell_to_value(&Data::Error(CellErrorType::Div0), Affinity::Text),
            Value::Null
        );
        assert_eq!(cell_to_value(&Data::Empty, Affinity::Text), Value::Null);
    }

    #[test]
    fn test_datetime_serials_render_from_the_1899_epoch() {
        let noon = ExcelDateTime::new(45000.5, ExcelDateTimeType::DateTime, false);
        assert_eq!(
            cell_to_value(&Data::DateTime(noon), Affinity::Text),
            Value::Text("2023-03-15 12:00:00".to_string())
        );

        let midnight = ExcelDateTime::new(45000.0, ExcelDateTimeType::DateTime, false);
        assert_eq!(
            cell_to_value(&Data::DateTime(midnight), Affinity::Text),
            Value::Text("2023-03-15 00:00:00".to_string())
        );
    }

    #[test]
    fn test_iso_datetime_and_duration_cells_keep_their_text() {
        assert_eq!(
            cell_to_value(&Data::DateTimeIso("2024-02-29T08:30:00".to_string()), Affinity::Text),
            Value::Text("2024-02-29T08:30:00".to_string())
        );
        assert_eq!(
            cell_to_value(&Data::DurationIso("PT2H30M".to_string()), Affinity::Text),
            Value::Text("PT2H30M".to_string())
        );
    }

    #[test]
    fn test_whole_floats_beyond_exact_integer_range_stay_real() {
        assert_eq!(
            cell_to_value(&Data::Float(1e30), Affinity::Integer),
            Value::Real(1e30)
        );
        assert_eq!(
            cell_to_value(&Data::Float(-1e30), Affinity::Integer),
            Value::Real(-1e30)
        );
        // 2^53 itself still converts exactly
        assert_eq!(
            cell_to_value(&Data::Float(9_007_199_254_740_992.0), Affinity::Integer),
            Value::Integer(9_007_199_254_740_992)
        );
    }

    #[test]
    fn test_header_names_fallback_for_blank_cells() {
        let headers = header_names(&[text("Name"), Data::Empty, text("  Age\n(years) ")]);
        assert_eq!(headers, vec!["Name", "column_2", "Age (years)"]);
    }

    #[test]
    fn test_duplicate_headers_are_rejected() {
        let mut store = memory_store();
        let rows = vec![
            vec![text("id"), text("id")],
            vec![Data::Int(1), Data::Int(2)],
        ];
        let err = load_sheet(&mut store, "s", "t", rows).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("duplicate column headers"), "{message}");
        assert!(message.contains("column 1, column 2"), "{message}");
    }

    #[test]
    fn test_load_sheet_roundtrip_with_padding_and_empty_rows() {
        let mut store = memory_store();
        let rows = vec![
            vec![text("id"), text("name"), text("score")],
            vec![Data::Int(1), text("alice"), Data::Float(91.5)],
            vec![Data::Empty, text(""), Data::Empty], // skipped
            vec![Data::Int(2), text("bob")],          // short row pads with NULL
        ];
        let loaded = load_sheet(&mut store, "people", "t.people", rows).unwrap();
        assert_eq!(loaded.rows, 2);

        let output = store
            .query("SELECT id, name, score FROM \"t.people\" ORDER BY id")
            .unwrap();
        assert_eq!(output.rows[1][2], Value::Null);
        assert_eq!(output.rows[0][2], Value::Real(91.5));
    }

    #[test]
    fn test_load_sheet_whole_floats_become_integers() {
        // xlsx stores every number as a float; whole values in an integer
        // column should come back as integers
        let mut store = memory_store();
        let rows = vec![
            vec![text("n")],
            vec![Data::Float(3.0)],
            vec![Data::Float(4.0)],
        ];
        load_sheet(&mut store, "s", "t", rows).unwrap();
        let output = store.query("SELECT n FROM \"t\" ORDER BY n").unwrap();
        assert_eq!(output.rows[0][0], Value::Integer(3));
        assert_eq!(output.rows[1][0], Value::Integer(4));
    }

    #[test]
    fn test_load_sheet_bool_column_stores_zero_and_one() {
        let mut store = memory_store();
        let rows = vec![
            vec![text("flag")],
            vec![Data::Bool(true)],
            vec![Data::Bool(false)],
        ];
        load_sheet(&mut store, "s", "t", rows).unwrap();
        let output = store.query("SELECT flag FROM \"t\" ORDER BY flag").unwrap();
        assert_eq!(output.rows[0][0], Value::Integer(0));
        assert_eq!(output.rows[1][0], Value::Integer(1));
    }

    #[test]
    fn test_load_sheet_preserves_huge_whole_floats() {
        let mut store = memory_store();
        let rows = vec![vec![text("n")], vec![Data::Float(1e30)]];
        load_sheet(&mut store, "s", "t", rows).unwrap();
        let output = store.query("SELECT n FROM \"t\"").unwrap();
        assert_eq!(output.rows[0][0], Value::Real(1e30));
    }

    #[test]
    fn test_load_sheet_header_only_creates_empty_table() {
        let mut store = memory_store();
        let rows = vec![vec![text("a"), text("b")]];
        let loaded = load_sheet(&mut store, "s", "t", rows).unwrap();
        assert_eq!(loaded.rows, 0);
        assert!(store.query("SELECT * FROM \"t\"").unwrap().is_empty());
    }

    #[test]
    fn test_unsupported_file_type() {
        let mut store = memory_store();
        let err = load_data_file(&mut store, Path::new("data.parquet")).unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFileType { .. }));
    }

    #[test]
    fn test_load_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.csv");
        std::fs::write(&path, "id,name\n1,alice\n2,bob\n").unwrap();

        let mut store = memory_store();
        let summary = load_data_file(&mut store, &path).unwrap();
        assert_eq!(summary.sheets.len(), 1);
        assert_eq!(summary.sheets[0].table, "people.csv");
        assert_eq!(summary.sheets[0].rows, 2);

        let output = store
            .query("SELECT name FROM \"people.csv\" ORDER BY id")
            .unwrap();
        assert_eq!(output.rows[0][0], Value::Text("alice".to_string()));
    }

    #[test]
    fn test_catalog_tracks_files_and_tables() {
        let mut catalog = Catalog::new();
        let first = Path::new("a.xlsx");
        catalog.register(first, vec!["a.Sheet1".to_string(), "a.Sheet2".to_string()]);
        catalog.register(Path::new("b.csv"), vec!["b.csv".to_string()]);

        assert!(catalog.contains(first));
        assert_eq!(catalog.tables().count(), 3);

        let removed = catalog.remove(first).unwrap();
        assert_eq!(removed, vec!["a.Sheet1", "a.Sheet2"]);
        assert!(!catalog.contains(first));
        assert!(catalog.remove(first).is_none());

        catalog.clear();
        assert_eq!(catalog.files().count(), 0);
    }

    #[test]
    fn test_empty_row_detection() {
        assert!(is_empty_row(&[Data::Empty, text("  ")]));
        assert!(!is_empty_row(&[Data::Empty, Data::Int(0)]));
        assert!(is_empty_row(&[]));
    }

    #[test]
    fn test_summary_line() {
        let summary = LoadSummary {
            file: PathBuf::from("sales.xlsx"),
            sheets: vec![
                LoadedSheet {
                    sheet: "Q1".to_string(),
                    table: "sales.Q1".to_string(),
                    rows: 10,
                },
                LoadedSheet {
                    sheet: "Q2".to_string(),
                    table: "sales.Q2".to_string(),
                    rows: 5,
                },
            ],
        };
        assert_eq!(
            summary.summary(),
            "Loaded 2 sheet(s), 15 row(s) from 'sales.xlsx': sales.Q1, sales.Q2"
        );
    }

    proptest! {
        #[test]
        fn prop_table_names_only_contain_allowed_characters(stem in ".{0,24}", sheet in ".{0,24}") {
            if let Some(name) = table_name(&stem, &sheet) {
                prop_assert!(
                    name.chars().all(|c| c.is_alphanumeric() || c == '.' || c == '_')
                );
                prop_assert!(name.chars().any(|c| c.is_alphanumeric()));
            }
        }
    }
}
