//! Test helpers for edm-validator CLI integration tests

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Create a temp directory for tests, respecting CARGO_TARGET_TMPDIR if set
#[allow(dead_code)]
pub fn create_temp_dir() -> Result<TempDir, Box<dyn std::error::Error>> {
    if let Ok(cargo_target_tmpdir) = env::var("CARGO_TARGET_TMPDIR") {
        fs::create_dir_all(&cargo_target_tmpdir)?;
        let temp_dir = TempDir::new_in(cargo_target_tmpdir)?;
        Ok(temp_dir)
    } else {
        let temp_dir = TempDir::new()?;
        Ok(temp_dir)
    }
}

/// Write the standard people fixture; loads as the table "people.csv"
#[allow(dead_code)]
pub fn write_people_csv(dir: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let file_path = dir.join("people.csv");
    let content = "id,name,age\n1,alice,34\n2,bob,28\n3,carol,41\n";
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Write a test-case file with the four required columns and the given rows
#[allow(dead_code)]
pub fn write_cases_csv(
    dir: &Path,
    rows: &[[&str; 4]],
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let file_path = dir.join("test_cases.csv");
    let mut content = String::from("TC_Name,Call Type,SQL/Keyword,Expected_Result\n");
    for row in rows {
        let fields: Vec<String> = row.iter().map(|f| csv_field(f)).collect();
        content.push_str(&fields.join(","));
        content.push('\n');
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Quote a CSV field when it carries commas, quotes or newlines
#[allow(dead_code)]
fn csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
