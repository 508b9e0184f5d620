//! Run reports: per-case results plus console, CSV and JSON renderings.

use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::engine::Status;
use crate::utils::get_utc_iso_datetime;

/// Everything the report records about one executed test case.
#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    pub tc_name: String,
    pub call_type: String,
    pub code: String,
    pub status: Status,
    pub expected: String,
    pub actual: String,
    pub details: String,
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// The full result set of one validation run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: String,
    pub results: Vec<CaseResult>,
}

impl RunReport {
    pub fn new(results: Vec<CaseResult>) -> Self {
        RunReport {
            generated_at: get_utc_iso_datetime(),
            results,
        }
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn passed(&self) -> usize {
        self.count(Status::Pass)
    }

    pub fn failed(&self) -> usize {
        self.count(Status::Fail)
    }

    pub fn errors(&self) -> usize {
        self.count(Status::Error)
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0 && self.errors() == 0
    }

    fn count(&self, status: Status) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// Multi-line console report: a summary header plus one block per
    /// non-passing case.
    ///
    /// # Returns
    /// * `String` - Formatted report text ready to print or log
    pub fn format_report(&self) -> String {
        let mut lines = Vec::new();
        lines.push("=".repeat(60));
        lines.push("Validation Report".to_string());
        lines.push(format!("Generated at: {}", self.generated_at));
        lines.push(format!(
            "Total: {} | Passed: {} | Failed: {} | Errors: {}",
            self.total(),
            self.passed(),
            self.failed(),
            self.errors()
        ));
        lines.push("=".repeat(60));

        if self.all_passed() {
            lines.push("All test cases passed.".to_string());
        } else {
            for result in self.results.iter().filter(|r| r.status != Status::Pass) {
                lines.push(format!(
                    "[{}] {} ({})",
                    result.status, result.tc_name, result.call_type
                ));
                lines.push(format!("  Expected: {}", result.expected));
                lines.push(format!("  Actual:   {}", result.actual));
                if !result.details.is_empty() {
                    lines.push(format!("  Details:  {}", result.details));
                }
            }
        }
        lines.join("\n")
    }

    /// Write the report as CSV with one row per test case.
    pub fn write_csv(&self, path: &Path) -> Result<(), ReportError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record([
            "TC Name",
            "Call Type",
            "SQL/Keyword",
            "Status",
            "Expected Result",
            "Actual Result",
            "Error/Details",
        ])?;
        for result in &self.results {
            writer.write_record([
                result.tc_name.as_str(),
                result.call_type.as_str(),
                result.code.as_str(),
                result.status.as_str(),
                result.expected.as_str(),
                result.actual.as_str(),
                result.details.as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        let json = serde_json::to_string_pretty(self)?;
        Ok(json)
    }
}
