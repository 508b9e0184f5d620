//! The expectation-comparison engine.
//!
//! A test case declares what its check should produce as a short
//! expected-result string. The engine applies a fixed ladder of pattern
//! rules, first match wins, and produces the verdict together with the
//! actual-result text that goes on the report.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::store::QueryOutput;

/// Verdict for a single executed test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Fail,
    Error,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
            Status::Error => "ERROR",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid expected count '{expected}': could not parse an integer after '='")]
    BadExpectedCount { expected: String },
}

/// What a comparison decided: the verdict, the actual-result text for the
/// report, and extra details when something needs explaining.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub status: Status,
    pub actual: String,
    pub details: String,
}

impl Outcome {
    fn pass(actual: impl Into<String>) -> Self {
        Outcome {
            status: Status::Pass,
            actual: actual.into(),
            details: String::new(),
        }
    }

    fn fail(actual: impl Into<String>) -> Self {
        Outcome {
            status: Status::Fail,
            actual: actual.into(),
            details: String::new(),
        }
    }

    fn fail_with(actual: impl Into<String>, details: String) -> Self {
        Outcome {
            status: Status::Fail,
            actual: actual.into(),
            details,
        }
    }

    /// An execution error: the case never reached a comparison, so there is
    /// no actual result to show.
    pub fn error(details: String) -> Self {
        Outcome {
            status: Status::Error,
            actual: "N/A".to_string(),
            details,
        }
    }
}

/// Apply the expectation ladder to a query result. Rules are checked in
/// order and the first match decides:
///
/// 1. Expected contains `0 rows`: pass iff the result is empty.
/// 2. Expected starts with `COUNT = `: pass iff the row count equals the
///    integer after the `=`.
/// 3. Expected equals `no records` (case-insensitive): pass iff empty.
/// 4. Expected equals `records exist` (case-insensitive): pass iff
///    non-empty.
/// 5. The result is exactly one row of one column: pass iff the trimmed
///    scalar equals the expected string.
/// 6. Otherwise: pass iff the rendered row sequence equals the expected
///    string verbatim.
///
/// The expected string arrives pre-trimmed by test-case parsing.
pub fn compare_rows(expected: &str, output: &QueryOutput) -> Result<Outcome, EngineError> {
    let rendered = output.render_rows();
    let n = output.row_count();

    if expected.contains("0 rows") {
        return Ok(if output.is_empty() {
            Outcome::pass(rendered)
        } else {
            Outcome::fail(format!("{} rows found.", n))
        });
    }

    if expected.starts_with("COUNT = ") {
        let wanted = parse_expected_count(expected)?;
        let actual = format!("COUNT = {}", n);
        return Ok(if n as i64 == wanted {
            Outcome::pass(actual)
        } else {
            Outcome::fail(actual)
        });
    }

    if expected.eq_ignore_ascii_case("no records") {
        return Ok(if output.is_empty() {
            Outcome::pass(rendered)
        } else {
            Outcome::fail(format!("{} records found.", n))
        });
    }

    if expected.eq_ignore_ascii_case("records exist") {
        return Ok(if output.is_empty() {
            Outcome::fail("No records found.")
        } else {
            Outcome::pass(format!("{} records exist.", n))
        });
    }

    if let Some(scalar) = output.scalar() {
        let actual = scalar.to_string();
        return Ok(if actual.trim() == expected {
            Outcome::pass(actual)
        } else {
            Outcome::fail(actual)
        });
    }

    if rendered == expected {
        Ok(Outcome::pass(rendered))
    } else {
        let details = format!(
            "Generic comparison failed. Actual: '{}', Expected: '{}'",
            rendered, expected
        );
        Ok(Outcome::fail_with(rendered, details))
    }
}

/// Compare a keyword function's returned string against the expectation.
pub fn compare_scalar(expected: &str, actual: &str) -> Outcome {
    if actual == expected {
        Outcome::pass(actual)
    } else {
        let details = format!("Function returned '{}', expected '{}'", actual, expected);
        Outcome::fail_with(actual, details)
    }
}

/// The integer between the first and second `=` of a `COUNT = n` expectation.
/// Negative counts parse (and then simply never match a row count).
fn parse_expected_count(expected: &str) -> Result<i64, EngineError> {
    expected
        .split('=')
        .nth(1)
        .unwrap_or("")
        .trim()
        .parse::<i64>()
        .map_err(|_| EngineError::BadExpectedCount {
            expected: expected.to_string(),
        })
}
