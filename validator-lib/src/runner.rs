//! Validation sessions: the store, the loaded-file catalog and the keyword
//! registry, plus the run loop that turns test cases into a report.

use std::path::Path;

use thiserror::Error;

use crate::engine::{EngineError, Outcome, compare_rows, compare_scalar};
use crate::functions::{FunctionError, Registry, parse_call};
use crate::ingest::{self, Catalog, IngestError, LoadSummary};
use crate::report::{CaseResult, RunReport};
use crate::store::{QueryOutput, SqlOutcome, SqlStore, StoreError, StoreMode};
use crate::testcase::TestCase;
use crate::utils::write_error_to_log;

/// What loading a data file through the session did.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(LoadSummary),
    /// The file was loaded earlier in this session; nothing was re-read.
    AlreadyLoaded,
}

#[derive(Error, Debug)]
enum CaseError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Function(#[from] FunctionError),
}

/// One validation session: data files go in, a report comes out.
pub struct Session {
    store: SqlStore,
    catalog: Catalog,
    registry: Registry,
}

impl Session {
    //////////////////////////////////////////////////////////////
    ///  Public API
    //////////////////////////////////////////////////////////////

    pub fn new(mode: StoreMode) -> Result<Self, StoreError> {
        Ok(Session {
            store: SqlStore::open(mode)?,
            catalog: Catalog::new(),
            registry: Registry::builtin(),
        })
    }

    pub fn store(&self) -> &SqlStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SqlStore {
        &mut self.store
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Mutable registry access, for installing project-specific keyword
    /// functions before a run.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Load a data file into the store, once. A path that was already loaded
    /// in this session is skipped.
    pub fn load_data_file(&mut self, path: &Path) -> Result<LoadOutcome, IngestError> {
        if self.catalog.contains(path) {
            return Ok(LoadOutcome::AlreadyLoaded);
        }
        let summary = ingest::load_data_file(&mut self.store, path)?;
        let tables = summary.sheets.iter().map(|s| s.table.clone()).collect();
        self.catalog.register(path, tables);
        Ok(LoadOutcome::Loaded(summary))
    }

    /// Drop every table a previously-loaded file produced. Returns `false`
    /// when the path was never loaded.
    pub fn remove_data_file(&mut self, path: &Path) -> Result<bool, StoreError> {
        let Some(tables) = self.catalog.remove(path) else {
            return Ok(false);
        };
        for table in tables {
            self.store.drop_table(&table)?;
        }
        Ok(true)
    }

    pub fn table_names(&self) -> Result<Vec<String>, StoreError> {
        self.store.table_names()
    }

    pub fn preview(&self, table: &str, limit: usize) -> Result<QueryOutput, StoreError> {
        self.store.preview(table, limit)
    }

    /// Run one manual SQL statement against the session store.
    pub fn run_sql(&self, sql: &str) -> Result<SqlOutcome, StoreError> {
        self.store.run_sql(sql)
    }

    /// Execute every test case in order and collect the report. Failures and
    /// errors are appended to the error log once per run.
    pub fn run(&self, cases: &[TestCase]) -> RunReport {
        let results = cases
            .iter()
            .map(|case| {
                let outcome = self.run_case(case);
                CaseResult {
                    tc_name: case.name.clone(),
                    call_type: case.call_type.clone(),
                    code: case.code.clone(),
                    status: outcome.status,
                    expected: case.expected.clone(),
                    actual: outcome.actual,
                    details: outcome.details,
                }
            })
            .collect();

        let report = RunReport::new(results);
        if !report.all_passed() {
            write_error_to_log("Validation Run Failures", &report.format_report());
        }
        report
    }

    /// Execute a single test case. Every execution error lands in the
    /// outcome as status ERROR; this never returns `Err`.
    pub fn run_case(&self, case: &TestCase) -> Outcome {
        let call_type = case.call_type.trim().to_uppercase();
        let attempt = match call_type.as_str() {
            "SQL" => self.run_sql_case(case),
            "KEYWORD" => self.run_keyword_case(case),
            _ => {
                return Outcome::error(format!("Unknown Call Type: {}", call_type));
            }
        };
        match attempt {
            Ok(outcome) => outcome,
            Err(e) => Outcome::error(format!("Validation Error: {}", e)),
        }
    }

    //////////////////////////////////////////////////////////////
    ///  Private methods
    //////////////////////////////////////////////////////////////

    fn run_sql_case(&self, case: &TestCase) -> Result<Outcome, CaseError> {
        let output = self.store.query(&case.code)?;
        let outcome = compare_rows(&case.expected, &output)?;
        Ok(outcome)
    }

    fn run_keyword_case(&self, case: &TestCase) -> Result<Outcome, CaseError> {
        let (name, args) = parse_call(&case.code)?;
        let actual = self.registry.call(&self.store, &name, &args)?;
        Ok(compare_scalar(&case.expected, &actual))
    }
}
