// Test utilities available to both unit and integration tests
// Only compiled when testing

use calamine::Data;

use crate::ingest::load_sheet;
use crate::report::{CaseResult, RunReport};
use crate::runner::Session;
use crate::store::{SqlStore, StoreMode};
use crate::testcase::TestCase;

/// Seed the shared fixture table `people.csv` (id, name, age) with three rows
#[allow(dead_code)]
pub fn seed_people_table(store: &mut SqlStore) {
    let text = |s: &str| Data::String(s.to_string());
    let rows = vec![
        vec![text("id"), text("name"), text("age")],
        vec![Data::Int(1), text("alice"), Data::Int(34)],
        vec![Data::Int(2), text("bob"), Data::Int(28)],
        vec![Data::Int(3), text("carol"), Data::Int(41)],
    ];
    load_sheet(store, "csv", "people.csv", rows).unwrap();
}

/// Factory function for an in-memory store pre-seeded with `people.csv`
#[allow(dead_code)]
pub fn seeded_store() -> SqlStore {
    let mut store = SqlStore::open(StoreMode::Memory).unwrap();
    seed_people_table(&mut store);
    store
}

/// Factory function for a session whose store already holds `people.csv`
#[allow(dead_code)]
pub fn seeded_session() -> Session {
    let mut session = Session::new(StoreMode::Memory).unwrap();
    seed_people_table(session.store_mut());
    session
}

/// Shorthand test-case constructor
#[allow(dead_code)]
pub fn case(name: &str, call_type: &str, code: &str, expected: &str) -> TestCase {
    TestCase {
        name: name.to_string(),
        call_type: call_type.to_string(),
        code: code.to_string(),
        expected: expected.to_string(),
    }
}

/// Look up one case result by TC name, panicking when it is missing
#[allow(dead_code)]
pub fn result_by_name<'a>(report: &'a RunReport, name: &str) -> &'a CaseResult {
    report
        .results
        .iter()
        .find(|r| r.tc_name == name)
        .unwrap_or_else(|| panic!("no result named '{}' in report", name))
}
