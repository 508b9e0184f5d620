use std::path::PathBuf;

use validator_lib::runner::Session;
use validator_lib::store::StoreMode;

// Re-export shared test utilities from src/test_utils.rs
// These are the core functions used by most tests
pub use validator_lib::test_utils::{case, result_by_name, seeded_session, seeded_store};

/// Session with a fresh, empty in-memory store
#[allow(dead_code)]
pub fn empty_session() -> Session {
    Session::new(StoreMode::Memory).unwrap()
}

/// Write a fixture file into the tempdir and return its path
#[allow(dead_code)]
pub fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// The standard three-person fixture as CSV text
#[allow(dead_code)]
pub fn people_csv() -> &'static str {
    "id,name,age\n1,alice,34\n2,bob,28\n3,carol,41\n"
}
