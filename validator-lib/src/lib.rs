#![allow(clippy::needless_return)]

pub mod engine;
pub mod functions;
pub mod ingest;
pub mod report;
pub mod runner;
pub mod store;
pub mod testcase;
pub mod utils;

// Test utilities - only compiled when testing or with test feature
// #[cfg(test)] alone doesn't work for integration tests (they're external crates)
// The feature flag makes it available to integration tests via dev-dependencies
#[cfg(any(test, feature = "test"))]
pub mod test_utils;

pub use engine::{Outcome, Status};
pub use report::{CaseResult, RunReport};
pub use runner::{LoadOutcome, Session};
pub use store::{QueryOutput, SqlOutcome, SqlStore, StoreMode, Value};
pub use testcase::TestCase;

pub const ERRORS_LOG_FILE: &str = "errors.log";
