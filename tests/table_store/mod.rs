//! Shared table store integration tests.
//!
//! Tests the TableStore interface against every backend. Each backend's
//! test binary includes this module and runs the suite with
//! `run_table_store_tests!`.

pub mod table_store_tests;
