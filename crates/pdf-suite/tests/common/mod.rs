//! Shared utilities for pdf-suite integration tests.
//!
//! - `TestHarness` runs a full suite (store, database, batch workers) in a
//!   temporary site directory
//! - builders synthesize small PDFs in memory

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
