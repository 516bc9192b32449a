//! `reconcsv-io` — writes reconciliation results to disk: per-pair CSV
//! artifacts and the per-pair / run-level JSON summaries.

pub mod report;

pub use report::ResultWriter;
