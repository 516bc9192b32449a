//! `reconcsv-recon` — folder-pair delimited-file reconciliation engine.
//!
//! Pairs `*.csv` files across two folders, loads both sides of each pair
//! concurrently, and partitions records into matched / only-in-A / only-in-B
//! by a configurable composite key. Result writing lives behind the
//! [`ResultSink`] seam so this crate carries no presentation dependencies.

pub mod config;
pub mod engine;
pub mod error;
pub mod key;
pub mod loader;
pub mod model;
pub mod pairing;
pub mod reconcile;
pub mod sink;
pub mod tokenize;

pub use config::{MatchRule, PairMode, ReconciliationConfig};
pub use engine::run;
pub use error::ReconError;
pub use model::{FilePair, PairResult, Record, RunSummary};
pub use sink::ResultSink;
