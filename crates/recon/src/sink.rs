use async_trait::async_trait;

use crate::error::ReconError;
use crate::model::{PairResult, RunSummary};

/// Destination for reconciliation output artifacts. The orchestrator hands
/// over each completed pair result and, finally, the run summary.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn write_pair_result(&self, result: &PairResult) -> Result<(), ReconError>;

    async fn write_run_summary(&self, summary: &RunSummary) -> Result<(), ReconError>;
}
