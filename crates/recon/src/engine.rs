//! Orchestrator — runs the pair reconciler over all candidate pairs under
//! bounded concurrency and folds per-pair results into a run summary.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::ReconciliationConfig;
use crate::error::ReconError;
use crate::model::{PairResult, RunSummary};
use crate::pairing::build_pairs;
use crate::reconcile::reconcile_pair;
use crate::sink::ResultSink;

/// Run a full reconciliation. Fatal errors (invalid configuration, missing
/// source folder) surface before any pair is dispatched; everything after
/// that is recorded on the summary rather than raised.
pub async fn run(
    config: Arc<ReconciliationConfig>,
    sink: Arc<dyn ResultSink>,
    cancel: CancellationToken,
) -> Result<RunSummary, ReconError> {
    config.validate()?;

    let start_time = Utc::now();
    let started = Instant::now();

    let pairs = build_pairs(&config)?;
    let parallelism = effective_parallelism(config.parallelism);
    info!(
        "reconciling {} file pair(s) from {} and {}, parallelism {parallelism}",
        pairs.len(),
        config.folder_a.display(),
        config.folder_b.display()
    );

    let semaphore = Arc::new(Semaphore::new(parallelism));
    let mut tasks: JoinSet<PairResult> = JoinSet::new();

    for pair in pairs {
        if cancel.is_cancelled() {
            warn!("cancellation requested, no further pairs dispatched");
            break;
        }

        // A pair's reconciliation only starts once a slot is free.
        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };
        let config = Arc::clone(&config);
        let sink = Arc::clone(&sink);
        let cancel = cancel.clone();

        tasks.spawn(async move {
            let _permit = permit;
            let result = reconcile_pair(&pair, &config, cancel).await;
            if let Err(e) = sink.write_pair_result(&result).await {
                error!(
                    "failed to write artifacts for {} / {}: {e}",
                    result.file_a.display(),
                    result.file_b.display()
                );
            }
            result
        });
    }

    // Collect-then-reduce: pair results are immutable values, folded into the
    // totals here by this single task once each pair completes.
    let mut summary = RunSummary::new(&config, start_time);
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => summary.absorb(&result),
            Err(e) => error!("pair task failed: {e}"),
        }
    }

    summary.end_time = Utc::now().to_rfc3339();
    summary.total_processing_time_ms = started.elapsed().as_millis() as u64;

    if cancel.is_cancelled() {
        warn!(
            "run cancelled: summary covers the {} pair(s) that completed",
            summary.total_file_pairs
        );
    }

    if let Err(e) = sink.write_run_summary(&summary).await {
        error!("failed to write run summary: {e}");
    }

    info!(
        "reconciled {} pair(s): {} matched, {} only in A, {} only in B, {} errors in {} ms",
        summary.total_file_pairs,
        summary.total_matched,
        summary.total_only_in_a,
        summary.total_only_in_b,
        summary.total_errors,
        summary.total_processing_time_ms
    );

    Ok(summary)
}

fn effective_parallelism(configured: usize) -> usize {
    if configured > 0 {
        configured
    } else {
        std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_parallelism_wins() {
        assert_eq!(effective_parallelism(3), 3);
    }

    #[test]
    fn zero_falls_back_to_host_parallelism() {
        assert!(effective_parallelism(0) >= 1);
    }
}
