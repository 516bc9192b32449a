use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use reconcsv_recon::model::PairSummary;
use reconcsv_recon::{
    FilePair, MatchRule, PairMode, PairResult, ReconError, ReconciliationConfig, ResultSink,
    RunSummary,
};

// -------------------------------------------------------------------------
// Helpers
// -------------------------------------------------------------------------

/// Sink that records per-pair summaries instead of writing files.
#[derive(Default)]
struct CollectSink {
    pairs: Mutex<Vec<PairSummary>>,
    run: Mutex<Option<RunSummary>>,
}

#[async_trait]
impl ResultSink for CollectSink {
    async fn write_pair_result(&self, result: &PairResult) -> Result<(), ReconError> {
        self.pairs
            .lock()
            .unwrap()
            .push(PairSummary::from(result));
        Ok(())
    }

    async fn write_run_summary(&self, summary: &RunSummary) -> Result<(), ReconError> {
        *self.run.lock().unwrap() = Some(summary.clone());
        Ok(())
    }
}

fn config(folder_a: &Path, folder_b: &Path) -> ReconciliationConfig {
    ReconciliationConfig {
        folder_a: folder_a.to_path_buf(),
        folder_b: folder_b.to_path_buf(),
        output_folder: folder_a.join("out"),
        match_rule: MatchRule {
            matching_fields: vec!["id".into()],
            case_sensitive: false,
            trim: true,
        },
        parallelism: 2,
        delimiter: ',',
        has_header_row: true,
        pair_mode: PairMode::SingleFile,
    }
}

async fn run_with_sink(
    config: ReconciliationConfig,
    cancel: CancellationToken,
) -> (RunSummary, Arc<CollectSink>) {
    let sink = Arc::new(CollectSink::default());
    let summary = reconcsv_recon::run(Arc::new(config), Arc::clone(&sink) as _, cancel)
        .await
        .unwrap();
    (summary, sink)
}

// -------------------------------------------------------------------------
// End-to-end runs
// -------------------------------------------------------------------------

#[tokio::test]
async fn single_pair_matches_by_key() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    std::fs::write(a.path().join("x.csv"), "id,val\n1,foo\n").unwrap();
    std::fs::write(b.path().join("x.csv"), "id,val\n1,bar\n").unwrap();

    let (summary, sink) =
        run_with_sink(config(a.path(), b.path()), CancellationToken::new()).await;

    assert_eq!(summary.total_file_pairs, 1);
    assert_eq!(summary.total_matched, 1);
    assert_eq!(summary.total_only_in_a, 0);
    assert_eq!(summary.total_only_in_b, 0);
    assert_eq!(summary.missing_files, 0);
    assert_eq!(summary.file_pair_results.len(), 1);
    assert_eq!(sink.pairs.lock().unwrap().len(), 1);
    assert!(sink.run.lock().unwrap().is_some());
}

#[tokio::test]
async fn absent_side_b_file_is_flagged_not_fatal() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    std::fs::write(a.path().join("x.csv"), "id,val\n1,foo\n").unwrap();

    let (summary, _) = run_with_sink(config(a.path(), b.path()), CancellationToken::new()).await;

    assert_eq!(summary.total_file_pairs, 1);
    assert_eq!(summary.missing_files, 1);
    assert_eq!(summary.total_records_in_b, 0);
    assert_eq!(summary.total_only_in_a, 1);
    assert_eq!(summary.total_matched, 0);
    assert!(summary.file_pair_results[0].file_b_missing);
}

#[tokio::test]
async fn totals_are_sums_over_pairs() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    std::fs::write(a.path().join("one.csv"), "id\n1\n2\n").unwrap();
    std::fs::write(b.path().join("one.csv"), "id\n2\n3\n").unwrap();
    std::fs::write(a.path().join("two.csv"), "id\n10\n").unwrap();
    std::fs::write(b.path().join("two.csv"), "id\n10\n11\n12\n").unwrap();

    let (summary, _) = run_with_sink(config(a.path(), b.path()), CancellationToken::new()).await;

    assert_eq!(summary.total_file_pairs, 2);
    assert_eq!(summary.total_records_in_a, 3);
    assert_eq!(summary.total_records_in_b, 5);
    assert_eq!(summary.total_matched, 2);
    assert_eq!(summary.total_only_in_a, 1);
    assert_eq!(summary.total_only_in_b, 3);

    let folded: usize = summary.file_pair_results.iter().map(|p| p.matched).sum();
    assert_eq!(folded, summary.total_matched);
    let folded: usize = summary.file_pair_results.iter().map(|p| p.total_in_a).sum();
    assert_eq!(folded, summary.total_records_in_a);
}

#[tokio::test]
async fn runs_are_idempotent_on_counts() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    std::fs::write(a.path().join("x.csv"), "id,val\n1,a\n2,b\n2,c\n").unwrap();
    std::fs::write(b.path().join("x.csv"), "id,val\n2,z\n4,w\n").unwrap();

    let (first, _) = run_with_sink(config(a.path(), b.path()), CancellationToken::new()).await;
    let (second, _) = run_with_sink(config(a.path(), b.path()), CancellationToken::new()).await;

    assert_eq!(first.total_matched, second.total_matched);
    assert_eq!(first.total_only_in_a, second.total_only_in_a);
    assert_eq!(first.total_only_in_b, second.total_only_in_b);
    assert_eq!(first.total_errors, second.total_errors);
}

#[tokio::test]
async fn all_files_mode_reconciles_the_cross_product() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    std::fs::write(a.path().join("a1.csv"), "id\n1\n").unwrap();
    std::fs::write(a.path().join("a2.csv"), "id\n2\n").unwrap();
    std::fs::write(b.path().join("b1.csv"), "id\n1\n").unwrap();

    let mut config = config(a.path(), b.path());
    config.pair_mode = PairMode::AllFiles;
    let (summary, _) = run_with_sink(config, CancellationToken::new()).await;

    assert_eq!(summary.total_file_pairs, 2);
    assert_eq!(summary.comparison_mode, "all-files");
    assert_eq!(summary.total_matched, 1); // a1×b1 matches on id=1
}

#[tokio::test]
async fn missing_source_folder_aborts_before_pairing() {
    let a = tempfile::tempdir().unwrap();
    let config = config(a.path(), &a.path().join("nope"));
    let sink = Arc::new(CollectSink::default());
    let err = reconcsv_recon::run(
        Arc::new(config),
        Arc::clone(&sink) as _,
        CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ReconError::MissingFolder(_)));
    assert!(sink.pairs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_rule_aborts_before_pairing() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let mut config = config(a.path(), b.path());
    config.match_rule.matching_fields = vec!["id".into(), "ID".into()];

    let err = reconcsv_recon::run(
        Arc::new(config),
        Arc::new(CollectSink::default()) as _,
        CancellationToken::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ReconError::ConfigValidation(_)));
}

#[tokio::test]
async fn cancelled_run_dispatches_no_pairs() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    std::fs::write(a.path().join("x.csv"), "id\n1\n").unwrap();
    std::fs::write(b.path().join("x.csv"), "id\n1\n").unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let (summary, sink) = run_with_sink(config(a.path(), b.path()), cancel).await;

    assert_eq!(summary.total_file_pairs, 0);
    assert!(sink.pairs.lock().unwrap().is_empty());
    // The run summary is still produced, covering zero pairs.
    assert!(sink.run.lock().unwrap().is_some());
}

// -------------------------------------------------------------------------
// Direct reconciler checks through the public surface
// -------------------------------------------------------------------------

#[tokio::test]
async fn reconcile_pair_collapses_duplicate_keys() {
    use reconcsv_recon::reconcile::reconcile_pair;

    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    std::fs::write(a.path().join("x.csv"), "id,val\n5,one\n5,two\n").unwrap();
    std::fs::write(b.path().join("x.csv"), "id,val\n5,only\n").unwrap();

    let pair = FilePair {
        path_a: a.path().join("x.csv"),
        path_b: b.path().join("x.csv"),
    };
    let result = reconcile_pair(&pair, &config(a.path(), b.path()), CancellationToken::new()).await;

    assert_eq!(result.matched_count, 1);
    assert_eq!(result.only_in_a_count, 0);
    assert_eq!(result.only_in_b_count, 0);
    assert_eq!(result.total_in_a, 2);
}
