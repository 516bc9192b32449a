use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{MatchRule, ReconciliationConfig};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One parsed data line. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Record {
    pub source_file: PathBuf,
    /// 1-based line number in the source file.
    pub line_number: usize,
    pub raw_line: String,
    /// Field values by header name. Output column order comes from
    /// [`PairResult::all_headers`], not from this map.
    pub fields: HashMap<String, String>,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

/// One reconciled key: the first-loaded record from each side.
#[derive(Debug, Clone)]
pub struct MatchedPair {
    pub match_key: String,
    pub record_a: Record,
    pub record_b: Record,
}

/// A per-record failure captured during loading or key derivation.
#[derive(Debug, Clone)]
pub struct ProcessingError {
    pub source_file: PathBuf,
    pub line_number: usize,
    pub message: String,
    pub raw_line: String,
}

// ---------------------------------------------------------------------------
// Pairing
// ---------------------------------------------------------------------------

/// One candidate comparison. Either path may not exist on disk; that is
/// detected during reconciliation, not during pairing.
#[derive(Debug, Clone)]
pub struct FilePair {
    pub path_a: PathBuf,
    pub path_b: PathBuf,
}

// ---------------------------------------------------------------------------
// Pair result
// ---------------------------------------------------------------------------

/// Outcome of reconciling one file pair. Fully populated by the pair
/// reconciler, never mutated afterward.
#[derive(Debug)]
pub struct PairResult {
    pub file_a: PathBuf,
    pub file_b: PathBuf,
    pub file_a_missing: bool,
    pub file_b_missing: bool,
    pub total_in_a: usize,
    pub total_in_b: usize,
    pub matched_count: usize,
    pub only_in_a_count: usize,
    pub only_in_b_count: usize,
    pub processing_time_ms: u64,
    pub matched: Vec<MatchedPair>,
    pub only_in_a: Vec<Record>,
    pub only_in_b: Vec<Record>,
    pub errors: Vec<ProcessingError>,
    /// Header union: A's headers first, then B's not already present.
    pub all_headers: Vec<String>,
}

impl PairResult {
    pub fn new(pair: &FilePair) -> Self {
        Self {
            file_a: pair.path_a.clone(),
            file_b: pair.path_b.clone(),
            file_a_missing: false,
            file_b_missing: false,
            total_in_a: 0,
            total_in_b: 0,
            matched_count: 0,
            only_in_a_count: 0,
            only_in_b_count: 0,
            processing_time_ms: 0,
            matched: Vec::new(),
            only_in_a: Vec::new(),
            only_in_b: Vec::new(),
            errors: Vec::new(),
            all_headers: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// Count-level view of one pair, as written to the per-pair and run-level
/// JSON artifacts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairSummary {
    pub file_a: String,
    pub file_b: String,
    pub file_a_missing: bool,
    pub file_b_missing: bool,
    pub total_in_a: usize,
    pub total_in_b: usize,
    pub matched: usize,
    pub only_in_a: usize,
    pub only_in_b: usize,
    pub errors: usize,
    pub processing_time_ms: u64,
}

impl From<&PairResult> for PairSummary {
    fn from(result: &PairResult) -> Self {
        Self {
            file_a: result.file_a.display().to_string(),
            file_b: result.file_b.display().to_string(),
            file_a_missing: result.file_a_missing,
            file_b_missing: result.file_b_missing,
            total_in_a: result.total_in_a,
            total_in_b: result.total_in_b,
            matched: result.matched_count,
            only_in_a: result.only_in_a_count,
            only_in_b: result.only_in_b_count,
            errors: result.errors.len(),
            processing_time_ms: result.processing_time_ms,
        }
    }
}

/// Aggregate over all pairs of a run. Folded together by the orchestrator
/// once every pair task has completed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub start_time: String,
    pub end_time: String,
    pub total_processing_time_ms: u64,
    pub folder_a: String,
    pub folder_b: String,
    pub comparison_mode: String,
    pub matching_rule: MatchRule,
    pub total_file_pairs: usize,
    pub missing_files: usize,
    pub total_records_in_a: usize,
    pub total_records_in_b: usize,
    pub total_matched: usize,
    pub total_only_in_a: usize,
    pub total_only_in_b: usize,
    pub total_errors: usize,
    pub file_pair_results: Vec<PairSummary>,
}

impl RunSummary {
    pub fn new(config: &ReconciliationConfig, start_time: DateTime<Utc>) -> Self {
        Self {
            start_time: start_time.to_rfc3339(),
            end_time: String::new(),
            total_processing_time_ms: 0,
            folder_a: config.folder_a.display().to_string(),
            folder_b: config.folder_b.display().to_string(),
            comparison_mode: config.pair_mode.to_string(),
            matching_rule: config.match_rule.clone(),
            total_file_pairs: 0,
            missing_files: 0,
            total_records_in_a: 0,
            total_records_in_b: 0,
            total_matched: 0,
            total_only_in_a: 0,
            total_only_in_b: 0,
            total_errors: 0,
            file_pair_results: Vec::new(),
        }
    }

    /// Fold one completed pair into the running totals.
    pub fn absorb(&mut self, result: &PairResult) {
        self.total_file_pairs += 1;
        self.missing_files +=
            usize::from(result.file_a_missing) + usize::from(result.file_b_missing);
        self.total_records_in_a += result.total_in_a;
        self.total_records_in_b += result.total_in_b;
        self.total_matched += result.matched_count;
        self.total_only_in_a += result.only_in_a_count;
        self.total_only_in_b += result.only_in_b_count;
        self.total_errors += result.errors.len();
        self.file_pair_results.push(PairSummary::from(result));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PairMode;

    fn record(fields: &[(&str, &str)]) -> Record {
        Record {
            source_file: PathBuf::from("x.csv"),
            line_number: 2,
            raw_line: String::new(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn record_lookup_is_by_name() {
        let r = record(&[("id", "1"), ("val", "foo")]);
        assert_eq!(r.get("val"), Some("foo"));
        assert_eq!(r.get("absent"), None);
    }

    #[test]
    fn summary_absorbs_pair_counts() {
        let config = ReconciliationConfig {
            folder_a: "A".into(),
            folder_b: "B".into(),
            output_folder: "out".into(),
            match_rule: MatchRule {
                matching_fields: vec!["id".into()],
                case_sensitive: false,
                trim: true,
            },
            parallelism: 0,
            delimiter: ',',
            has_header_row: true,
            pair_mode: PairMode::SingleFile,
        };
        let mut summary = RunSummary::new(&config, Utc::now());

        let pair = FilePair {
            path_a: "A/x.csv".into(),
            path_b: "B/x.csv".into(),
        };
        let mut result = PairResult::new(&pair);
        result.file_b_missing = true;
        result.total_in_a = 3;
        result.matched_count = 1;
        result.only_in_a_count = 2;
        summary.absorb(&result);

        assert_eq!(summary.total_file_pairs, 1);
        assert_eq!(summary.missing_files, 1);
        assert_eq!(summary.total_records_in_a, 3);
        assert_eq!(summary.total_matched, 1);
        assert_eq!(summary.total_only_in_a, 2);
        assert_eq!(summary.file_pair_results.len(), 1);
        assert_eq!(summary.comparison_mode, "single-file");
    }

    #[test]
    fn summary_serializes_camel_case() {
        let pair = FilePair {
            path_a: "A/x.csv".into(),
            path_b: "B/x.csv".into(),
        };
        let summary = PairSummary::from(&PairResult::new(&pair));
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"fileAMissing\""));
        assert!(json.contains("\"processingTimeMs\""));
    }
}
