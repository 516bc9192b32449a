//! Pair reconciler — loads both sides of one file pair concurrently, then
//! partitions records into matched / only-in-A / only-in-B by match key.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::{MatchRule, ReconciliationConfig};
use crate::key::build_key;
use crate::loader::{read_headers, RecordStream};
use crate::model::{FilePair, MatchedPair, PairResult, ProcessingError, Record};

// ---------------------------------------------------------------------------
// Key-grouped records
// ---------------------------------------------------------------------------

/// Records of one side grouped by match key, in load order within a group.
/// Exactly one loader writes a side, so no internal locking is needed.
#[derive(Debug, Default)]
pub(crate) struct KeyGroups {
    groups: HashMap<String, Vec<Record>>,
}

impl KeyGroups {
    pub(crate) fn insert(&mut self, key: String, record: Record) {
        self.groups.entry(key).or_default().push(record);
    }

    pub(crate) fn get(&self, key: &str) -> Option<&[Record]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    pub(crate) fn contains_key(&self, key: &str) -> bool {
        self.groups.contains_key(key)
    }

    /// Iteration order is the map's; callers must not depend on it.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&String, &[Record])> {
        self.groups.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub(crate) fn total_records(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Reconcile one file pair. Never fails: missing files and per-record
/// problems are recorded on the result, not raised.
pub async fn reconcile_pair(
    pair: &FilePair,
    config: &ReconciliationConfig,
    cancel: CancellationToken,
) -> PairResult {
    let started = Instant::now();
    let mut result = PairResult::new(pair);

    let a_exists = pair.path_a.is_file();
    let b_exists = pair.path_b.is_file();
    result.file_a_missing = !a_exists;
    result.file_b_missing = !b_exists;

    if !a_exists && !b_exists {
        warn!(
            "both files missing: {} and {}",
            pair.path_a.display(),
            pair.path_b.display()
        );
        result.processing_time_ms = started.elapsed().as_millis() as u64;
        return result;
    }
    if !a_exists {
        warn!("file missing on side A: {}", pair.path_a.display());
    }
    if !b_exists {
        warn!("file missing on side B: {}", pair.path_b.display());
    }

    // Header peek: drives the output header union and flags configured match
    // fields a side cannot supply (they contribute empty key parts there).
    let (mut headers_a, mut headers_b) = (Vec::new(), Vec::new());
    if config.has_header_row {
        if a_exists {
            headers_a = read_headers(&pair.path_a, config.delimiter).await;
            warn_absent_match_fields(&config.match_rule, &headers_a, &pair.path_a);
        }
        if b_exists {
            headers_b = read_headers(&pair.path_b, config.delimiter).await;
            warn_absent_match_fields(&config.match_rule, &headers_b, &pair.path_b);
        }
    }

    let errors = Arc::new(Mutex::new(Vec::new()));
    let (side_a, side_b) = tokio::join!(
        load_side(
            &pair.path_a,
            a_exists,
            config,
            Arc::clone(&errors),
            cancel.clone()
        ),
        load_side(
            &pair.path_b,
            b_exists,
            config,
            Arc::clone(&errors),
            cancel.clone()
        ),
    );
    let (groups_a, loaded_headers_a) = side_a;
    let (groups_b, loaded_headers_b) = side_b;

    // Headerless files get their synthesized Column names from the loaders.
    if !config.has_header_row {
        headers_a = loaded_headers_a;
        headers_b = loaded_headers_b;
    }
    result.all_headers = header_union(headers_a, &headers_b);

    result.total_in_a = groups_a.total_records();
    result.total_in_b = groups_b.total_records();

    // Match pass, sequential, after both loads. A key on both sides emits
    // exactly one pair from the first-loaded record of each side; surplus
    // same-key records are collapsed away. A key on one side only sends all
    // of its records to that side's list.
    for (key, records_a) in groups_a.iter() {
        match groups_b.get(key) {
            Some(records_b) => {
                if let (Some(a), Some(b)) = (records_a.first(), records_b.first()) {
                    result.matched.push(MatchedPair {
                        match_key: key.clone(),
                        record_a: a.clone(),
                        record_b: b.clone(),
                    });
                }
            }
            None => result.only_in_a.extend(records_a.iter().cloned()),
        }
    }
    for (key, records_b) in groups_b.iter() {
        if !groups_a.contains_key(key) {
            result.only_in_b.extend(records_b.iter().cloned());
        }
    }

    result.matched_count = result.matched.len();
    result.only_in_a_count = result.only_in_a.len();
    result.only_in_b_count = result.only_in_b.len();
    result.errors = Arc::try_unwrap(errors)
        .map(|lock| lock.into_inner().unwrap_or_else(|e| e.into_inner()))
        .unwrap_or_default();
    result.processing_time_ms = started.elapsed().as_millis() as u64;
    result
}

/// Load one side into key groups. Key-derivation failures become
/// [`ProcessingError`]s in the shared list and do not abort the load.
async fn load_side(
    path: &Path,
    exists: bool,
    config: &ReconciliationConfig,
    errors: Arc<Mutex<Vec<ProcessingError>>>,
    cancel: CancellationToken,
) -> (KeyGroups, Vec<String>) {
    let mut groups = KeyGroups::default();
    if !exists {
        return (groups, Vec::new());
    }

    let mut stream =
        RecordStream::open(path, config.delimiter, config.has_header_row, cancel).await;
    while let Some(record) = stream.next_record().await {
        match build_key(&record, &config.match_rule) {
            Ok(key) => groups.insert(key, record),
            Err(e) => {
                let message = e.to_string();
                warn!(
                    "key derivation failed at {}:{}: {message}",
                    path.display(),
                    record.line_number
                );
                let mut errors = errors.lock().unwrap_or_else(|e| e.into_inner());
                errors.push(ProcessingError {
                    source_file: record.source_file,
                    line_number: record.line_number,
                    message,
                    raw_line: record.raw_line,
                });
            }
        }
    }

    let headers = stream.headers().to_vec();
    (groups, headers)
}

/// A's headers first, then B's headers not already present.
fn header_union(headers_a: Vec<String>, headers_b: &[String]) -> Vec<String> {
    let mut union = headers_a;
    for header in headers_b {
        if !union.contains(header) {
            union.push(header.clone());
        }
    }
    union
}

fn warn_absent_match_fields(rule: &MatchRule, headers: &[String], path: &Path) {
    if headers.is_empty() {
        return;
    }
    for field in &rule.matching_fields {
        if !headers.contains(field) {
            warn!(
                "matching field '{field}' not present in headers of {}",
                path.display()
            );
        }
    }
}
