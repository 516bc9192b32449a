//! Per-pair and run-level result artifacts.
//!
//! Each reconciled pair gets its own subfolder under the output folder:
//! `matched.csv` (header union with `A_`/`B_` prefixes, both records side by
//! side), `only-in-folderA.csv`, `only-in-folderB.csv`, `errors.csv` and
//! `reconcile-summary.json`. The run writes one `global-summary.json`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use reconcsv_recon::model::{MatchedPair, PairSummary, ProcessingError, Record};
use reconcsv_recon::{PairResult, ReconError, ResultSink, RunSummary};

pub struct ResultWriter {
    output_folder: PathBuf,
    delimiter: u8,
}

impl ResultWriter {
    /// The delimiter is validated as ASCII at configuration time; a non-ASCII
    /// character falls back to a comma rather than truncating.
    pub fn new(output_folder: impl Into<PathBuf>, delimiter: char) -> Self {
        Self {
            output_folder: output_folder.into(),
            delimiter: u8::try_from(delimiter).unwrap_or(b','),
        }
    }
}

#[async_trait]
impl ResultSink for ResultWriter {
    async fn write_pair_result(&self, result: &PairResult) -> Result<(), ReconError> {
        let pair_folder = self
            .output_folder
            .join(pair_folder_name(&result.file_a, &result.file_b));
        tokio::fs::create_dir_all(&pair_folder)
            .await
            .map_err(|e| ReconError::Io(e.to_string()))?;

        if !result.matched.is_empty() {
            let bytes = matched_csv(&result.matched, &result.all_headers, self.delimiter)?;
            write_file(&pair_folder.join("matched.csv"), bytes).await?;
        }
        if !result.only_in_a.is_empty() {
            let bytes = records_csv(&result.only_in_a, &result.all_headers, self.delimiter)?;
            write_file(&pair_folder.join("only-in-folderA.csv"), bytes).await?;
        }
        if !result.only_in_b.is_empty() {
            let bytes = records_csv(&result.only_in_b, &result.all_headers, self.delimiter)?;
            write_file(&pair_folder.join("only-in-folderB.csv"), bytes).await?;
        }
        if !result.errors.is_empty() {
            let bytes = errors_csv(&result.errors, self.delimiter)?;
            write_file(&pair_folder.join("errors.csv"), bytes).await?;
        }

        let summary = PairSummary::from(result);
        let json = serde_json::to_vec_pretty(&summary)
            .map_err(|e| ReconError::Io(e.to_string()))?;
        write_file(&pair_folder.join("reconcile-summary.json"), json).await?;

        info!("wrote output files to {}", pair_folder.display());
        Ok(())
    }

    async fn write_run_summary(&self, summary: &RunSummary) -> Result<(), ReconError> {
        tokio::fs::create_dir_all(&self.output_folder)
            .await
            .map_err(|e| ReconError::Io(e.to_string()))?;

        let path = self.output_folder.join("global-summary.json");
        let json =
            serde_json::to_vec_pretty(summary).map_err(|e| ReconError::Io(e.to_string()))?;
        write_file(&path, json).await?;

        info!("wrote global summary to {}", path.display());
        Ok(())
    }
}

async fn write_file(path: &Path, bytes: Vec<u8>) -> Result<(), ReconError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| ReconError::Io(format!("cannot write {}: {e}", path.display())))
}

// ---------------------------------------------------------------------------
// CSV encoding
// ---------------------------------------------------------------------------

fn csv_writer(delimiter: u8) -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(Vec::new())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, ReconError> {
    writer
        .into_inner()
        .map_err(|e| ReconError::Io(e.to_string()))
}

/// Matched records with both sides' fields side by side, columns ordered by
/// the pair's header union.
fn matched_csv(
    matched: &[MatchedPair],
    headers: &[String],
    delimiter: u8,
) -> Result<Vec<u8>, ReconError> {
    let mut writer = csv_writer(delimiter);

    let mut header_row = Vec::with_capacity(headers.len() * 2);
    header_row.extend(headers.iter().map(|h| format!("A_{h}")));
    header_row.extend(headers.iter().map(|h| format!("B_{h}")));
    writer
        .write_record(&header_row)
        .map_err(|e| ReconError::Io(e.to_string()))?;

    for pair in matched {
        let mut row = Vec::with_capacity(headers.len() * 2);
        row.extend(headers.iter().map(|h| field_of(&pair.record_a, h)));
        row.extend(headers.iter().map(|h| field_of(&pair.record_b, h)));
        writer
            .write_record(&row)
            .map_err(|e| ReconError::Io(e.to_string()))?;
    }

    finish(writer)
}

fn records_csv(
    records: &[Record],
    headers: &[String],
    delimiter: u8,
) -> Result<Vec<u8>, ReconError> {
    let mut writer = csv_writer(delimiter);

    writer
        .write_record(headers)
        .map_err(|e| ReconError::Io(e.to_string()))?;
    for record in records {
        let row: Vec<String> = headers.iter().map(|h| field_of(record, h)).collect();
        writer
            .write_record(&row)
            .map_err(|e| ReconError::Io(e.to_string()))?;
    }

    finish(writer)
}

fn errors_csv(errors: &[ProcessingError], delimiter: u8) -> Result<Vec<u8>, ReconError> {
    let mut writer = csv_writer(delimiter);

    writer
        .write_record(["SourceFile", "LineNumber", "Message", "RawLine"])
        .map_err(|e| ReconError::Io(e.to_string()))?;
    for error in errors {
        writer
            .write_record([
                error.source_file.display().to_string(),
                error.line_number.to_string(),
                error.message.clone(),
                error.raw_line.clone(),
            ])
            .map_err(|e| ReconError::Io(e.to_string()))?;
    }

    finish(writer)
}

fn field_of(record: &Record, header: &str) -> String {
    record.get(header).unwrap_or("").to_string()
}

// ---------------------------------------------------------------------------
// Pair folder naming
// ---------------------------------------------------------------------------

/// Folder name for one pair's artifacts: the common stem when both files
/// share it (ignoring case), otherwise `<stemA>_vs_<stemB>`.
fn pair_folder_name(file_a: &Path, file_b: &Path) -> String {
    let stem_a = stem_of(file_a);
    let stem_b = stem_of(file_b);

    if stem_a.eq_ignore_ascii_case(&stem_b) {
        sanitize(&stem_a)
    } else {
        sanitize(&format!("{stem_a}_vs_{stem_b}"))
    }
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_control() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') {
                '_'
            } else {
                c
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
