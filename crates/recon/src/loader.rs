//! Record loader — turns a file's lines into [`Record`]s keyed by header
//! names, tolerating malformed lines.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::model::Record;
use crate::tokenize::{split_line, tokenize};

/// Lazy, forward-only record producer over one file. Consumed exactly once
/// via [`RecordStream::next_record`].
pub struct RecordStream {
    lines: Option<Lines<BufReader<File>>>,
    headers: Vec<String>,
    path: PathBuf,
    delimiter: char,
    line_number: usize,
    cancel: CancellationToken,
}

impl RecordStream {
    /// Open a file for record production. A missing file logs a warning and
    /// produces an empty stream, not an error.
    pub async fn open(
        path: &Path,
        delimiter: char,
        has_header: bool,
        cancel: CancellationToken,
    ) -> Self {
        let file = match File::open(path).await {
            Ok(file) => file,
            Err(_) => {
                warn!("file not found: {}", path.display());
                return Self {
                    lines: None,
                    headers: Vec::new(),
                    path: path.to_path_buf(),
                    delimiter,
                    line_number: 0,
                    cancel,
                };
            }
        };

        let mut lines = BufReader::new(file).lines();
        let mut headers = Vec::new();
        let mut line_number = 0;

        if has_header {
            if let Ok(Some(line)) = lines.next_line().await {
                line_number += 1;
                let line = strip_bom(&line);
                // An empty header line leaves the list empty; names are then
                // synthesized from the first data row's width.
                if !line.is_empty() {
                    headers = split_line(line, delimiter);
                }
                debug!("headers from {}: {}", path.display(), headers.join(", "));
            }
        }

        Self {
            lines: Some(lines),
            headers,
            path: path.to_path_buf(),
            delimiter,
            line_number,
            cancel,
        }
    }

    /// Header names read from the file (or synthesized once data is seen).
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Next record, skipping blank and malformed lines. Returns `None` at end
    /// of file, on a read error, or once cancellation is observed.
    pub async fn next_record(&mut self) -> Option<Record> {
        let lines = self.lines.as_mut()?;

        loop {
            if self.cancel.is_cancelled() {
                return None;
            }

            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => {
                    warn!("read error in {}: {e}", self.path.display());
                    return None;
                }
            };
            self.line_number += 1;

            let raw = if self.line_number == 1 {
                strip_bom(&line).to_string()
            } else {
                line
            };

            if raw.trim().is_empty() {
                continue;
            }

            let tokenized = tokenize(&raw, self.delimiter);
            if tokenized.unterminated {
                warn!(
                    "skipping malformed line {} in {}: unterminated quote",
                    self.line_number,
                    self.path.display()
                );
                continue;
            }
            let values = tokenized.fields;

            if self.headers.is_empty() {
                self.headers = (1..=values.len()).map(|i| format!("Column{i}")).collect();
            }

            let mut fields = HashMap::with_capacity(self.headers.len().max(values.len()));
            for (i, value) in values.into_iter().enumerate() {
                let name = match self.headers.get(i) {
                    Some(header) => header.clone(),
                    // Extra values beyond the header list get synthesized names.
                    None => format!("Column{}", i + 1),
                };
                fields.insert(name, value);
            }
            // Short rows: remaining headers map to empty strings.
            for header in &self.headers {
                fields.entry(header.clone()).or_default();
            }

            return Some(Record {
                source_file: self.path.clone(),
                line_number: self.line_number,
                raw_line: raw,
                fields,
            });
        }
    }
}

/// Read only the header line of a file. Missing file or empty file yields an
/// empty list.
pub async fn read_headers(path: &Path, delimiter: char) -> Vec<String> {
    let file = match File::open(path).await {
        Ok(file) => file,
        Err(_) => {
            warn!("file not found: {}", path.display());
            return Vec::new();
        }
    };

    let mut lines = BufReader::new(file).lines();
    match lines.next_line().await {
        Ok(Some(line)) => {
            let line = strip_bom(&line);
            if line.is_empty() {
                Vec::new()
            } else {
                split_line(line, delimiter)
            }
        }
        _ => Vec::new(),
    }
}

fn strip_bom(line: &str) -> &str {
    line.strip_prefix('\u{feff}').unwrap_or(line)
}
