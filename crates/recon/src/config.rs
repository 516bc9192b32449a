use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Match rule
// ---------------------------------------------------------------------------

/// Composite-key matching rule: which fields form the key and how their
/// values are normalized before comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRule {
    pub matching_fields: Vec<String>,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default = "default_trim")]
    pub trim: bool,
}

fn default_trim() -> bool {
    true
}

impl MatchRule {
    pub fn from_json(input: &str) -> Result<Self, ReconError> {
        let rule: MatchRule =
            serde_json::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        rule.validate()?;
        Ok(rule)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.matching_fields.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one matching field must be specified".into(),
            ));
        }

        if self.matching_fields.iter().any(|f| f.trim().is_empty()) {
            return Err(ReconError::ConfigValidation(
                "matching field names cannot be empty or whitespace".into(),
            ));
        }

        // Duplicates are rejected ignoring case: two fields that differ only
        // in casing would contribute identical key parts.
        let mut seen = HashSet::new();
        for field in &self.matching_fields {
            if !seen.insert(field.to_lowercase()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate matching field: {field}"
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Pairing mode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PairMode {
    /// Pair files sharing the same (case-insensitive) name across folders.
    SingleFile,
    /// Cross product: every file in A against every file in B.
    AllFiles,
}

impl std::fmt::Display for PairMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SingleFile => write!(f, "single-file"),
            Self::AllFiles => write!(f, "all-files"),
        }
    }
}

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// Fully validated input to [`crate::engine::run`]. Assembled by the caller;
/// the engine itself performs no argument parsing or environment access.
#[derive(Debug, Clone)]
pub struct ReconciliationConfig {
    pub folder_a: PathBuf,
    pub folder_b: PathBuf,
    pub output_folder: PathBuf,
    pub match_rule: MatchRule,
    /// Max file pairs reconciled at once; 0 means host parallelism.
    pub parallelism: usize,
    pub delimiter: char,
    pub has_header_row: bool,
    pub pair_mode: PairMode,
}

impl ReconciliationConfig {
    pub fn validate(&self) -> Result<(), ReconError> {
        self.match_rule.validate()?;
        if !self.delimiter.is_ascii() {
            return Err(ReconError::ConfigValidation(format!(
                "delimiter must be a single ASCII character, got '{}'",
                self.delimiter
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
