use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::config::{PairMode, ReconciliationConfig};
use crate::error::ReconError;
use crate::model::FilePair;

/// Enumerate the file pairs to reconcile.
///
/// Both source folders must exist; a missing folder is fatal. Either side of
/// a returned pair may still be absent on disk; that is per-pair data, not a
/// pairing error. Ordering is stable within a run but otherwise unspecified.
pub fn build_pairs(config: &ReconciliationConfig) -> Result<Vec<FilePair>, ReconError> {
    for folder in [&config.folder_a, &config.folder_b] {
        if !folder.is_dir() {
            return Err(ReconError::MissingFolder(folder.clone()));
        }
    }

    let names_a = list_csv_files(&config.folder_a)?;
    let names_b = list_csv_files(&config.folder_b)?;
    debug!(
        "{} csv file(s) in {}, {} in {}",
        names_a.len(),
        config.folder_a.display(),
        names_b.len(),
        config.folder_b.display()
    );

    let pairs = match config.pair_mode {
        PairMode::SingleFile => single_file_pairs(config, &names_a, &names_b),
        PairMode::AllFiles => names_a
            .iter()
            .flat_map(|a| {
                names_b.iter().map(move |b| FilePair {
                    path_a: config.folder_a.join(a),
                    path_b: config.folder_b.join(b),
                })
            })
            .collect(),
    };

    Ok(pairs)
}

/// Same-name pairing over the case-insensitive union of both listings. Each
/// side resolves to its own on-disk casing when it has the file; the union
/// name is used for the side that does not (and will show up as missing).
fn single_file_pairs(
    config: &ReconciliationConfig,
    names_a: &[String],
    names_b: &[String],
) -> Vec<FilePair> {
    let by_lower_a = by_lower(names_a);
    let by_lower_b = by_lower(names_b);

    let mut union: HashMap<String, String> = HashMap::new();
    for name in names_a.iter().chain(names_b.iter()) {
        union.entry(name.to_lowercase()).or_insert_with(|| name.clone());
    }

    union
        .into_iter()
        .map(|(lower, name)| {
            let name_a = by_lower_a.get(&lower).unwrap_or(&name);
            let name_b = by_lower_b.get(&lower).unwrap_or(&name);
            FilePair {
                path_a: config.folder_a.join(name_a),
                path_b: config.folder_b.join(name_b),
            }
        })
        .collect()
}

fn by_lower(names: &[String]) -> HashMap<String, String> {
    names
        .iter()
        .map(|n| (n.to_lowercase(), n.clone()))
        .collect()
}

/// File names (not paths) of `*.csv` entries, extension matched
/// case-insensitively.
fn list_csv_files(folder: &Path) -> Result<Vec<String>, ReconError> {
    let entries = std::fs::read_dir(folder)
        .map_err(|e| ReconError::Io(format!("cannot list {}: {e}", folder.display())))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ReconError::Io(e.to_string()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.to_lowercase().ends_with(".csv") {
            names.push(name.to_string());
        }
    }
    Ok(names)
}
