use crate::config::MatchRule;
use crate::error::ReconError;
use crate::model::Record;

/// Derive the composite match key for a record.
///
/// For each configured field in order: missing field contributes an empty
/// string, then trim, then lowercase when matching case-insensitively. Parts
/// are joined with `|`.
///
/// Known collision risk: a literal `|` inside a field value is
/// indistinguishable from the separator, so adversarial values can collide.
/// Kept for compatibility with existing match results.
pub fn build_key(record: &Record, rule: &MatchRule) -> Result<String, ReconError> {
    if rule.matching_fields.is_empty() {
        return Err(ReconError::ConfigValidation(
            "match rule has no matching fields".into(),
        ));
    }

    let mut parts = Vec::with_capacity(rule.matching_fields.len());
    for field in &rule.matching_fields {
        let raw = record.get(field).unwrap_or("");
        let trimmed = if rule.trim { raw.trim() } else { raw };
        let part = if rule.case_sensitive {
            trimmed.to_string()
        } else {
            trimmed.to_lowercase()
        };
        parts.push(part);
    }

    Ok(parts.join("|"))
}
