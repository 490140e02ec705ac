use crate::model::{ChangeRecord, Period};
use chrono::NaiveDate;

const SHORT_ID_LEN: usize = 8;
const SUMMARY_MAX: usize = 40;

/// Bucket key for a calendar period. Fixed-width so lexical order is chronological.
pub fn period_key(date: &NaiveDate, period: Period) -> String {
    match period {
        Period::Day | Period::Commit => date.format("%Y-%m-%d").to_string(),
        Period::Month => date.format("%Y-%m").to_string(),
        Period::Year => date.format("%Y").to_string(),
    }
}

pub fn commit_key(record: &ChangeRecord) -> String {
    let short = record.id.as_deref().map(short_id).unwrap_or_default();
    let summary = record.summary.as_deref().map(|s| truncate(s, SUMMARY_MAX)).unwrap_or_default();
    format!("{} {} {}", period_key(&record.date, Period::Day), short, summary)
        .trim_end()
        .to_string()
}

pub fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

pub fn truncate(s: &str, max: usize) -> String {
    let line = s.lines().next().unwrap_or("");
    if line.chars().count() > max {
        let kept: String = line.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        line.to_string()
    }
}

/// Lowercased extension without its leading dot; empty input stays empty.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

pub fn is_ignored(path: &str, ignored: &[String]) -> bool {
    if ignored.is_empty() {
        return false;
    }
    let lower = path.to_lowercase();
    ignored
        .iter()
        .filter(|ext| !ext.is_empty())
        .any(|ext| lower.ends_with(&format!(".{ext}")))
}
