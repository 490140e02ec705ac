use crate::accumulator::CommitStatAccumulator;
use crate::git::{CollectOptions, GitRepo};
use crate::model::DateRange;
use anyhow::Context;
use tracing::debug;

/// Builds a fresh accumulator from the repository history, oldest commit first.
pub fn fetch_changes(repo: &GitRepo, range: &DateRange, opts: &CollectOptions) -> anyhow::Result<CommitStatAccumulator> {
    let records = repo
        .collect_changes(range, opts)
        .context("Failed to collect commits from repository")?;

    let mut acc = CommitStatAccumulator::new();
    for record in records {
        acc.record(record);
    }

    debug!(
        commits = acc.len(),
        days = acc.snapshot().len(),
        ignored = ?opts.ignored_extensions,
        "history ingested"
    );
    Ok(acc)
}
