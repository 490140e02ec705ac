//! Running per-day churn totals for one repository analysis.

use crate::model::{ChangeRecord, DailyTotal, LineTotals};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Owns the day buckets and the commit-order list of a single analysis.
///
/// Switching repositories or changing the ignore list means building a new
/// accumulator; there is no partial invalidation.
#[derive(Debug, Default)]
pub struct CommitStatAccumulator {
    days: BTreeMap<NaiveDate, LineTotals>,
    commits: Vec<ChangeRecord>,
}

impl CommitStatAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a change to its day bucket. Zero-churn records still create the day.
    pub fn record(&mut self, change: ChangeRecord) {
        self.days
            .entry(change.date)
            .or_default()
            .add(change.insertions, change.deletions);
        self.commits.push(change);
    }

    /// Owned copy of the day totals, oldest first.
    pub fn snapshot(&self) -> Vec<DailyTotal> {
        self.days
            .iter()
            .map(|(date, totals)| DailyTotal { date: *date, totals: *totals })
            .collect()
    }

    /// Records in ingestion order.
    pub fn commits(&self) -> &[ChangeRecord] {
        &self.commits
    }

    pub fn reset(&mut self) {
        self.days.clear();
        self.commits.clear();
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    pub fn first_active_date(&self) -> Option<NaiveDate> {
        self.days.iter().find(|(_, t)| !t.is_zero()).map(|(d, _)| *d)
    }

    pub fn last_active_date(&self) -> Option<NaiveDate> {
        self.days.iter().rev().find(|(_, t)| !t.is_zero()).map(|(d, _)| *d)
    }
}

impl Extend<ChangeRecord> for CommitStatAccumulator {
    fn extend<I: IntoIterator<Item = ChangeRecord>>(&mut self, iter: I) {
        for change in iter {
            self.record(change);
        }
    }
}

impl FromIterator<ChangeRecord> for CommitStatAccumulator {
    fn from_iter<I: IntoIterator<Item = ChangeRecord>>(iter: I) -> Self {
        let mut acc = Self::new();
        acc.extend(iter);
        acc
    }
}
