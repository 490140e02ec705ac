//! Nearest-rank percentile cutoff and the "typical" average below it.

use crate::model::{ClassificationResult, Percentile};
use std::collections::HashMap;

/// Splits `values` at the nearest-rank `percentile` cutoff.
///
/// Values equal to the cutoff are kept, so heavy ties can retain more than the
/// nominal share. Fewer than two samples are returned unfiltered.
pub fn classify(values: &[u64], percentile: Percentile) -> ClassificationResult {
    if values.len() <= 1 {
        let only = values.first().copied().unwrap_or(0);
        return ClassificationResult {
            percentile_value: only,
            filtered_values: values.to_vec(),
            average_value: only as f64,
        };
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let n = sorted.len();
    // ceil(p * n / 100) - 1 without going through floats
    let rank = (percentile.get() as usize * n).div_ceil(100);
    let index = rank.saturating_sub(1).min(n - 1);
    let percentile_value = sorted[index];

    let filtered_values: Vec<u64> = values.iter().copied().filter(|v| *v <= percentile_value).collect();

    ClassificationResult {
        percentile_value,
        average_value: mean(&filtered_values),
        filtered_values,
    }
}

fn mean(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<u64>() as f64 / values.len() as f64
}

/// Display rank of `value` in `values`: position of the first element `>= value`, in percent.
pub fn percentile_rank(value: u64, values: &[u64]) -> u32 {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    rank_in_sorted(value, &sorted)
}

fn rank_in_sorted(value: u64, sorted: &[u64]) -> u32 {
    if sorted.is_empty() {
        return 0;
    }
    let index = sorted.partition_point(|v| *v < value);
    (index as f64 / sorted.len() as f64 * 100.0).round() as u32
}

/// Rank lookups memoized by value for the duration of one render.
pub struct RankCache {
    sorted: Vec<u64>,
    memo: HashMap<u64, u32>,
}

impl RankCache {
    pub fn new(values: &[u64]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_unstable();
        Self { sorted, memo: HashMap::new() }
    }

    pub fn rank(&mut self, value: u64) -> u32 {
        let sorted = &self.sorted;
        *self.memo.entry(value).or_insert_with(|| rank_in_sorted(value, sorted))
    }
}
