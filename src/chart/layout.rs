use super::classify::{classify, RankCache};
use crate::model::{
    AggregatedSeries, BarCell, Chart, ChartRow, ChartSummary, ClassificationResult, DailyTotal, LineTotals, Percentile,
    Period, PeriodEntry, ScaleHeader,
};
use chrono::{Datelike, NaiveDate};
use tracing::debug;

pub const DEFAULT_SCALE_WIDTH: usize = 50;

/// Lays out one bar row per period, scaled against the largest total.
///
/// `daily` feeds the summary block only. A series whose largest total is 0
/// yields a chart with no rows and no summary.
pub fn render(series: &AggregatedSeries, daily: &[DailyTotal], percentile: Percentile, scale_width: usize) -> Chart {
    let totals = series.totals();
    let classification = classify(&totals, percentile);
    let max_value = totals.iter().copied().max().unwrap_or(0);

    let mut chart = Chart {
        period: series.period,
        percentile,
        scale_width,
        max_value,
        average_value: classification.average_value,
        marker: None,
        header: scale_header(max_value),
        rows: Vec::new(),
        summary: None,
    };

    if max_value == 0 || scale_width == 0 {
        debug!(periods = series.len(), "nothing to chart");
        return chart;
    }

    let grand_total: u64 = totals.iter().sum();
    let marker = scaled(classification.average_value, max_value, scale_width).min(scale_width - 1);
    let mut ranks = RankCache::new(&totals);

    chart.rows = series
        .entries
        .iter()
        .map(|entry| {
            let total = entry.totals.total();
            let outlier = total > classification.percentile_value;
            ChartRow {
                key: entry.key.clone(),
                cells: bar_cells(entry.totals, outlier, max_value, scale_width, marker),
                total,
                insertions: entry.totals.insertions,
                deletions: entry.totals.deletions,
                share: total as f64 / grand_total as f64 * 100.0,
                rank: ranks.rank(total),
                outlier,
            }
        })
        .collect();
    chart.marker = Some(marker);
    chart.summary = Some(summarize(series, daily, percentile, &classification));

    debug!(
        periods = chart.rows.len(),
        max_value,
        cutoff = classification.percentile_value,
        "chart laid out"
    );
    chart
}

fn scaled(value: f64, max_value: u64, width: usize) -> usize {
    (value / max_value as f64 * width as f64).round() as usize
}

fn bar_cells(totals: LineTotals, outlier: bool, max_value: u64, width: usize, marker: usize) -> Vec<BarCell> {
    let mut cells = vec![BarCell::Empty; width];

    if outlier {
        let len = scaled(totals.total() as f64, max_value, width).min(width);
        cells[..len].fill(BarCell::Outlier);
    } else {
        let deleted = scaled(totals.deletions as f64, max_value, width).min(width);
        let inserted = scaled(totals.insertions as f64, max_value, width).min(width - deleted);
        cells[..deleted].fill(BarCell::Deletion);
        cells[deleted..deleted + inserted].fill(BarCell::Insertion);
    }

    cells[marker] = BarCell::Marker;
    cells
}

fn scale_header(max_value: u64) -> ScaleHeader {
    let mut ticks = [0u64; 5];
    for (i, tick) in ticks.iter_mut().enumerate() {
        *tick = (max_value as f64 * i as f64 / 4.0).round() as u64;
    }
    ScaleHeader { ticks }
}

fn summarize(
    series: &AggregatedSeries,
    daily: &[DailyTotal],
    percentile: Percentile,
    classification: &ClassificationResult,
) -> ChartSummary {
    let day_values: Vec<u64> = daily
        .iter()
        .map(|d| d.totals.total())
        .filter(|t| *t > 0)
        .collect();
    let first = daily.iter().find(|d| !d.totals.is_zero()).map(|d| d.date);
    let last = daily.iter().rev().find(|d| !d.totals.is_zero()).map(|d| d.date);

    let lifespan_days = match (first, last) {
        (Some(f), Some(l)) => (l - f).num_days() + 1,
        _ => 0,
    };

    let period_values: Vec<u64> = series.totals().into_iter().filter(|t| *t > 0).collect();
    let active_ratio = match (first, last) {
        (Some(f), Some(l)) => possible_periods(series.period, f, l)
            .filter(|possible| *possible > 0)
            .map(|possible| period_values.len() as f64 / possible as f64),
        _ => None,
    };

    let (total_insertions, total_deletions) = series
        .entries
        .iter()
        .fold((0, 0), |(i, d), PeriodEntry { totals, .. }| (i + totals.insertions, d + totals.deletions));

    ChartSummary {
        lifespan_days,
        active_days: day_values.len(),
        avg_per_active_day: classify(&day_values, percentile).average_value,
        avg_per_active_period: classify(&period_values, percentile).average_value,
        active_ratio,
        percentile_value: classification.percentile_value,
        outliers: series
            .totals()
            .iter()
            .filter(|t| **t > classification.percentile_value)
            .count(),
        total_insertions,
        total_deletions,
    }
}

/// Number of calendar periods touched by the inclusive range `first..=last`.
fn possible_periods(period: Period, first: NaiveDate, last: NaiveDate) -> Option<i64> {
    match period {
        Period::Day => Some((last - first).num_days() + 1),
        Period::Month => {
            let months = |d: NaiveDate| d.year() as i64 * 12 + d.month0() as i64;
            Some(months(last) - months(first) + 1)
        }
        Period::Year => Some(last.year() as i64 - first.year() as i64 + 1),
        Period::Commit => None,
    }
}
