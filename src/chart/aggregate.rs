use crate::accumulator::CommitStatAccumulator;
use crate::model::{AggregatedSeries, LineTotals, Period, PeriodEntry};
use crate::util::{commit_key, period_key};
use std::collections::BTreeMap;

/// Regroups the accumulator's day buckets by `period`.
///
/// Calendar periods come back sorted by key; commit mode keeps one entry per
/// record in ingestion order with no merging.
pub fn aggregate(acc: &CommitStatAccumulator, period: Period) -> AggregatedSeries {
    let entries = match period {
        Period::Commit => acc
            .commits()
            .iter()
            .map(|c| PeriodEntry {
                key: commit_key(c),
                totals: LineTotals::new(c.insertions, c.deletions),
            })
            .collect(),
        _ => {
            let mut buckets: BTreeMap<String, LineTotals> = BTreeMap::new();
            for day in acc.snapshot() {
                buckets
                    .entry(period_key(&day.date, period))
                    .or_default()
                    .add(day.totals.insertions, day.totals.deletions);
            }
            buckets
                .into_iter()
                .map(|(key, totals)| PeriodEntry { key, totals })
                .collect()
        }
    };

    AggregatedSeries { period, entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulator::tests::change;
    use pretty_assertions::assert_eq;

    fn sample() -> CommitStatAccumulator {
        vec![
            change("2023-12-31", 7, 1),
            change("2024-01-05", 10, 2),
            change("2024-01-05", 3, 3),
            change("2024-01-20", 1, 0),
            change("2024-02-01", 0, 9),
        ]
        .into_iter()
        .collect()
    }

    fn sums(series: &AggregatedSeries) -> (u64, u64) {
        series.entries.iter().fold((0, 0), |(i, d), e| {
            (i + e.totals.insertions, d + e.totals.deletions)
        })
    }

    #[test]
    fn day_month_year_keys_and_order() {
        let acc = sample();
        let days: Vec<_> = aggregate(&acc, Period::Day).entries.into_iter().map(|e| e.key).collect();
        assert_eq!(days, vec!["2023-12-31", "2024-01-05", "2024-01-20", "2024-02-01"]);

        let months = aggregate(&acc, Period::Month);
        assert_eq!(
            months.entries,
            vec![
                PeriodEntry { key: "2023-12".into(), totals: LineTotals::new(7, 1) },
                PeriodEntry { key: "2024-01".into(), totals: LineTotals::new(14, 5) },
                PeriodEntry { key: "2024-02".into(), totals: LineTotals::new(0, 9) },
            ]
        );

        let years: Vec<_> = aggregate(&acc, Period::Year).entries.into_iter().map(|e| e.key).collect();
        assert_eq!(years, vec!["2023", "2024"]);
    }

    #[test]
    fn sums_are_preserved_across_periods() {
        let acc = sample();
        let day = sums(&aggregate(&acc, Period::Day));
        assert_eq!(day, (21, 15));
        assert_eq!(sums(&aggregate(&acc, Period::Month)), day);
        assert_eq!(sums(&aggregate(&acc, Period::Year)), day);
        assert_eq!(sums(&aggregate(&acc, Period::Commit)), day);
    }

    #[test]
    fn commit_mode_keeps_every_record_in_order() {
        let mut acc = CommitStatAccumulator::new();
        let mut first = change("2024-01-05", 1, 0);
        first.id = Some("aaaaaaaaaaaa".into());
        first.summary = Some("first".into());
        let mut second = change("2024-01-05", 2, 0);
        second.id = Some("bbbbbbbbbbbb".into());
        second.summary = Some("second".into());
        acc.record(first);
        acc.record(second);

        let series = aggregate(&acc, Period::Commit);
        assert_eq!(series.len(), 2);
        assert_eq!(series.entries[0].key, "2024-01-05 aaaaaaaa first");
        assert_eq!(series.entries[1].key, "2024-01-05 bbbbbbbb second");
        assert_eq!(series.totals(), vec![1, 2]);
    }

    #[test]
    fn empty_accumulator_gives_empty_series() {
        let acc = CommitStatAccumulator::new();
        for period in [Period::Day, Period::Month, Period::Year, Period::Commit] {
            assert!(aggregate(&acc, period).is_empty());
        }
    }
}
