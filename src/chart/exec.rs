use super::{aggregate, classify, fetch_changes, render, write_chart, write_json, write_ndjson, write_stats, Painter};
use crate::cli::CommonArgs;
use crate::config::{ChurnConfig, Overrides, Settings};
use crate::git::GitRepo;
use crate::accumulator::CommitStatAccumulator;
use crate::model::{ChartOutput, DailyTotal, Period, StatsOutput, SCHEMA_VERSION};
use anyhow::Context;
use chrono::Utc;
use std::io::{self, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Ndjson,
}

/// Loads config and validates every setting before the repository is touched.
pub fn prepare(common: &CommonArgs, overrides: &Overrides) -> anyhow::Result<Settings> {
    let start = match &common.repo {
        Some(path) => path.clone(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let config = ChurnConfig::resolve(common.config.as_deref(), &start).context("Failed to load configuration")?;
    let settings = Settings::resolve(&config, overrides)?;
    Ok(settings)
}

pub fn painter(common: &CommonArgs) -> Painter {
    Painter::new(!common.no_color && console::colors_enabled())
}

pub fn exec(common: &CommonArgs, overrides: Overrides, format: OutputFormat) -> anyhow::Result<()> {
    let mut settings = prepare(common, &overrides)?;
    settings.collect.progress = format == OutputFormat::Text && console::Term::stderr().is_term();

    let repo = GitRepo::open(common.repo.as_ref()).context("Failed to open git repository")?;
    let range = repo
        .resolve_range(common.since.as_deref(), common.until.as_deref())
        .context("Failed to resolve date range")?;

    let acc = fetch_changes(&repo, &range, &settings.collect)?;
    let series = aggregate(&acc, settings.period);
    let chart = render(&series, &acc.snapshot(), settings.percentile, settings.width);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Text => write_chart(&mut out, &chart, painter(common))?,
        OutputFormat::Json => {
            let output = ChartOutput {
                version: SCHEMA_VERSION,
                generated_at: Utc::now(),
                repository_path: repo.path().to_string_lossy().to_string(),
                since: common.since.clone(),
                until: common.until.clone(),
                ignored_extensions: settings.collect.ignored_extensions.clone(),
                chart,
            };
            write_json(&mut out, &output)?;
        }
        OutputFormat::Ndjson => write_ndjson(&mut out, &chart)?,
    }
    out.flush()?;
    Ok(())
}

pub fn exec_stats(common: &CommonArgs, overrides: Overrides, json: bool) -> anyhow::Result<()> {
    let mut settings = prepare(common, &overrides)?;
    settings.collect.progress = !json && console::Term::stderr().is_term();

    let repo = GitRepo::open(common.repo.as_ref()).context("Failed to open git repository")?;
    let range = repo
        .resolve_range(common.since.as_deref(), common.until.as_deref())
        .context("Failed to resolve date range")?;
    let acc = fetch_changes(&repo, &range, &settings.collect)?;

    let stats = daily_stats(&acc, repo.path(), &settings);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&stats)?)?;
    } else {
        write_stats(&mut out, &stats, painter(common))?;
    }
    out.flush()?;
    Ok(())
}

fn daily_stats(acc: &CommitStatAccumulator, repo_path: &Path, settings: &Settings) -> StatsOutput {
    let daily = acc.snapshot();
    // days whose commits only touched ignored or binary files are not active
    let active: Vec<DailyTotal> = daily.iter().filter(|d| !d.totals.is_zero()).copied().collect();
    let values: Vec<u64> = active.iter().map(|d| d.totals.total()).collect();
    let classification = classify(&values, settings.percentile);
    let outlier_days = active
        .iter()
        .filter(|d| d.totals.total() > classification.percentile_value)
        .copied()
        .collect();
    let summary = render(&aggregate(acc, Period::Day), &daily, settings.percentile, settings.width).summary;

    StatsOutput {
        version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        repository_path: repo_path.to_string_lossy().to_string(),
        percentile: settings.percentile,
        days: active.len(),
        classification,
        outlier_days,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulator::tests::change;
    use crate::config::{ChurnConfig, Overrides};
    use pretty_assertions::assert_eq;

    fn settings(percentile: u32) -> Settings {
        Settings::resolve(
            &ChurnConfig::default(),
            &Overrides {
                percentile: Some(percentile),
                ..Overrides::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn stats_skip_days_with_only_ignored_changes() {
        let acc: CommitStatAccumulator = vec![
            change("2024-01-01", 10, 0),
            change("2024-01-02", 0, 0),
            change("2024-01-03", 20, 0),
            change("2024-01-04", 0, 0),
            change("2024-01-05", 300, 0),
        ]
        .into_iter()
        .collect();

        let stats = daily_stats(&acc, Path::new("/repo"), &settings(50));
        assert_eq!(stats.days, 3);
        assert_eq!(stats.classification.percentile_value, 20);
        assert_eq!(stats.classification.filtered_values, vec![10, 20]);
        assert_eq!(stats.outlier_days.len(), 1);
        assert_eq!(stats.outlier_days[0].totals.total(), 300);

        let summary = stats.summary.unwrap();
        assert_eq!(summary.active_days, stats.days);
        assert_eq!(summary.avg_per_active_day, stats.classification.average_value);
    }
}
