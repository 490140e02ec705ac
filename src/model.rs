use crate::error::{ChurnError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const SCHEMA_VERSION: u32 = 1;

/// Line churn of one processed commit, already filtered by the ignore list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub date: NaiveDate,
    pub timestamp: DateTime<Utc>,
    pub insertions: u64,
    pub deletions: u64,
    pub id: Option<String>,
    pub summary: Option<String>,
}

impl ChangeRecord {
    pub fn total(&self) -> u64 {
        self.insertions + self.deletions
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTotals {
    pub insertions: u64,
    pub deletions: u64,
}

impl LineTotals {
    pub fn new(insertions: u64, deletions: u64) -> Self {
        Self { insertions, deletions }
    }

    pub fn add(&mut self, insertions: u64, deletions: u64) {
        self.insertions += insertions;
        self.deletions += deletions;
    }

    pub fn total(&self) -> u64 {
        self.insertions + self.deletions
    }

    pub fn is_zero(&self) -> bool {
        self.total() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub totals: LineTotals,
}

/// Grouping granularity of a chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Day,
    Month,
    Year,
    Commit,
}

impl Period {
    pub fn as_str(self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Month => "month",
            Period::Year => "year",
            Period::Commit => "commit",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = ChurnError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "day" | "daily" => Ok(Period::Day),
            "month" | "monthly" => Ok(Period::Month),
            "year" | "yearly" => Ok(Period::Year),
            "commit" | "commits" => Ok(Period::Commit),
            other => Err(ChurnError::InvalidPeriod(other.to_string())),
        }
    }
}

/// Outlier threshold, always within 1..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Percentile(u8);

impl Percentile {
    pub const DEFAULT: Percentile = Percentile(95);

    pub fn new(value: u32) -> Result<Self> {
        if (1..=100).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ChurnError::InvalidPercentile(value))
        }
    }

    pub fn get(self) -> u32 {
        self.0 as u32
    }
}

impl Default for Percentile {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Percentile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

impl FromStr for Percentile {
    type Err = ChurnError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_start_matches(['p', 'P']);
        let value: u32 = trimmed
            .parse()
            .map_err(|_| ChurnError::Parse(format!("Not a percentile: '{s}'")))?;
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodEntry {
    pub key: String,
    #[serde(flatten)]
    pub totals: LineTotals,
}

/// Period totals ordered by key (chronological), or by ingestion for commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedSeries {
    pub period: Period,
    pub entries: Vec<PeriodEntry>,
}

impl AggregatedSeries {
    pub fn totals(&self) -> Vec<u64> {
        self.entries.iter().map(|e| e.totals.total()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub percentile_value: u64,
    pub filtered_values: Vec<u64>,
    pub average_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarCell {
    Empty,
    Deletion,
    Insertion,
    Outlier,
    Marker,
}

impl BarCell {
    pub fn glyph(self) -> char {
        match self {
            BarCell::Empty => ' ',
            BarCell::Deletion => '-',
            BarCell::Insertion => '+',
            BarCell::Outlier => '#',
            BarCell::Marker => '|',
        }
    }
}

fn serialize_cells<S: Serializer>(cells: &[BarCell], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    let bar: String = cells.iter().map(|c| c.glyph()).collect();
    serializer.serialize_str(&bar)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartRow {
    pub key: String,
    #[serde(rename = "bar", serialize_with = "serialize_cells")]
    pub cells: Vec<BarCell>,
    pub total: u64,
    pub insertions: u64,
    pub deletions: u64,
    pub share: f64,
    pub rank: u32,
    pub outlier: bool,
}

/// Reference values printed above the bars at 0, 25, 50, 75 and 100 percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScaleHeader {
    pub ticks: [u64; 5],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSummary {
    pub lifespan_days: i64,
    pub active_days: usize,
    pub avg_per_active_day: f64,
    pub avg_per_active_period: f64,
    pub active_ratio: Option<f64>,
    pub percentile_value: u64,
    pub outliers: usize,
    pub total_insertions: u64,
    pub total_deletions: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub period: Period,
    pub percentile: Percentile,
    pub scale_width: usize,
    pub max_value: u64,
    pub average_value: f64,
    pub marker: Option<usize>,
    pub header: ScaleHeader,
    pub rows: Vec<ChartRow>,
    pub summary: Option<ChartSummary>,
}

impl Chart {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartOutput {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub repository_path: String,
    pub since: Option<String>,
    pub until: Option<String>,
    pub ignored_extensions: Vec<String>,
    pub chart: Chart,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsOutput {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub repository_path: String,
    pub percentile: Percentile,
    pub days: usize,
    pub classification: ClassificationResult,
    pub outlier_days: Vec<DailyTotal>,
    pub summary: Option<ChartSummary>,
}

#[derive(Debug, Clone)]
pub struct DateRange {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new() -> Self {
        Self { since: None, until: None }
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        if let Some(since) = self.since {
            if timestamp < &since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if timestamp > &until {
                return false;
            }
        }
        true
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::new()
    }
}
