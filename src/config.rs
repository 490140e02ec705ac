//! Configuration loading from churnbar.toml
//!
//! Settings can live in a `churnbar.toml` file at the repository root (or any
//! parent directory). Command-line flags override the file, and the file
//! overrides the built-in defaults.

use crate::chart::DEFAULT_SCALE_WIDTH;
use crate::error::{ChurnError, Result};
use crate::git::CollectOptions;
use crate::model::{Percentile, Period};
use crate::util::normalize_extension;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const CONFIG_FILE: &str = "churnbar.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ChurnConfig {
    /// Chart defaults
    #[serde(default)]
    pub chart: ChartConfig,
    /// History filters
    #[serde(default)]
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartConfig {
    /// Grouping period: "day", "month", "year" or "commit"
    #[serde(default)]
    pub period: Period,
    /// Outlier threshold percentile (1-100)
    #[serde(default = "default_percentile")]
    pub percentile: u32,
    /// Bar width in character cells
    #[serde(default = "default_width")]
    pub width: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            period: Period::default(),
            percentile: default_percentile(),
            width: default_width(),
        }
    }
}

fn default_percentile() -> u32 {
    Percentile::DEFAULT.get()
}
fn default_width() -> usize {
    DEFAULT_SCALE_WIDTH
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FilterConfig {
    /// File extensions whose changes are not counted, e.g. ["lock", "svg"]
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Count merge commits against their first parent
    #[serde(default)]
    pub include_merges: bool,
    /// Keep binary files (they contribute zero lines)
    #[serde(default)]
    pub binary: bool,
}

impl ChurnConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Walk up from `start` looking for churnbar.toml
    pub fn discover(start: &Path) -> Result<Option<(PathBuf, Self)>> {
        let mut dir = start.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                let config = Self::load(&candidate)?;
                return Ok(Some((candidate, config)));
            }
            if !dir.pop() {
                return Ok(None);
            }
        }
    }

    /// Explicit path wins; otherwise discover from `start`; otherwise defaults.
    pub fn resolve(explicit: Option<&Path>, start: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            info!(path = %path.display(), "loading config");
            return Self::load(path);
        }
        match Self::discover(start)? {
            Some((path, config)) => {
                info!(path = %path.display(), "discovered config");
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }
}

/// Fully validated settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub period: Period,
    pub percentile: Percentile,
    pub width: usize,
    pub collect: CollectOptions,
}

/// Flag values that may override the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub period: Option<Period>,
    pub percentile: Option<u32>,
    pub width: Option<usize>,
    pub ignore: Vec<String>,
    pub include_merges: bool,
    pub binary: bool,
}

impl Settings {
    pub fn resolve(config: &ChurnConfig, overrides: &Overrides) -> Result<Self> {
        let percentile = Percentile::new(overrides.percentile.unwrap_or(config.chart.percentile))?;
        let width = overrides.width.unwrap_or(config.chart.width);
        if width == 0 {
            return Err(ChurnError::InvalidWidth(width));
        }

        let source = if overrides.ignore.is_empty() {
            &config.filter.ignore
        } else {
            &overrides.ignore
        };
        let mut ignored_extensions: Vec<String> = source
            .iter()
            .map(|e| normalize_extension(e))
            .filter(|e| !e.is_empty())
            .collect();
        ignored_extensions.sort();
        ignored_extensions.dedup();

        Ok(Self {
            period: overrides.period.unwrap_or(config.chart.period),
            percentile,
            width,
            collect: CollectOptions {
                include_merges: overrides.include_merges || config.filter.include_merges,
                binary: overrides.binary || config.filter.binary,
                ignored_extensions,
                progress: false,
            },
        })
    }
}
