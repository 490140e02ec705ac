use crate::chart::OutputFormat;
use crate::config::Overrides;
use crate::model::Period;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "churnbar")]
#[command(about = "Git churn over time as a terminal bar chart with percentile outlier detection")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone, Default)]
pub struct CommonArgs {
    #[arg(long, help = "Path to git repository")]
    pub repo: Option<PathBuf>,

    #[arg(long, help = "Path to a churnbar.toml config file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Include merge commits (diffed against their first parent)")]
    pub include_merges: bool,

    #[arg(long, help = "Include binary files", default_value_t = false)]
    pub binary: bool,

    #[arg(long, help = "Start from this commit or date (RFC3339, YYYY-MM-DD, or natural language)")]
    pub since: Option<String>,

    #[arg(long, help = "End at this commit or date (RFC3339, YYYY-MM-DD, or natural language)")]
    pub until: Option<String>,

    #[arg(
        long = "ignore",
        value_name = "EXT",
        value_delimiter = ',',
        help = "Skip files with this extension (repeatable or comma-separated)"
    )]
    pub ignore: Vec<String>,

    #[arg(short, long, help = "Verbose logging on stderr")]
    pub verbose: bool,

    #[arg(long, help = "Disable colored output")]
    pub no_color: bool,
}

#[derive(Args, Clone, Default)]
pub struct ChartArgs {
    #[arg(long, value_enum, help = "Grouping period [default: day]")]
    pub period: Option<Period>,

    #[arg(long, help = "Outlier threshold percentile, 1-100 [default: 95]")]
    pub percentile: Option<u32>,

    #[arg(long, help = "Bar width in characters [default: 50]")]
    pub width: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render churn per period as a bar chart
    Chart {
        #[command(flatten)]
        chart: ChartArgs,

        #[arg(long, help = "Output as JSON", conflicts_with = "ndjson")]
        json: bool,

        #[arg(long, help = "Output as NDJSON")]
        ndjson: bool,
    },
    /// Classify daily churn into typical days and outliers
    Stats {
        #[arg(long, help = "Outlier threshold percentile, 1-100 [default: 95]")]
        percentile: Option<u32>,

        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    /// Interactive prompt for switching periods, percentiles and repositories
    Shell {
        #[command(flatten)]
        chart: ChartArgs,
    },
}

impl CommonArgs {
    pub fn overrides(&self, chart: &ChartArgs) -> Overrides {
        Overrides {
            period: chart.period,
            percentile: chart.percentile,
            width: chart.width,
            ignore: self.ignore.clone(),
            include_merges: self.include_merges,
            binary: self.binary,
        }
    }
}

impl Cli {
    pub fn execute(self) -> Result<()> {
        crate::logging::init(self.common.verbose);

        match self.command {
            Commands::Chart { chart, json, ndjson } => {
                let format = if json {
                    OutputFormat::Json
                } else if ndjson {
                    OutputFormat::Ndjson
                } else {
                    OutputFormat::Text
                };
                crate::chart::exec(&self.common, self.common.overrides(&chart), format)
            }
            Commands::Stats { percentile, json } => {
                let chart = ChartArgs {
                    percentile,
                    ..ChartArgs::default()
                };
                crate::chart::exec_stats(&self.common, self.common.overrides(&chart), json)
            }
            Commands::Shell { chart } => crate::shell::run(&self.common, self.common.overrides(&chart)),
        }
    }
}
