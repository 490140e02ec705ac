//! Line-oriented prompt over one analysis session.
//!
//! The session owns the accumulator. Switching repositories or changing the
//! ignore list builds a replacement first and only swaps it in on success.

use crate::accumulator::CommitStatAccumulator;
use crate::chart::exec::{painter, prepare};
use crate::chart::{aggregate, fetch_changes, render, write_chart, Painter};
use crate::cli::CommonArgs;
use crate::config::{Overrides, Settings};
use crate::error::{ChurnError, Result};
use crate::git::{CollectOptions, GitRepo};
use crate::model::{Percentile, Period};
use crate::util::normalize_extension;
use anyhow::Context;
use console::{style, Term};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, warn};

const HELP: &str = "\
Commands:
  day | month | year | commit   render churn for that period
  percentile <1-100>            change the outlier threshold
  width <n>                     change the bar width
  ignore [ext ...]              set ignored extensions (none to clear)
  repo <path>                   analyse another repository
  stats                         summary for the current period
  help                          this text
  quit | exit                   leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Show(Period),
    Percentile(String),
    Width(String),
    Ignore(Vec<String>),
    Repo(PathBuf),
    Stats,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Command::Empty;
    };
    let rest: Vec<&str> = words.collect();

    match head.to_lowercase().as_str() {
        "quit" | "exit" | "q" => Command::Quit,
        "help" | "?" => Command::Help,
        "stats" => Command::Stats,
        "percentile" | "p" => Command::Percentile(rest.join(" ")),
        "width" | "w" => Command::Width(rest.join(" ")),
        "ignore" => Command::Ignore(rest.iter().map(|s| s.to_string()).collect()),
        "repo" if !rest.is_empty() => Command::Repo(PathBuf::from(rest.join(" "))),
        other => match other.parse::<Period>() {
            Ok(period) if rest.is_empty() => Command::Show(period),
            _ => Command::Unknown(line.trim().to_string()),
        },
    }
}

/// Display settings that can change without touching history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct View {
    pub period: Period,
    pub percentile: Percentile,
    pub width: usize,
}

impl View {
    /// Invalid input leaves the view untouched.
    pub fn set_percentile(&mut self, raw: &str) -> Result<()> {
        self.percentile = raw.parse::<Percentile>()?;
        Ok(())
    }

    pub fn set_width(&mut self, raw: &str) -> Result<()> {
        let width: usize = raw
            .trim()
            .parse()
            .map_err(|_| ChurnError::Parse(format!("Not a width: '{raw}'")))?;
        if width == 0 {
            return Err(ChurnError::InvalidWidth(width));
        }
        self.width = width;
        Ok(())
    }
}

pub enum Flow {
    Continue,
    Quit,
}

pub struct Session {
    repo: GitRepo,
    since: Option<String>,
    until: Option<String>,
    collect: CollectOptions,
    acc: CommitStatAccumulator,
    view: View,
    painter: Painter,
}

impl Session {
    pub fn open(common: &CommonArgs, settings: Settings) -> anyhow::Result<Self> {
        let repo = GitRepo::open(common.repo.as_ref()).context("Failed to open git repository")?;
        let acc = load(&repo, common.since.as_deref(), common.until.as_deref(), &settings.collect)?;
        Ok(Self {
            repo,
            since: common.since.clone(),
            until: common.until.clone(),
            collect: settings.collect,
            acc,
            view: View {
                period: settings.period,
                percentile: settings.percentile,
                width: settings.width,
            },
            painter: painter(common),
        })
    }

    pub fn render<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let series = aggregate(&self.acc, self.view.period);
        let chart = render(&series, &self.acc.snapshot(), self.view.percentile, self.view.width);
        write_chart(out, &chart, self.painter)
    }

    fn render_stats<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let series = aggregate(&self.acc, self.view.period);
        let chart = render(&series, &self.acc.snapshot(), self.view.percentile, self.view.width);
        match chart.summary {
            Some(summary) => {
                writeln!(out, "commits: {}  periods: {}", self.acc.len(), series.len())?;
                writeln!(
                    out,
                    "cutoff {} ({}), {} outliers, lifespan {} days",
                    summary.percentile_value, self.view.percentile, summary.outliers, summary.lifespan_days
                )
            }
            None => writeln!(out, "No data to display"),
        }
    }

    pub fn handle<W: Write>(&mut self, command: Command, out: &mut W) -> anyhow::Result<Flow> {
        match command {
            Command::Quit => return Ok(Flow::Quit),
            Command::Empty => {}
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Show(period) => {
                self.view.period = period;
                self.render(out)?;
            }
            Command::Percentile(raw) => match self.view.set_percentile(&raw) {
                Ok(()) => self.render(out)?,
                Err(e) => report(out, &e)?,
            },
            Command::Width(raw) => match self.view.set_width(&raw) {
                Ok(()) => self.render(out)?,
                Err(e) => report(out, &e)?,
            },
            Command::Stats => self.render_stats(out)?,
            Command::Ignore(exts) => {
                let mut collect = self.collect.clone();
                collect.ignored_extensions = exts.iter().map(|e| normalize_extension(e)).filter(|e| !e.is_empty()).collect();
                match load(&self.repo, self.since.as_deref(), self.until.as_deref(), &collect) {
                    Ok(acc) => {
                        self.acc = acc;
                        self.collect = collect;
                        writeln!(out, "ignoring: {}", describe(&self.collect.ignored_extensions))?;
                        self.render(out)?;
                    }
                    Err(e) => report(out, &e)?,
                }
            }
            Command::Repo(path) => match GitRepo::open(Some(&path)).map_err(anyhow::Error::from).and_then(|repo| {
                let acc = load(&repo, self.since.as_deref(), self.until.as_deref(), &self.collect)?;
                Ok((repo, acc))
            }) {
                Ok((repo, acc)) => {
                    self.repo = repo;
                    self.acc = acc;
                    writeln!(out, "repository: {}", self.repo.path().display())?;
                    self.render(out)?;
                }
                Err(e) => report(out, &e)?,
            },
            Command::Unknown(input) => writeln!(out, "unknown command '{input}', try 'help'")?,
        }
        Ok(Flow::Continue)
    }
}

fn load(
    repo: &GitRepo,
    since: Option<&str>,
    until: Option<&str>,
    collect: &CollectOptions,
) -> anyhow::Result<CommitStatAccumulator> {
    let range = repo.resolve_range(since, until).context("Failed to resolve date range")?;
    fetch_changes(repo, &range, collect)
}

fn describe(exts: &[String]) -> String {
    if exts.is_empty() {
        "nothing".to_string()
    } else {
        exts.join(", ")
    }
}

fn report<W: Write>(out: &mut W, err: &dyn std::fmt::Display) -> io::Result<()> {
    warn!(error = %err, "command rejected");
    writeln!(out, "{} {err}", style("error:").red().bold())
}

pub fn run(common: &CommonArgs, overrides: Overrides) -> anyhow::Result<()> {
    let mut settings = prepare(common, &overrides)?;
    settings.collect.progress = true;
    let mut session = Session::open(common, settings)?;

    let term = Term::stdout();
    let mut out = io::stdout();
    session.render(&mut out)?;
    writeln!(out, "Type 'help' for commands.")?;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        if term.is_term() {
            term.write_str("churnbar> ")?;
            term.flush()?;
        }
        let Some(line) = lines.next() else {
            debug!("stdin closed");
            break;
        };
        if let Flow::Quit = session.handle(parse_command(&line?), &mut out)? {
            break;
        }
        out.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn view() -> View {
        View {
            period: Period::Day,
            percentile: Percentile::new(90).unwrap(),
            width: 50,
        }
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command("month"), Command::Show(Period::Month));
        assert_eq!(parse_command("  COMMIT "), Command::Show(Period::Commit));
        assert_eq!(parse_command("percentile 80"), Command::Percentile("80".into()));
        assert_eq!(parse_command("ignore lock .svg"), Command::Ignore(vec!["lock".into(), ".svg".into()]));
        assert_eq!(parse_command("ignore"), Command::Ignore(vec![]));
        assert_eq!(parse_command("repo ../other"), Command::Repo(PathBuf::from("../other")));
        assert_eq!(parse_command(""), Command::Empty);
        assert_eq!(parse_command("exit"), Command::Quit);
        assert_eq!(parse_command("repo"), Command::Unknown("repo".into()));
        assert_eq!(parse_command("month 3"), Command::Unknown("month 3".into()));
        assert_eq!(parse_command("fortnight"), Command::Unknown("fortnight".into()));
    }

    #[test]
    fn invalid_percentile_leaves_view_untouched() {
        let mut v = view();
        assert!(matches!(v.set_percentile("0"), Err(ChurnError::InvalidPercentile(0))));
        assert!(matches!(v.set_percentile("101"), Err(ChurnError::InvalidPercentile(101))));
        assert!(v.set_percentile("lots").is_err());
        assert_eq!(v, view());

        v.set_percentile("p75").unwrap();
        assert_eq!(v.percentile.get(), 75);
    }

    #[test]
    fn invalid_width_leaves_view_untouched() {
        let mut v = view();
        assert!(v.set_width("0").is_err());
        assert!(v.set_width("-3").is_err());
        assert_eq!(v, view());
        v.set_width("72").unwrap();
        assert_eq!(v.width, 72);
    }
}
