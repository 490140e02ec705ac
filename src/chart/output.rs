use crate::model::{BarCell, Chart, ChartOutput, ChartSummary, StatsOutput};
use console::style;
use std::io::{self, Write};

const MIN_LABEL_WIDTH: usize = 4;

/// Terminal styling switch. Glyphs are identical either way.
#[derive(Debug, Clone, Copy)]
pub struct Painter {
    pub color: bool,
}

impl Painter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn cell(&self, cell: BarCell) -> String {
        let glyph = cell.glyph().to_string();
        let styled = style(glyph).force_styling(self.color);
        match cell {
            BarCell::Empty => styled.to_string(),
            BarCell::Deletion => styled.red().to_string(),
            BarCell::Insertion => styled.green().to_string(),
            BarCell::Outlier => styled.yellow().bold().to_string(),
            BarCell::Marker => styled.cyan().to_string(),
        }
    }

    fn bold(&self, text: &str) -> String {
        style(text).force_styling(self.color).bold().to_string()
    }

    fn dim(&self, text: &str) -> String {
        style(text).force_styling(self.color).dim().to_string()
    }

    fn cyan(&self, text: &str) -> String {
        style(text).force_styling(self.color).cyan().to_string()
    }

    fn yellow(&self, text: &str) -> String {
        style(text).force_styling(self.color).yellow().to_string()
    }
}

pub fn write_chart<W: Write>(out: &mut W, chart: &Chart, painter: Painter) -> io::Result<()> {
    writeln!(
        out,
        "{}",
        painter.bold(&format!(
            "Churn per {} (outliers above {})",
            chart.period.as_str(),
            chart.percentile
        ))
    )?;

    let Some(marker) = chart.marker.filter(|_| !chart.rows.is_empty()) else {
        writeln!(out, "No data to display")?;
        return Ok(());
    };

    let width = chart.scale_width;
    let label_width = chart
        .rows
        .iter()
        .map(|r| r.key.chars().count())
        .max()
        .unwrap_or(0)
        .max(MIN_LABEL_WIDTH);
    let pad = " ".repeat(label_width);

    writeln!(out, "{pad} {}", painter.dim(&tick_line(&chart.header.ticks, width)))?;
    writeln!(out, "{pad} {}", painter.dim(&format!("+{}+", "-".repeat(width))))?;
    writeln!(
        out,
        "{pad}  {}{}",
        " ".repeat(marker),
        painter.cyan(&format!("v avg {:.1}", chart.average_value))
    )?;

    for row in &chart.rows {
        let bar: String = row.cells.iter().map(|c| painter.cell(*c)).collect();
        let tag = if row.outlier {
            format!(" {}", painter.yellow("outlier"))
        } else {
            String::new()
        };
        writeln!(
            out,
            "{:<label_width$} |{}| {:>9} {:>6.1}% p{:<3}{}",
            row.key, bar, row.total, row.share, row.rank, tag
        )?;
    }

    if let Some(summary) = &chart.summary {
        writeln!(out)?;
        write_summary(out, summary, chart, painter)?;
    }
    Ok(())
}

/// Five reference values spread over `width` columns, aligned to the bar area.
fn tick_line(ticks: &[u64; 5], width: usize) -> String {
    let mut buf: Vec<char> = vec![' '; width + 2];
    let last = ticks.len() - 1;
    for (i, tick) in ticks.iter().enumerate() {
        let label: Vec<char> = tick.to_string().chars().collect();
        let pos = 1 + i * width / last;
        let start = match i {
            0 => pos,
            i if i == last => (pos + 1).saturating_sub(label.len()),
            _ => pos.saturating_sub(label.len() / 2),
        };
        let start = start.min(buf.len().saturating_sub(label.len()));
        for (offset, ch) in label.iter().enumerate() {
            if let Some(slot) = buf.get_mut(start + offset) {
                *slot = *ch;
            }
        }
    }
    buf.into_iter().collect::<String>().trim_end().to_string()
}

fn write_summary<W: Write>(out: &mut W, summary: &ChartSummary, chart: &Chart, painter: Painter) -> io::Result<()> {
    let noun = chart.period.as_str();
    writeln!(out, "{}", painter.bold("Statistics"))?;
    writeln!(
        out,
        "  Lifespan:                  {} days ({} active)",
        summary.lifespan_days, summary.active_days
    )?;
    writeln!(
        out,
        "  Avg per active day ({}):  {:.1}",
        chart.percentile, summary.avg_per_active_day
    )?;
    writeln!(
        out,
        "  Avg per active {} ({}): {:.1}",
        noun, chart.percentile, summary.avg_per_active_period
    )?;
    if let Some(ratio) = summary.active_ratio {
        writeln!(out, "  Active {noun}s:               {:.1}%", ratio * 100.0)?;
    }
    writeln!(
        out,
        "  Outliers:                  {} above {}",
        summary.outliers, summary.percentile_value
    )?;
    writeln!(
        out,
        "  Lines:                     +{} / -{}",
        summary.total_insertions, summary.total_deletions
    )?;
    Ok(())
}

pub fn write_json<W: Write>(out: &mut W, output: &ChartOutput) -> anyhow::Result<()> {
    writeln!(out, "{}", serde_json::to_string_pretty(output)?)?;
    Ok(())
}

pub fn write_ndjson<W: Write>(out: &mut W, chart: &Chart) -> anyhow::Result<()> {
    for row in &chart.rows {
        writeln!(out, "{}", serde_json::to_string(row)?)?;
    }
    Ok(())
}

pub fn write_stats<W: Write>(out: &mut W, stats: &StatsOutput, painter: Painter) -> io::Result<()> {
    writeln!(
        out,
        "{}",
        painter.bold(&format!("Daily churn classification ({})", stats.percentile))
    )?;
    if stats.days == 0 {
        writeln!(out, "No data to display")?;
        return Ok(());
    }

    let c = &stats.classification;
    writeln!(out, "  Days:                      {}", stats.days)?;
    writeln!(out, "  Cutoff:                    {}", c.percentile_value)?;
    writeln!(
        out,
        "  Typical days:              {} (avg {:.1})",
        c.filtered_values.len(),
        c.average_value
    )?;
    writeln!(out, "  Outlier days:              {}", stats.outlier_days.len())?;
    for day in &stats.outlier_days {
        writeln!(
            out,
            "    {} {:>9}  +{} / -{}",
            day.date,
            day.totals.total(),
            day.totals.insertions,
            day.totals.deletions
        )?;
    }
    if let Some(summary) = &stats.summary {
        writeln!(out, "  Lifespan:                  {} days", summary.lifespan_days)?;
        if let Some(ratio) = summary.active_ratio {
            writeln!(out, "  Active days:               {:.1}%", ratio * 100.0)?;
        }
    }
    Ok(())
}
