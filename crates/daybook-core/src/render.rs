use std::io::{self, IsTerminal, Write};
use std::sync::OnceLock;

use regex::Regex;
use unicode_width::UnicodeWidthStr;

use crate::entries::Client;
use crate::month::MonthId;
use crate::month_view::{DayCell, MonthView, WeekdayHeader};
use crate::report::MonthlySummary;

const COLUMN_WIDTH: usize = 5;

/// Text output for the terminal host. ANSI colour only on a terminal.
#[derive(Debug, Clone)]
pub struct Renderer<W: Write> {
    out: W,
    color: bool,
}

impl Renderer<io::Stdout> {
    pub fn stdout(color: bool) -> Self {
        let color = color && io::stdout().is_terminal();
        Self {
            out: io::stdout(),
            color,
        }
    }
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn print_focal_header(&mut self, month: MonthId) -> anyhow::Result<()> {
        let label = self.paint(&month.label(), "1");
        writeln!(self.out, "{label}")?;
        Ok(())
    }

    pub fn print_weekday_header(&mut self, header: &WeekdayHeader) -> anyhow::Result<()> {
        let line: String = header
            .labels
            .iter()
            .map(|label| format!("{label:>COLUMN_WIDTH$}"))
            .collect();
        let line = self.paint(&line, "2");
        writeln!(self.out, "{line}")?;
        Ok(())
    }

    #[tracing::instrument(skip(self, view), fields(month = %view.month))]
    pub fn print_month(&mut self, view: &MonthView) -> anyhow::Result<()> {
        let width = COLUMN_WIDTH * view.rows.first().map(|row| row.len()).unwrap_or(7);
        writeln!(self.out)?;
        writeln!(self.out, "{:>width$}", view.label)?;
        for row in &view.rows {
            let line: String = row.iter().map(|cell| self.format_cell(cell)).collect();
            writeln!(self.out, "{}", line.trim_end())?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, summary), fields(month = %summary.month))]
    pub fn print_summary(&mut self, summary: &MonthlySummary) -> anyhow::Result<()> {
        let title = self.paint(&summary.month.label(), "1");
        writeln!(self.out, "{title}")?;
        writeln!(
            self.out,
            "{} days  {}",
            format_days(summary.total_days),
            format_money(summary.total_earnings)
        )?;
        writeln!(self.out)?;

        if summary.clients.is_empty() {
            writeln!(self.out, "No days logged.")?;
            return Ok(());
        }

        let headers = ["Client", "Days", "Full", "Half", "Rate", "Earned"]
            .map(str::to_string)
            .to_vec();
        let rows = summary
            .clients
            .iter()
            .map(|client| {
                vec![
                    client.client_name.clone(),
                    format_days(client.total_days),
                    client.full_days.to_string(),
                    client.half_days.to_string(),
                    format!("{}/day", format_money(client.daily_rate)),
                    self.paint(&format_money(client.total_earnings), "32"),
                ]
            })
            .collect();

        write_table(&mut self.out, headers, rows)
    }

    pub fn print_clients(&mut self, clients: &[Client]) -> anyhow::Result<()> {
        if clients.is_empty() {
            writeln!(self.out, "No clients yet.")?;
            return Ok(());
        }
        let headers = ["Name", "Rate", "Color"].map(str::to_string).to_vec();
        let rows = clients
            .iter()
            .map(|client| {
                vec![
                    client.name.clone(),
                    format!("{}/day", format_money(client.daily_rate)),
                    client.color.clone(),
                ]
            })
            .collect();
        write_table(&mut self.out, headers, rows)
    }

    pub fn line(&mut self, text: &str) -> anyhow::Result<()> {
        writeln!(self.out, "{text}")?;
        Ok(())
    }

    fn format_cell(&self, cell: &DayCell) -> String {
        let Some(day) = cell.day else {
            return " ".repeat(COLUMN_WIDTH);
        };
        if !cell.is_today {
            return format!("{day:>COLUMN_WIDTH$}");
        }
        if self.color {
            let padding = " ".repeat(COLUMN_WIDTH.saturating_sub(day.to_string().len()));
            format!("{padding}{}", self.paint(&day.to_string(), "1;34;7"))
        } else {
            let marked = format!("[{day}]");
            format!("{marked:>COLUMN_WIDTH$}")
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn format_days(days: f64) -> String {
    if days.fract() == 0.0 {
        format!("{days:.0}")
    } else {
        format!("{days:.1}")
    }
}

fn format_money(amount: f64) -> String {
    format!("{amount:.0}€")
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths: Vec<usize> = headers
        .iter()
        .map(|header| UnicodeWidthStr::width(header.as_str()))
        .collect();

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (header, &width) in headers.iter().zip(&widths) {
        write!(writer, "{header:width$} ")?;
    }
    writeln!(writer)?;

    for &width in &widths {
        write!(writer, "{:-<width$} ", "")?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, &width) in row.iter().zip(&widths) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    static SGR: OnceLock<Option<Regex>> = OnceLock::new();
    match SGR.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").ok()) {
        Some(re) => re.replace_all(s, "").into_owned(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{Renderer, strip_ansi};
    use crate::entries::{Client, EntryDuration, TimeEntry};
    use crate::month::MonthId;
    use crate::month_view::MonthView;
    use crate::report::MonthlySummary;
    use crate::size::{SizePolicy, Viewport};

    #[test]
    fn month_block_marks_today_without_color() {
        let month = MonthId::normalize(2024, 2);
        let size = SizePolicy::default().compute(month, Viewport::new(390.0, 844.0));
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).expect("today");
        let view = MonthView::render(month, today, size);

        let mut renderer = Renderer::new(Vec::new(), false);
        renderer.print_month(&view).expect("print");
        let text = String::from_utf8(renderer.into_inner()).expect("utf8");

        assert!(text.contains("March 2024"));
        assert!(text.contains("[15]"));
        assert_eq!(text.matches('[').count(), 1);
        // Header line, label line, then one line per week.
        assert_eq!(text.lines().count(), 2 + view.rows.len());
    }

    #[test]
    fn summary_table_aligns_columns() {
        let client = Client::new("Zoë Café", 450.0);
        let entries = vec![
            TimeEntry::new(
                client.id,
                NaiveDate::from_ymd_opt(2024, 3, 4).expect("date"),
                EntryDuration::HalfDay,
            ),
        ];
        let summary =
            MonthlySummary::summarize(MonthId::normalize(2024, 2), &[client], &entries);

        let mut renderer = Renderer::new(Vec::new(), true);
        renderer.print_summary(&summary).expect("print");
        let text = strip_ansi(&String::from_utf8(renderer.into_inner()).expect("utf8"));

        assert!(text.contains("0.5 days  225€"));
        assert!(text.contains("Zoë Café"));
        assert!(text.contains("450€/day"));
    }
}
