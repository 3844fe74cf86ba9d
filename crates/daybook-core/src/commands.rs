use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use crate::cli::{CalendarArgs, ClientAddArgs, Command, LogArgs, ReportArgs};
use crate::config::{DaybookConfig, resolve_data_dir};
use crate::datastore::DataStore;
use crate::datetime::parse_entry_date;
use crate::entries::{Client, EntryDuration, PRESET_COLORS, TimeEntry};
use crate::feedback::{CommandFeedback, Feedback, NoFeedback};
use crate::month::MonthId;
use crate::month_view::day_key;
use crate::render::Renderer;
use crate::report::MonthlySummary;
use crate::size::Viewport;
use crate::timeline::{TimelineController, VisibilityOutcome, initial_month};

/// Everything a command needs besides its own arguments.
#[derive(Debug, Clone)]
pub struct Session {
    pub config: DaybookConfig,
    pub today: NaiveDate,
    pub data_override: Option<PathBuf>,
}

impl Session {
    fn open_store(&self) -> anyhow::Result<DataStore> {
        let data_dir = resolve_data_dir(&self.config, self.data_override.as_deref())
            .context("failed to resolve data directory")?;
        DataStore::open(&data_dir)
            .with_context(|| format!("failed to open datastore at {}", data_dir.display()))
    }

    fn feedback(&self) -> Box<dyn Feedback> {
        let Some(command_line) = self.config.feedback.command.as_deref() else {
            return Box::new(NoFeedback);
        };
        match CommandFeedback::parse(command_line) {
            Ok(feedback) => Box::new(feedback),
            Err(err) => {
                warn!(error = %err, "ignoring feedback command");
                Box::new(NoFeedback)
            }
        }
    }
}

#[instrument(skip(session, renderer))]
pub fn dispatch<W: Write>(
    session: &Session,
    command: Option<Command>,
    renderer: &mut Renderer<W>,
) -> anyhow::Result<()> {
    let command = command.unwrap_or_else(|| Command::Calendar(CalendarArgs::default()));
    info!(command = command_name(&command), "dispatching command");

    match command {
        Command::Calendar(args) => cmd_calendar(session, args, renderer),
        Command::Report(args) => cmd_report(session, args, renderer),
        Command::Clients => cmd_clients(session, renderer),
        Command::ClientAdd(args) => cmd_client_add(session, args, renderer),
        Command::Log(args) => cmd_log(session, args, renderer),
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Calendar(_) => "calendar",
        Command::Report(_) => "report",
        Command::Clients => "clients",
        Command::ClientAdd(_) => "client-add",
        Command::Log(_) => "log",
    }
}

#[instrument(skip(session, renderer))]
fn cmd_calendar<W: Write>(
    session: &Session,
    args: CalendarArgs,
    renderer: &mut Renderer<W>,
) -> anyhow::Result<()> {
    let defaults = session.config.default_viewport();
    let viewport = Viewport::new(
        args.width.filter(|w| *w > 0.0).unwrap_or(defaults.width),
        args.height.filter(|h| *h > 0.0).unwrap_or(defaults.height),
    );
    let initial = initial_month(args.month.as_deref(), session.today);

    let mut timeline = TimelineController::new(
        initial,
        session.today,
        session.config.timeline_settings(),
        session.config.size_policy(),
        viewport,
        session.feedback(),
    )
    .with_month_changed(|month| info!(%month, "focal month changed"))
    .with_day_pressed(|date| info!(key = %day_key(date), "day pressed"));

    if let Some(delta) = args.scroll {
        let start = timeline
            .item_layout(timeline.initial_scroll_index())
            .map(|layout| layout.offset)
            .unwrap_or(0.0);
        let max_offset = (timeline.content_height() - viewport.height).max(0.0);
        let offset = (start + delta).clamp(0.0, max_offset);
        let report = timeline.visibility_at(offset, viewport.height);
        debug!(offset, entries = report.len(), "scrolled timeline");
        match timeline.handle_visibility_now(&report) {
            VisibilityOutcome::Changed(month) | VisibilityOutcome::Unchanged(month) => {
                debug!(%month, "focal month after scroll");
            }
            VisibilityOutcome::Empty | VisibilityOutcome::Debounced => {
                debug!("scroll left the focal month unchanged");
            }
        }
    }

    let focal = timeline.focal_month();
    renderer.print_focal_header(focal)?;
    renderer.print_weekday_header(&timeline.weekday_header())?;

    let first = timeline
        .index_of(focal)
        .ok_or_else(|| anyhow!("focal month {focal} is outside the timeline window"))?;
    for index in first..first.saturating_add(args.count.max(1)) {
        let Some(view) = timeline.month_view(index) else {
            break;
        };
        renderer.print_month(&view)?;
    }

    if let Some(day) = args.tap {
        let date = focal
            .date_of(day)
            .ok_or_else(|| anyhow!("{} has no day {day}", focal.label()))?;
        if let Some(date) = timeline.press_date(date) {
            renderer.line("")?;
            renderer.line(&format!(
                "Selected {}; log it with: daybook log --date {} --client NAME",
                day_key(date),
                date.format("%Y-%m-%d")
            ))?;
        }
    }

    Ok(())
}

#[instrument(skip(session, renderer))]
fn cmd_report<W: Write>(
    session: &Session,
    args: ReportArgs,
    renderer: &mut Renderer<W>,
) -> anyhow::Result<()> {
    let month = initial_month(args.month.as_deref(), session.today);
    let store = session.open_store()?;
    let summary = MonthlySummary::build(month, &store)
        .with_context(|| format!("failed to summarize {}", month.label()))?;

    if args.json {
        let json = serde_json::to_string_pretty(&summary)?;
        return renderer.line(&json);
    }
    renderer.print_summary(&summary)
}

#[instrument(skip(session, renderer))]
fn cmd_clients<W: Write>(session: &Session, renderer: &mut Renderer<W>) -> anyhow::Result<()> {
    let store = session.open_store()?;
    renderer.print_clients(&store.load_clients()?)
}

#[instrument(skip(session, renderer))]
fn cmd_client_add<W: Write>(
    session: &Session,
    args: ClientAddArgs,
    renderer: &mut Renderer<W>,
) -> anyhow::Result<()> {
    let name = args.name.trim();
    if name.is_empty() {
        return Err(anyhow!("client name cannot be empty"));
    }
    if !args.rate.is_finite() || args.rate <= 0.0 {
        return Err(anyhow!("daily rate must be a positive number"));
    }

    let store = session.open_store()?;
    let mut client = Client::new(name, args.rate);
    client.color = match args.color {
        Some(color) => normalize_color(&color)?,
        None => {
            let existing = store.load_clients()?.len();
            PRESET_COLORS[existing % PRESET_COLORS.len()].to_string()
        }
    };

    let line = format!("Added client {} at {}/day", client.name, client.daily_rate);
    store.add_client(client)?;
    renderer.line(&line)
}

#[instrument(skip(session, renderer))]
fn cmd_log<W: Write>(
    session: &Session,
    args: LogArgs,
    renderer: &mut Renderer<W>,
) -> anyhow::Result<()> {
    let date = parse_entry_date(&args.date, session.today)?;
    let store = session.open_store()?;
    let client = store
        .find_client(&args.client)?
        .ok_or_else(|| anyhow!("no client named {:?}", args.client))?;

    let duration = if args.half {
        EntryDuration::HalfDay
    } else {
        EntryDuration::FullDay
    };
    let mut entry = TimeEntry::new(client.id, date, duration);
    entry.notes = args.notes.unwrap_or_default();
    store.add_entry(entry)?;

    let what = match duration {
        EntryDuration::FullDay => "full day",
        EntryDuration::HalfDay => "half day",
    };
    renderer.line(&format!(
        "Logged a {what} for {} on {} ({})",
        client.name,
        date.format("%Y-%m-%d"),
        MonthId::from_date(date).label()
    ))
}

/// Accepts `#RRGGBB` in any case and stores it upper-cased.
fn normalize_color(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim();
    let hex = trimmed
        .strip_prefix('#')
        .filter(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .ok_or_else(|| anyhow!("invalid color {trimmed:?} (expected #RRGGBB)"))?;
    Ok(format!("#{}", hex.to_ascii_uppercase()))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use super::{Session, dispatch, normalize_color};
    use crate::cli::{CalendarArgs, ClientAddArgs, Command, LogArgs, ReportArgs};
    use crate::config::DaybookConfig;
    use crate::render::Renderer;

    fn session(data: &std::path::Path) -> Session {
        Session {
            config: DaybookConfig::default(),
            today: NaiveDate::from_ymd_opt(2024, 3, 15).expect("today"),
            data_override: Some(data.to_path_buf()),
        }
    }

    fn run(session: &Session, command: Command) -> String {
        let mut renderer = Renderer::new(Vec::new(), false);
        dispatch(session, Some(command), &mut renderer).expect("dispatch");
        String::from_utf8(renderer.into_inner()).expect("utf8")
    }

    #[test]
    fn calendar_defaults_to_the_current_month() {
        let temp = tempdir().expect("tempdir");
        let session = session(temp.path());
        let mut renderer = Renderer::new(Vec::new(), false);
        dispatch(&session, None, &mut renderer).expect("dispatch");
        let text = String::from_utf8(renderer.into_inner()).expect("utf8");

        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("March 2024"));
        assert!(text.contains("[15]"));
        assert!(text.contains("April 2024"));
        assert!(text.contains("May 2024"));
        assert!(!text.contains("June 2024"));
    }

    #[test]
    fn calendar_scroll_moves_the_focal_month() {
        let temp = tempdir().expect("tempdir");
        let session = session(temp.path());
        let text = run(
            &session,
            Command::Calendar(CalendarArgs {
                month: Some("2024-5".to_string()),
                count: 1,
                scroll: Some(-10_000.0),
                ..CalendarArgs::default()
            }),
        );
        assert_eq!(text.lines().next(), Some("December 2023"));
    }

    #[test]
    fn calendar_tap_prints_the_day_key() {
        let temp = tempdir().expect("tempdir");
        let session = session(temp.path());
        let text = run(
            &session,
            Command::Calendar(CalendarArgs {
                count: 1,
                tap: Some(9),
                ..CalendarArgs::default()
            }),
        );
        assert!(text.contains("Selected 2024-3-9"));
        assert!(text.contains("--date 2024-03-09"));
    }

    #[test]
    fn log_then_report() {
        let temp = tempdir().expect("tempdir");
        let session = session(temp.path());

        run(
            &session,
            Command::ClientAdd(ClientAddArgs {
                name: "Acme".to_string(),
                rate: 400.0,
                color: None,
            }),
        );
        run(
            &session,
            Command::Log(LogArgs {
                date: "today".to_string(),
                client: "acme".to_string(),
                half: true,
                notes: None,
            }),
        );

        let text = run(
            &session,
            Command::Report(ReportArgs {
                month: None,
                json: true,
            }),
        );
        let value: serde_json::Value = serde_json::from_str(&text).expect("json");
        assert_eq!(value["month"], "2024-2");
        assert_eq!(value["total_earnings"], 200.0);
        assert_eq!(value["clients"][0]["half_days"], 1);
    }

    #[test]
    fn log_rejects_unknown_client() {
        let temp = tempdir().expect("tempdir");
        let session = session(temp.path());
        let mut renderer = Renderer::new(Vec::new(), false);
        let err = dispatch(
            &session,
            Some(Command::Log(LogArgs {
                date: "2024-03-01".to_string(),
                client: "Nobody".to_string(),
                half: false,
                notes: None,
            })),
            &mut renderer,
        )
        .expect_err("unknown client");
        assert!(err.to_string().contains("Nobody"));
    }

    #[test]
    fn colors_are_validated() {
        assert_eq!(normalize_color("#ff6b6b").expect("valid"), "#FF6B6B");
        assert!(normalize_color("red").is_err());
        assert!(normalize_color("#12345").is_err());
    }
}
