use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "daybook",
    version,
    about = "Log billable days against clients on a calendar and report monthly earnings"
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Config file (defaults to $DAYBOOK_CONFIG, then the user config dir).
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Data directory holding clients.data and entries.data.
    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show the month timeline (default).
    Calendar(CalendarArgs),
    /// Earnings per client for one month.
    Report(ReportArgs),
    /// List clients.
    Clients,
    /// Register a client.
    ClientAdd(ClientAddArgs),
    /// Log a full or half day for a client.
    Log(LogArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CalendarArgs {
    /// Initial month as YEAR-MONTH with a zero-based month (2024-2 is March 2024).
    #[arg(long)]
    pub month: Option<String>,

    /// Month blocks to print, starting at the focal month.
    #[arg(long, default_value_t = 3)]
    pub count: usize,

    #[arg(long)]
    pub width: Option<f32>,

    #[arg(long)]
    pub height: Option<f32>,

    /// Scroll this many pixels from the initial position before printing.
    #[arg(long, allow_hyphen_values = true)]
    pub scroll: Option<f32>,

    /// Tap this day of the focal month.
    #[arg(long)]
    pub tap: Option<u32>,
}

impl Default for CalendarArgs {
    fn default() -> Self {
        Self {
            month: None,
            count: 3,
            width: None,
            height: None,
            scroll: None,
            tap: None,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// YEAR-MONTH with a zero-based month; defaults to the current month.
    #[arg(long)]
    pub month: Option<String>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ClientAddArgs {
    #[arg(long)]
    pub name: String,

    /// Rate per full day.
    #[arg(long)]
    pub rate: f64,

    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct LogArgs {
    /// YYYY-MM-DD, `today` or `yesterday`.
    #[arg(long, default_value = "today")]
    pub date: String,

    #[arg(long)]
    pub client: String,

    #[arg(long)]
    pub half: bool,

    #[arg(long)]
    pub notes: Option<String>,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = match (quiet, verbose) {
        (q, _) if q >= 2 => "error",
        (1, _) => "warn",
        (_, v) if v >= 3 => "trace",
        (_, 2) => "debug",
        (_, 1) => "info",
        _ => "warn",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
