pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod datetime;
pub mod entries;
pub mod feedback;
pub mod month;
pub mod month_view;
pub mod render;
pub mod report;
pub mod size;
pub mod timeline;

use std::ffi::OsString;

use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run<I>(
  raw_args: I
) -> anyhow::Result<()>
where
  I: IntoIterator<Item = OsString>
{
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting daybook"
  );

  let cfg = config::DaybookConfig::load(
    cli.config.as_deref()
  )?;
  let tz =
    datetime::resolve_timezone(&cfg);
  let today = datetime::today_in(&tz);
  debug!(%tz, %today, "resolved today");

  let session = commands::Session {
    config: cfg,
    today,
    data_override: cli.data
  };

  let mut renderer =
    render::Renderer::stdout(
      !cli.no_color
    );

  commands::dispatch(
    &session,
    cli.command,
    &mut renderer
  )?;

  info!("done");
  Ok(())
}
