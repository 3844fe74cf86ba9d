use anyhow::anyhow;
use chrono::{
  DateTime,
  Duration,
  NaiveDate,
  Utc
};
use chrono_tz::Tz;

use crate::config::DaybookConfig;

const TIMEZONE_ENV_VAR: &str =
  "DAYBOOK_TIMEZONE";

/// `DAYBOOK_TIMEZONE`, then the
/// `[time] timezone` setting, then UTC.
pub fn resolve_timezone(
  config: &DaybookConfig
) -> Tz {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) =
      parse_timezone(&raw, TIMEZONE_ENV_VAR)
  {
    return tz;
  }

  if let Some(raw) =
    config.time.timezone.as_deref()
    && let Some(tz) =
      parse_timezone(raw, "daybook.toml")
  {
    return tz;
  }

  tracing::debug!(
    "no timezone configured; using UTC"
  );
  chrono_tz::UTC
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "resolved timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::warn!(
        source,
        timezone = %trimmed,
        error = %err,
        "invalid timezone"
      );
      None
    }
  }
}

#[must_use]
pub fn to_local_date(
  dt: DateTime<Utc>,
  tz: &Tz
) -> NaiveDate {
  dt.with_timezone(tz).date_naive()
}

#[must_use]
pub fn today_in(tz: &Tz) -> NaiveDate {
  to_local_date(Utc::now(), tz)
}

/// Accepts `YYYY-MM-DD`, the
/// `YYYY-M-D` day key, `today` and
/// `yesterday`.
pub fn parse_entry_date(
  raw: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = raw.trim();
  match token
    .to_ascii_lowercase()
    .as_str()
  {
    | "today" => return Ok(today),
    | "yesterday" => {
      return Ok(today - Duration::days(1));
    }
    | _ => {}
  }

  NaiveDate::parse_from_str(
    token, "%Y-%m-%d"
  )
  .map_err(|err| {
    anyhow!(
      "invalid date {token:?} (expected \
       YYYY-MM-DD): {err}"
    )
  })
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    TimeZone,
    Utc
  };

  use super::{
    parse_entry_date,
    to_local_date
  };

  #[test]
  fn local_date_follows_timezone() {
    let instant = Utc
      .with_ymd_and_hms(
        2024, 3, 15, 23, 30, 0
      )
      .single()
      .expect("valid instant");
    let tokyo: chrono_tz::Tz =
      "Asia/Tokyo"
        .parse()
        .expect("tz");
    assert_eq!(
      to_local_date(instant, &tokyo),
      NaiveDate::from_ymd_opt(2024, 3, 16)
        .expect("date")
    );
    assert_eq!(
      to_local_date(
        instant,
        &chrono_tz::UTC
      ),
      NaiveDate::from_ymd_opt(2024, 3, 15)
        .expect("date")
    );
  }

  #[test]
  fn parses_entry_dates() {
    let today =
      NaiveDate::from_ymd_opt(2024, 3, 1)
        .expect("today");
    assert_eq!(
      parse_entry_date("today", today)
        .expect("today"),
      today
    );
    assert_eq!(
      parse_entry_date(
        "Yesterday",
        today
      )
      .expect("yesterday"),
      NaiveDate::from_ymd_opt(
        2024, 2, 29
      )
      .expect("date")
    );
    assert_eq!(
      parse_entry_date(
        "2024-3-15",
        today
      )
      .expect("day key"),
      NaiveDate::from_ymd_opt(
        2024, 3, 15
      )
      .expect("date")
    );
    assert!(
      parse_entry_date(
        "2024-02-30",
        today
      )
      .is_err()
    );
  }
}
