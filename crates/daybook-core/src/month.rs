use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::calendar::{self, CalendarGrid};

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// A calendar month. `month` is zero-based and always in `0..=11`.
///
/// The string form is `"{year}-{month}"` (so March 2024 is `"2024-2"`), which
/// doubles as the list key of a timeline entry and as the `--month` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthId {
    year: i32,
    month: u32,
}

impl MonthId {
    /// Folds any month offset into `0..=11`, carrying into the year.
    ///
    /// Years outside `i32` saturate at the representable extremes.
    pub fn normalize(year: i32, month: i64) -> Self {
        let total = (i64::from(year) * 12).saturating_add(month);
        let year = total.div_euclid(12);
        let month = total.rem_euclid(12) as u32;

        match i32::try_from(year) {
            Ok(year) => Self { year, month },
            Err(_) if year > 0 => Self {
                year: i32::MAX,
                month: 11,
            },
            Err(_) => Self {
                year: i32::MIN,
                month: 0,
            },
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month0(),
        }
    }

    /// Parses `raw`, falling back to `fallback` when it is malformed.
    pub fn parse_or(raw: &str, fallback: MonthId) -> Self {
        match raw.parse::<MonthId>() {
            Ok(id) => id,
            Err(err) => {
                warn!(raw = %raw, error = %err, fallback = %fallback, "unusable month; falling back");
                fallback
            }
        }
    }

    pub fn year(self) -> i32 {
        self.year
    }

    /// Zero-based month.
    pub fn month(self) -> u32 {
        self.month
    }

    #[must_use]
    pub fn add_months(self, delta: i64) -> Self {
        Self::normalize(self.year, i64::from(self.month) + delta)
    }

    /// Signed month distance from `self` to `other`.
    pub fn months_until(self, other: MonthId) -> i64 {
        (i64::from(other.year) - i64::from(self.year)) * 12 + i64::from(other.month)
            - i64::from(self.month)
    }

    /// Day 1 of this month, or `None` beyond chrono's supported range.
    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)
    }

    pub fn date_of(self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month + 1, day)
    }

    pub fn last_day(self) -> Option<NaiveDate> {
        self.date_of(self.days_in_month())
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month0() == self.month
    }

    pub fn days_in_month(self) -> u32 {
        calendar::days_in_month(self.year, self.month)
    }

    pub fn row_count(self) -> usize {
        calendar::row_count(self.year, self.month)
    }

    pub fn grid(self) -> CalendarGrid {
        calendar::build_grid(self.year, self.month)
    }

    pub fn name(self) -> &'static str {
        MONTH_NAMES[self.month as usize]
    }

    /// `"March 2024"`.
    pub fn label(self) -> String {
        format!("{} {}", self.name(), self.year)
    }
}

impl fmt::Display for MonthId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseMonthIdError {
    Malformed(String),
    MonthOutOfRange(u32),
    YearOutOfRange(String),
}

impl fmt::Display for ParseMonthIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(raw) => write!(f, "expected YEAR-MONTH, got: {raw:?}"),
            Self::MonthOutOfRange(month) => {
                write!(f, "month {month} is outside 0..=11")
            }
            Self::YearOutOfRange(raw) => write!(f, "year {raw} is not representable"),
        }
    }
}

impl std::error::Error for ParseMonthIdError {}

fn month_id_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(-?\d+)-(\d{1,2})$").ok())
        .as_ref()
}

impl FromStr for MonthId {
    type Err = ParseMonthIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let caps = month_id_regex()
            .and_then(|re| re.captures(trimmed))
            .ok_or_else(|| ParseMonthIdError::Malformed(trimmed.to_string()))?;

        let year = caps[1]
            .parse::<i32>()
            .map_err(|_| ParseMonthIdError::YearOutOfRange(caps[1].to_string()))?;
        let month = caps[2]
            .parse::<u32>()
            .map_err(|_| ParseMonthIdError::Malformed(trimmed.to_string()))?;
        if month > 11 {
            return Err(ParseMonthIdError::MonthOutOfRange(month));
        }

        Ok(Self { year, month })
    }
}

impl TryFrom<String> for MonthId {
    type Error = ParseMonthIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MonthId> for String {
    fn from(value: MonthId) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{MonthId, ParseMonthIdError};

    #[test]
    fn normalize_carries_into_year() {
        assert_eq!(MonthId::normalize(2024, 12), MonthId::normalize(2025, 0));
        let prev = MonthId::normalize(2024, -1);
        assert_eq!((prev.year(), prev.month()), (2023, 11));
        let far = MonthId::normalize(2024, -25);
        assert_eq!((far.year(), far.month()), (2021, 11));
    }

    #[test]
    fn normalize_saturates_at_extremes() {
        let top = MonthId::normalize(i32::MAX, 40);
        assert_eq!((top.year(), top.month()), (i32::MAX, 11));
        let bottom = MonthId::normalize(i32::MIN, -40);
        assert_eq!((bottom.year(), bottom.month()), (i32::MIN, 0));
    }

    #[test]
    fn string_form_is_zero_based() {
        let march = MonthId::from_date(NaiveDate::from_ymd_opt(2024, 3, 15).expect("date"));
        assert_eq!(march.to_string(), "2024-2");
        assert_eq!(march.label(), "March 2024");
        assert_eq!("2024-2".parse::<MonthId>().expect("parse"), march);
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(
            "2024-12".parse::<MonthId>(),
            Err(ParseMonthIdError::MonthOutOfRange(12))
        );
        assert!(matches!(
            "march".parse::<MonthId>(),
            Err(ParseMonthIdError::Malformed(_))
        ));
        assert!(matches!(
            "99999999999-1".parse::<MonthId>(),
            Err(ParseMonthIdError::YearOutOfRange(_))
        ));
        assert!("".parse::<MonthId>().is_err());
    }

    #[test]
    fn parse_or_falls_back() {
        let fallback = MonthId::normalize(2030, 0);
        assert_eq!(MonthId::parse_or("nope", fallback), fallback);
        assert_eq!(MonthId::parse_or("2024-5", fallback), MonthId::normalize(2024, 5));
    }

    #[test]
    fn arithmetic_round_trips_through_string_form() {
        let base = MonthId::normalize(1999, 7);
        for delta in -600..=600 {
            let moved = base.add_months(delta);
            assert_eq!(moved.to_string().parse::<MonthId>().expect("parse"), moved);
            assert_eq!(moved.add_months(-delta), base);
            assert_eq!(base.months_until(moved), delta);
        }
    }

    #[test]
    fn negative_years_round_trip() {
        let id = MonthId::normalize(-44, 2);
        assert_eq!(id.to_string(), "-44-2");
        assert_eq!("-44-2".parse::<MonthId>().expect("parse"), id);
    }

    #[test]
    fn serde_uses_string_form() {
        let id = MonthId::normalize(2024, 5);
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"2024-5\"");
        let back: MonthId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn month_bounds() {
        let feb = MonthId::normalize(2024, 1);
        assert_eq!(feb.first_day(), NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(feb.last_day(), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert!(feb.contains(NaiveDate::from_ymd_opt(2024, 2, 10).expect("date")));
        assert!(!feb.contains(NaiveDate::from_ymd_opt(2023, 2, 10).expect("date")));
    }
}
