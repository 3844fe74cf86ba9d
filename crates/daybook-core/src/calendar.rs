//! Month grid arithmetic.
//!
//! Months are zero-based here (`0` = January) to match [`crate::month::MonthId`].
//! Weekdays are zero-based from Sunday.

pub const DAYS_PER_WEEK: usize = 7;

const MONTH_LENGTHS: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

// Sakamoto's month offsets, indexed by zero-based month.
const WEEKDAY_OFFSETS: [i64; 12] = [0, 3, 2, 5, 0, 3, 5, 1, 4, 6, 2, 4];

/// One week-row of a month. `None` is padding before day 1 or after the last day.
pub type Week = [Option<u32>; DAYS_PER_WEEK];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarGrid {
    rows: Vec<Week>,
}

impl CalendarGrid {
    pub fn rows(&self) -> &[Week] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Days in grid order, skipping padding.
    pub fn days(&self) -> impl Iterator<Item = u32> + '_ {
        self.rows.iter().flat_map(|row| row.iter().flatten().copied())
    }

    /// `(row, column)` of `day`, if the month has it.
    pub fn position_of(&self, day: u32) -> Option<(usize, usize)> {
        self.rows.iter().enumerate().find_map(|(row_idx, row)| {
            row.iter()
                .position(|cell| *cell == Some(day))
                .map(|col| (row_idx, col))
        })
    }
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let month = (month % 12) as usize;
    if month == 1 && is_leap_year(year) {
        29
    } else {
        MONTH_LENGTHS[month]
    }
}

/// Weekday of the 1st, `0` = Sunday.
pub fn starting_weekday(year: i32, month: u32) -> u32 {
    let month = (month % 12) as usize;
    let y = if month < 2 {
        i64::from(year) - 1
    } else {
        i64::from(year)
    };
    let raw = y + y.div_euclid(4) - y.div_euclid(100) + y.div_euclid(400) + WEEKDAY_OFFSETS[month] + 1;
    raw.rem_euclid(DAYS_PER_WEEK as i64) as u32
}

/// Number of week-rows the month spans: 4, 5 or 6.
pub fn row_count(year: i32, month: u32) -> usize {
    let occupied = starting_weekday(year, month) + days_in_month(year, month);
    (occupied as usize).div_ceil(DAYS_PER_WEEK)
}

pub fn build_grid(year: i32, month: u32) -> CalendarGrid {
    let lead = starting_weekday(year, month) as usize;
    let days = days_in_month(year, month);

    let mut cells: Vec<Option<u32>> = Vec::with_capacity(6 * DAYS_PER_WEEK);
    cells.extend(std::iter::repeat_n(None, lead));
    cells.extend((1..=days).map(Some));
    let trailing = (DAYS_PER_WEEK - cells.len() % DAYS_PER_WEEK) % DAYS_PER_WEEK;
    cells.extend(std::iter::repeat_n(None, trailing));

    let rows = cells
        .chunks_exact(DAYS_PER_WEEK)
        .map(|chunk| {
            let mut week: Week = [None; DAYS_PER_WEEK];
            week.copy_from_slice(chunk);
            week
        })
        .collect();

    CalendarGrid { rows }
}
