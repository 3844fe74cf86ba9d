use chrono::{Datelike, NaiveDate};
use tracing::{debug, trace};

use crate::calendar::DAYS_PER_WEEK;
use crate::feedback::{self, Feedback};
use crate::month::MonthId;
use crate::size::MonthSize;

pub const WEEKDAY_LABELS: [&str; DAYS_PER_WEEK] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DayCell {
    pub day: Option<u32>,
    pub date: Option<NaiveDate>,
    pub is_today: bool,
}

impl DayCell {
    /// Padding cells and dates chrono cannot represent do not take taps.
    pub fn is_interactive(&self) -> bool {
        self.date.is_some()
    }
}

/// Column labels above the grid, sized with the grid's cell width.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekdayHeader {
    pub labels: [&'static str; DAYS_PER_WEEK],
    pub cell_width: f32,
    pub height: f32,
}

impl WeekdayHeader {
    pub fn new(cell_width: f32, height: f32) -> Self {
        Self {
            labels: WEEKDAY_LABELS,
            cell_width,
            height,
        }
    }
}

/// One rendered month block: its label and the day grid with "today" marked.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthView {
    pub month: MonthId,
    pub label: String,
    pub size: MonthSize,
    pub rows: Vec<[DayCell; DAYS_PER_WEEK]>,
}

impl MonthView {
    pub fn render(month: MonthId, today: NaiveDate, size: MonthSize) -> Self {
        let rows = month
            .grid()
            .rows()
            .iter()
            .map(|week| {
                let mut cells = [DayCell::default(); DAYS_PER_WEEK];
                for (cell, day) in cells.iter_mut().zip(week.iter()) {
                    let Some(day) = *day else {
                        continue;
                    };
                    let date = month.date_of(day);
                    *cell = DayCell {
                        day: Some(day),
                        date,
                        is_today: date == Some(today),
                    };
                }
                cells
            })
            .collect();

        trace!(month = %month, today = %today, "rendered month view");
        Self {
            month,
            label: month.label(),
            size,
            rows,
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&DayCell> {
        self.rows.get(row).and_then(|week| week.get(col))
    }

    pub fn today_position(&self) -> Option<(usize, usize)> {
        self.rows.iter().enumerate().find_map(|(row_idx, week)| {
            week.iter()
                .position(|cell| cell.is_today)
                .map(|col| (row_idx, col))
        })
    }

    pub fn position_of(&self, day: u32) -> Option<(usize, usize)> {
        self.rows.iter().enumerate().find_map(|(row_idx, week)| {
            week.iter()
                .position(|cell| cell.day == Some(day))
                .map(|col| (row_idx, col))
        })
    }

    /// Taps the cell at `(row, col)`.
    ///
    /// Interactive cells fire selection feedback and report their date to
    /// `on_day_pressed` exactly once; anything else is a no-op.
    pub fn press(
        &self,
        row: usize,
        col: usize,
        feedback: &dyn Feedback,
        on_day_pressed: &mut dyn FnMut(NaiveDate),
    ) -> Option<NaiveDate> {
        let date = self.cell(row, col).and_then(|cell| cell.date)?;
        feedback::fire(feedback);
        debug!(date = %date, key = %day_key(date), "day pressed");
        on_day_pressed(date);
        Some(date)
    }
}

/// Route form of a day: `"{year}-{month}-{day}"` with a one-based month.
pub fn day_key(date: NaiveDate) -> String {
    format!("{}-{}-{}", date.year(), date.month(), date.day())
}
