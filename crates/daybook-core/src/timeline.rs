//! The scrolling month list.
//!
//! A [`TimelineController`] owns a window of months around an anchor month
//! and the "focal" month shown in the header. Scroll-driven visibility reports
//! move the focal month without touching the window; [`TimelineController::jump_to`]
//! is the only operation that rebuilds it.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info, warn};

use crate::feedback::{self, Feedback};
use crate::month::MonthId;
use crate::month_view::{MonthView, WeekdayHeader};
use crate::size::{SizePolicy, Viewport};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineSettings {
    /// Months kept before the anchor month.
    pub past_range: u32,
    /// Months kept after the anchor month.
    pub future_range: u32,
    /// Minimum spacing between two accepted visibility reports.
    pub debounce: Duration,
    /// Percentage an entry must show to appear in [`TimelineController::visibility_at`].
    pub visible_threshold: f32,
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self {
            past_range: 6,
            future_range: 48,
            debounce: Duration::from_millis(150),
            visible_threshold: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthEntry {
    /// `month.to_string()`; stable list key.
    pub id: String,
    pub month: MonthId,
}

/// One line of a host visibility report.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleEntry {
    pub id: String,
    /// `0.0..=100.0`
    pub percent: f32,
}

impl VisibleEntry {
    pub fn new(id: impl Into<String>, percent: f32) -> Self {
        Self {
            id: id.into(),
            percent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemLayout {
    pub index: usize,
    pub offset: f32,
    pub length: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityOutcome {
    /// Nothing in the report matched the window.
    Empty,
    /// Arrived inside the debounce interval and was dropped.
    Debounced,
    Unchanged(MonthId),
    Changed(MonthId),
}

type DayPressed = Box<dyn FnMut(NaiveDate)>;
type MonthChanged = Box<dyn FnMut(MonthId)>;

pub struct TimelineController {
    settings: TimelineSettings,
    policy: SizePolicy,
    viewport: Viewport,
    today: NaiveDate,
    anchor: MonthId,
    focal: MonthId,
    entries: Vec<MonthEntry>,
    index_by_id: HashMap<String, usize>,
    layouts: Vec<ItemLayout>,
    last_accepted: Option<Instant>,
    feedback: Box<dyn Feedback>,
    on_day_pressed: Option<DayPressed>,
    on_month_changed: Option<MonthChanged>,
}

impl fmt::Debug for TimelineController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimelineController")
            .field("settings", &self.settings)
            .field("anchor", &self.anchor)
            .field("focal", &self.focal)
            .field("entries", &self.entries.len())
            .field("last_accepted", &self.last_accepted)
            .finish_non_exhaustive()
    }
}

impl TimelineController {
    pub fn new(
        initial: MonthId,
        today: NaiveDate,
        settings: TimelineSettings,
        policy: SizePolicy,
        viewport: Viewport,
        feedback: Box<dyn Feedback>,
    ) -> Self {
        let mut controller = Self {
            settings,
            policy,
            viewport,
            today,
            anchor: initial,
            focal: initial,
            entries: Vec::new(),
            index_by_id: HashMap::new(),
            layouts: Vec::new(),
            last_accepted: None,
            feedback,
            on_day_pressed: None,
            on_month_changed: None,
        };
        controller.rebuild_window();
        controller
    }

    pub fn with_day_pressed(mut self, callback: impl FnMut(NaiveDate) + 'static) -> Self {
        self.on_day_pressed = Some(Box::new(callback));
        self
    }

    pub fn with_month_changed(mut self, callback: impl FnMut(MonthId) + 'static) -> Self {
        self.on_month_changed = Some(Box::new(callback));
        self
    }

    pub fn focal_month(&self) -> MonthId {
        self.focal
    }

    pub fn entries(&self) -> &[MonthEntry] {
        &self.entries
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn settings(&self) -> &TimelineSettings {
        &self.settings
    }

    pub fn index_of(&self, month: MonthId) -> Option<usize> {
        self.index_by_id.get(&month.to_string()).copied()
    }

    /// Where the list starts: the anchor month, so it shows without animation.
    pub fn initial_scroll_index(&self) -> usize {
        self.index_of(self.anchor).unwrap_or(0)
    }

    pub fn item_layout(&self, index: usize) -> Option<ItemLayout> {
        self.layouts.get(index).copied()
    }

    pub fn content_height(&self) -> f32 {
        self.layouts
            .last()
            .map(|layout| layout.offset + layout.length)
            .unwrap_or(0.0)
    }

    pub fn weekday_header(&self) -> WeekdayHeader {
        WeekdayHeader::new(
            self.policy.cell_width(self.viewport),
            self.policy.weekday_header_height,
        )
    }

    pub fn month_view(&self, index: usize) -> Option<MonthView> {
        let entry = self.entries.get(index)?;
        let size = self.policy.compute(entry.month, self.viewport);
        Some(MonthView::render(entry.month, self.today, size))
    }

    /// Applies a host visibility report received at `at`.
    ///
    /// The most visible known entry wins, ties going to the earlier line. A
    /// new focal month fires feedback and the month-changed callback; the
    /// window itself is left as is.
    #[tracing::instrument(skip(self, report), fields(lines = report.len()))]
    pub fn handle_visibility(&mut self, report: &[VisibleEntry], at: Instant) -> VisibilityOutcome {
        let mut best: Option<(usize, f32)> = None;
        for line in report {
            if !line.percent.is_finite() {
                debug!(id = %line.id, percent = line.percent, "skipping non-finite visibility");
                continue;
            }
            let Some(&index) = self.index_by_id.get(&line.id) else {
                warn!(id = %line.id, "visibility report names a month outside the window");
                continue;
            };
            if best.is_none_or(|(_, percent)| line.percent > percent) {
                best = Some((index, line.percent));
            }
        }

        let Some((index, percent)) = best else {
            debug!("empty visibility report");
            return VisibilityOutcome::Empty;
        };

        if let Some(last) = self.last_accepted
            && at.saturating_duration_since(last) < self.settings.debounce
        {
            debug!(since_last = ?at.saturating_duration_since(last), "debounced visibility report");
            return VisibilityOutcome::Debounced;
        }
        self.last_accepted = Some(at);

        let month = self.entries[index].month;
        if month == self.focal {
            return VisibilityOutcome::Unchanged(month);
        }

        debug!(from = %self.focal, to = %month, percent, "focal month changed");
        self.focal = month;
        feedback::fire(self.feedback.as_ref());
        if let Some(callback) = self.on_month_changed.as_mut() {
            callback(month);
        }
        VisibilityOutcome::Changed(month)
    }

    pub fn handle_visibility_now(&mut self, report: &[VisibleEntry]) -> VisibilityOutcome {
        self.handle_visibility(report, Instant::now())
    }

    /// Re-centres the window on `month` and makes it the focal month.
    ///
    /// Clears the debounce clock so the host's next report is honoured.
    #[tracing::instrument(skip(self))]
    pub fn jump_to(&mut self, month: MonthId) {
        self.anchor = month;
        self.focal = month;
        self.last_accepted = None;
        self.rebuild_window();
    }

    pub fn jump_to_today(&mut self) {
        self.jump_to(MonthId::from_date(self.today));
    }

    /// Midnight rollover; only changes which cell is highlighted.
    pub fn set_today(&mut self, today: NaiveDate) {
        self.today = today;
    }

    /// Rotation or resize: recompute every block height and offset.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        if viewport == self.viewport {
            return;
        }
        debug!(width = viewport.width, height = viewport.height, "viewport changed");
        self.viewport = viewport;
        self.recompute_layouts();
    }

    /// Derives a visibility report from a scroll position.
    ///
    /// Each entry overlapping `[scroll_offset, scroll_offset + viewport_height)`
    /// is reported with the share of its own block on screen, keeping those
    /// at or above the visibility threshold.
    pub fn visibility_at(&self, scroll_offset: f32, viewport_height: f32) -> Vec<VisibleEntry> {
        let top = scroll_offset;
        let bottom = scroll_offset + viewport_height;

        let start = self
            .layouts
            .partition_point(|layout| layout.offset + layout.length <= top);

        self.layouts[start..]
            .iter()
            .take_while(|layout| layout.offset < bottom)
            .filter_map(|layout| {
                let shown = (layout.offset + layout.length).min(bottom) - layout.offset.max(top);
                let percent = if layout.length > 0.0 {
                    (shown / layout.length * 100.0).clamp(0.0, 100.0)
                } else {
                    0.0
                };
                (percent >= self.settings.visible_threshold)
                    .then(|| VisibleEntry::new(self.entries[layout.index].id.clone(), percent))
            })
            .collect()
    }

    /// Taps `(row, col)` of `month`'s grid and forwards the date to the
    /// day-pressed callback.
    pub fn press_day(&mut self, month: MonthId, row: usize, col: usize) -> Option<NaiveDate> {
        let size = self.policy.compute(month, self.viewport);
        let view = MonthView::render(month, self.today, size);
        let on_day_pressed = &mut self.on_day_pressed;
        view.press(row, col, self.feedback.as_ref(), &mut |date| {
            if let Some(callback) = on_day_pressed.as_mut() {
                callback(date);
            }
        })
    }

    /// Taps `date` wherever it sits in its month's grid.
    pub fn press_date(&mut self, date: NaiveDate) -> Option<NaiveDate> {
        let month = MonthId::from_date(date);
        let (row, col) = month.grid().position_of(date.day())?;
        self.press_day(month, row, col)
    }

    fn rebuild_window(&mut self) {
        let past = i64::from(self.settings.past_range);
        let future = i64::from(self.settings.future_range);

        // Near the edge of representable years `add_months` saturates;
        // repeated months are dropped so ids stay unique and ascending.
        let mut months: Vec<MonthId> = Vec::new();
        for delta in -past..=future {
            let month = self.anchor.add_months(delta);
            if months.last().is_none_or(|last| *last < month) {
                months.push(month);
            }
        }
        self.entries = months
            .into_iter()
            .map(|month| MonthEntry {
                id: month.to_string(),
                month,
            })
            .collect();
        self.index_by_id = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (entry.id.clone(), index))
            .collect();
        self.recompute_layouts();

        info!(
            anchor = %self.anchor,
            first = %self.entries.first().map(|e| e.id.as_str()).unwrap_or("-"),
            last = %self.entries.last().map(|e| e.id.as_str()).unwrap_or("-"),
            count = self.entries.len(),
            "rebuilt timeline window"
        );
    }

    fn recompute_layouts(&mut self) {
        let mut offset = 0.0;
        self.layouts = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let length = self.policy.compute(entry.month, self.viewport).month_block_height;
                let layout = ItemLayout {
                    index,
                    offset,
                    length,
                };
                offset += length;
                layout
            })
            .collect();
    }
}

/// Initial month for a screen: `raw` when it parses, else the month of `today`.
pub fn initial_month(raw: Option<&str>, today: NaiveDate) -> MonthId {
    let current = MonthId::from_date(today);
    match raw {
        Some(raw) => MonthId::parse_or(raw, current),
        None => current,
    }
}
