use crate::calendar::DAYS_PER_WEEK;
use crate::month::MonthId;

/// Rows a month can span at most; `Fill` sizes cells so that many fit.
const MAX_ROWS: f32 = 6.0;
const MIN_CELL_HEIGHT: f32 = 24.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellHeight {
    /// Device-independent pixels, whatever the viewport.
    Fixed(f32),
    /// Share six rows over the viewport height left after `reserved`.
    Fill { reserved: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthSize {
    pub cell_width: f32,
    pub cell_height: f32,
    pub rows: usize,
    pub month_block_height: f32,
}

/// Geometry of one month block. Block height follows the month's own row count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizePolicy {
    pub horizontal_padding: f32,
    pub month_header_height: f32,
    /// The sticky weekday row above the list; not part of any block.
    pub weekday_header_height: f32,
    pub cell_height: CellHeight,
}

impl Default for SizePolicy {
    fn default() -> Self {
        Self {
            horizontal_padding: 32.0,
            month_header_height: 48.0,
            weekday_header_height: 40.0,
            cell_height: CellHeight::Fixed(56.0),
        }
    }
}

impl SizePolicy {
    /// Column width shared by the weekday header and every grid row.
    pub fn cell_width(&self, viewport: Viewport) -> f32 {
        ((viewport.width - self.horizontal_padding) / DAYS_PER_WEEK as f32).max(0.0)
    }

    pub fn cell_height(&self, viewport: Viewport) -> f32 {
        match self.cell_height {
            CellHeight::Fixed(height) => height,
            CellHeight::Fill { reserved } => {
                ((viewport.height - reserved) / MAX_ROWS).max(MIN_CELL_HEIGHT)
            }
        }
    }

    pub fn compute(&self, id: MonthId, viewport: Viewport) -> MonthSize {
        let rows = id.row_count();
        let cell_height = self.cell_height(viewport);
        MonthSize {
            cell_width: self.cell_width(viewport),
            cell_height,
            rows,
            month_block_height: cell_height * rows as f32 + self.month_header_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CellHeight, SizePolicy, Viewport};
    use crate::month::MonthId;

    #[test]
    fn block_height_tracks_row_count() {
        let policy = SizePolicy::default();
        let viewport = Viewport::new(390.0, 844.0);

        let four = policy.compute(MonthId::normalize(2015, 1), viewport);
        let five = policy.compute(MonthId::normalize(2023, 0), viewport);
        let six = policy.compute(MonthId::normalize(2023, 6), viewport);

        assert_eq!(four.rows, 4);
        assert_eq!(five.rows, 5);
        assert_eq!(six.rows, 6);
        assert_eq!(four.month_block_height, 56.0 * 4.0 + 48.0);
        assert_eq!(six.month_block_height - five.month_block_height, 56.0);
    }

    #[test]
    fn width_is_shared_by_all_columns() {
        let policy = SizePolicy::default();
        let viewport = Viewport::new(382.0, 700.0);
        let size = policy.compute(MonthId::normalize(2024, 2), viewport);
        assert_eq!(size.cell_width, 50.0);
        assert_eq!(policy.cell_width(viewport), size.cell_width);
        assert_eq!(policy.cell_width(Viewport::new(10.0, 10.0)), 0.0);
    }

    #[test]
    fn fill_mode_divides_remaining_height() {
        let policy = SizePolicy {
            cell_height: CellHeight::Fill { reserved: 100.0 },
            ..SizePolicy::default()
        };
        assert_eq!(policy.cell_height(Viewport::new(390.0, 700.0)), 100.0);
        assert_eq!(policy.cell_height(Viewport::new(390.0, 120.0)), 24.0);
    }
}
