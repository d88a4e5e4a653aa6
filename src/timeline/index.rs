//! Date ↔ pixel mapping for the visible timeline window.
//!
//! Day granularity only: a date maps to the left edge of its column, and a
//! pixel offset maps back to the nearest column start.

use chrono::{Datelike, Duration, Months, NaiveDate};

use super::TimelineError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemporalIndex {
    visible_start: NaiveDate,
    visible_end: NaiveDate,
    day_width: f32,
}

impl TemporalIndex {
    /// An inverted window collapses to a single day.
    pub fn new(visible_start: NaiveDate, visible_end: NaiveDate, day_width: f32) -> Result<Self, TimelineError> {
        if !day_width.is_finite() || day_width <= 0.0 {
            return Err(TimelineError::InvalidDayWidth(day_width));
        }
        Ok(Self {
            visible_start,
            visible_end: visible_end.max(visible_start),
            day_width,
        })
    }

    /// Window around `month`: from the first day of `month - look_back`
    /// through the last day of `month + look_ahead`.
    pub fn for_month(month: NaiveDate, look_back: u32, look_ahead: u32, day_width: f32) -> Result<Self, TimelineError> {
        let first = first_of_month(month);
        let start = first.checked_sub_months(Months::new(look_back)).unwrap_or(first);
        let end = first
            .checked_add_months(Months::new(look_ahead + 1))
            .and_then(|d| d.pred_opt())
            .unwrap_or(first);
        Self::new(start, end, day_width)
    }

    pub fn visible_start(&self) -> NaiveDate {
        self.visible_start
    }

    pub fn visible_end(&self) -> NaiveDate {
        self.visible_end
    }

    pub fn day_width(&self) -> f32 {
        self.day_width
    }

    /// Left edge of `date`'s column. Dates outside the window give negative
    /// or over-range offsets; callers clip when painting.
    pub fn position_of(&self, date: NaiveDate) -> f32 {
        days_between(self.visible_start, date) as f32 * self.day_width
    }

    /// Nearest column start, never earlier than the window start
    pub fn date_at_position(&self, pixels: f32) -> NaiveDate {
        let days = (pixels / self.day_width).round();
        if !days.is_finite() || days <= 0.0 {
            return self.visible_start;
        }
        shift(self.visible_start, days as i64)
    }

    /// Horizontal extent of a bar covering `start..=end`
    pub fn span_of(&self, start: NaiveDate, end: NaiveDate) -> (f32, f32) {
        (self.position_of(start), self.position_of(end) + self.day_width)
    }

    pub fn day_count(&self) -> usize {
        days_between(self.visible_start, self.visible_end) as usize + 1
    }

    pub fn total_width(&self) -> f32 {
        self.day_count() as f32 * self.day_width
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.visible_start && date <= self.visible_end
    }

    pub fn days(&self) -> Vec<NaiveDate> {
        self.visible_start
            .iter_days()
            .take(self.day_count())
            .collect()
    }
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// `date + days`, saturating at the calendar limits instead of panicking
pub fn shift(date: NaiveDate, days: i64) -> NaiveDate {
    Duration::try_days(days)
        .and_then(|d| date.checked_add_signed(d))
        .unwrap_or(if days > 0 { NaiveDate::MAX } else { NaiveDate::MIN })
}
