mod drag;
mod headers;
mod index;
mod quick_add;
mod schedule;

use thiserror::Error;

pub use drag::DragKind;
pub use headers::{month_runs, week_runs};
pub use quick_add::QuickAddDraft;
pub use schedule::{is_delayed, LotRow, ScheduleStats, ScheduleView, TimelineSettings};

#[derive(Debug, Error, PartialEq)]
pub enum TimelineError {
    #[error("Day width must be a positive number of pixels, got {0}")]
    InvalidDayWidth(f32),
}
