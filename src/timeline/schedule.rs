//! Composition of the timeline: snapshot, controllers and derived views.
//!
//! Dates shown for a lot come from three layers, highest first: the drag
//! overlay, a committed update still waiting for the store, and the store
//! snapshot itself.

use chrono::{Months, NaiveDate};
use std::cmp::Ordering;
use std::collections::HashMap;

use super::drag::{DragController, DragKind};
use super::index::{first_of_month, TemporalIndex};
use super::quick_add::QuickAddController;
use super::TimelineError;
use crate::api::{CommandOutcome, Company, Lot, LotId, LotPatch, LotStatus, StoreCommand};
use crate::config::{Config, SecondPressPolicy};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineSettings {
    pub day_width: f32,
    pub look_back_months: u32,
    pub look_ahead_months: u32,
    pub quick_add_days: i64,
    pub resize_handle_px: f32,
    pub second_press: SecondPressPolicy,
}

impl From<&Config> for TimelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            day_width: config.day_width,
            look_back_months: config.look_back_months,
            look_ahead_months: config.look_ahead_months,
            quick_add_days: config.quick_add_days,
            resize_handle_px: config.resize_handle_px,
            second_press: config.second_press,
        }
    }
}

/// Horizontal extent of a bar in timeline coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarSpan {
    pub left: f32,
    pub right: f32,
}

/// Everything needed to paint one row
#[derive(Debug, Clone, PartialEq)]
pub struct LotRow {
    pub lot: Lot,
    pub company: Option<String>,
    pub bar: Option<BarSpan>,
    pub delayed: bool,
    pub selected: bool,
    pub dragging: bool,
    /// Dates shown are not confirmed by the store yet
    pub provisional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScheduleStats {
    pub total: usize,
    pub scheduled: usize,
    pub delayed: usize,
    pub by_status: Vec<(LotStatus, usize)>,
}

impl ScheduleStats {
    pub fn count(&self, status: LotStatus) -> usize {
        self.by_status
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

pub fn filter_lots(lots: &[Lot], status: Option<LotStatus>) -> Vec<Lot> {
    lots.iter()
        .filter(|l| status.map_or(true, |s| l.status == s))
        .cloned()
        .collect()
}

fn schedule_order(a: &Lot, b: &Lot) -> Ordering {
    match (a.start_date, b.start_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.sort_order.cmp(&b.sort_order),
    }
}

/// Dated lots by start date, then undated lots by `sort_order`. Stable.
pub fn sort_lots(lots: &mut [Lot]) {
    lots.sort_by(schedule_order);
}

pub fn is_delayed(lot: &Lot, today: NaiveDate) -> bool {
    lot.status != LotStatus::Completed && lot.end_date.is_some_and(|end| end < today)
}

pub fn compute_stats(lots: &[Lot], today: NaiveDate) -> ScheduleStats {
    ScheduleStats {
        total: lots.len(),
        scheduled: lots.iter().filter(|l| l.dates().is_some()).count(),
        delayed: lots.iter().filter(|l| is_delayed(l, today)).count(),
        by_status: LotStatus::ALL
            .iter()
            .map(|s| (*s, lots.iter().filter(|l| l.status == *s).count()))
            .collect(),
    }
}

pub struct ScheduleView {
    lots: Vec<Lot>,
    companies: HashMap<String, String>,
    current_month: NaiveDate,
    index: TemporalIndex,
    settings: TimelineSettings,
    status_filter: Option<LotStatus>,
    selected: Option<LotId>,
    pending: HashMap<LotId, LotPatch>,
    drag: DragController,
    quick_add: QuickAddController,
}

impl ScheduleView {
    pub fn new(settings: TimelineSettings, today: NaiveDate) -> Result<Self, TimelineError> {
        let current_month = first_of_month(today);
        let index = Self::build_index(current_month, &settings)?;
        Ok(Self {
            lots: Vec::new(),
            companies: HashMap::new(),
            current_month,
            index,
            settings,
            status_filter: None,
            selected: None,
            pending: HashMap::new(),
            drag: DragController::new(settings.resize_handle_px, settings.second_press),
            quick_add: QuickAddController::new(settings.quick_add_days),
        })
    }

    fn build_index(month: NaiveDate, settings: &TimelineSettings) -> Result<TemporalIndex, TimelineError> {
        TemporalIndex::for_month(
            month,
            settings.look_back_months,
            settings.look_ahead_months,
            settings.day_width,
        )
    }

    pub fn apply_settings(&mut self, settings: TimelineSettings) -> Result<(), TimelineError> {
        self.index = Self::build_index(self.current_month, &settings)?;
        self.settings = settings;
        self.drag.configure(settings.resize_handle_px, settings.second_press);
        self.quick_add.set_default_days(settings.quick_add_days);
        Ok(())
    }

    pub fn set_day_width(&mut self, day_width: f32) -> Result<(), TimelineError> {
        let settings = TimelineSettings { day_width, ..self.settings };
        self.apply_settings(settings)
    }

    pub fn index(&self) -> &TemporalIndex {
        &self.index
    }

    // ---- navigation ------------------------------------------------------

    pub fn current_month(&self) -> NaiveDate {
        self.current_month
    }

    fn go_to_month(&mut self, month: NaiveDate) {
        // Windows of an already-validated day width always build
        if let Ok(index) = Self::build_index(month, &self.settings) {
            self.current_month = month;
            self.index = index;
        }
    }

    pub fn previous_month(&mut self) {
        if let Some(month) = self.current_month.checked_sub_months(Months::new(1)) {
            self.go_to_month(month);
        }
    }

    pub fn next_month(&mut self) {
        if let Some(month) = self.current_month.checked_add_months(Months::new(1)) {
            self.go_to_month(month);
        }
    }

    pub fn go_to_today(&mut self, today: NaiveDate) {
        self.go_to_month(first_of_month(today));
    }

    // ---- snapshot --------------------------------------------------------

    /// Replace the store snapshot. Transient state pointing at lots that no
    /// longer exist is dropped; a running drag keeps its overlay.
    pub fn set_snapshot(&mut self, lots: Vec<Lot>) {
        let exists = |id: &str| lots.iter().any(|l| l.id == id);

        if let Some(id) = self.drag.active().map(|s| s.lot_id.clone()) {
            if !exists(&id) {
                self.drag.forget(&id);
            }
        }
        if let Some(id) = self.quick_add.draft().and_then(|d| d.target.clone()) {
            if !exists(&id) {
                self.quick_add.forget(&id);
            }
        }
        if self.selected.as_deref().is_some_and(|id| !exists(id)) {
            self.selected = None;
        }
        self.pending.retain(|id, _| exists(id));
        self.lots = lots;
    }

    pub fn set_companies(&mut self, companies: Vec<Company>) {
        self.companies = companies.into_iter().map(|c| (c.id, c.name)).collect();
    }

    pub fn company_name(&self, company_id: Option<&str>) -> Option<&str> {
        company_id.and_then(|id| self.companies.get(id)).map(String::as_str)
    }

    pub fn lots(&self) -> &[Lot] {
        &self.lots
    }

    /// A lot as last committed: snapshot plus updates still in flight
    pub fn confirmed_lot(&self, id: &str) -> Option<Lot> {
        let mut lot = self.lots.iter().find(|l| l.id == id)?.clone();
        if let Some(patch) = self.pending.get(id) {
            lot.apply(patch);
        }
        Some(lot)
    }

    fn confirmed_lots(&self) -> Vec<Lot> {
        self.lots
            .iter()
            .map(|l| {
                let mut lot = l.clone();
                if let Some(patch) = self.pending.get(&l.id) {
                    lot.apply(patch);
                }
                lot
            })
            .collect()
    }

    pub fn has_pending(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }

    // ---- filter / selection ---------------------------------------------

    pub fn status_filter(&self) -> Option<LotStatus> {
        self.status_filter
    }

    pub fn set_status_filter(&mut self, status: Option<LotStatus>) {
        self.status_filter = status;
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn select(&mut self, id: Option<LotId>) {
        self.selected = id;
    }

    // ---- derived views ---------------------------------------------------

    /// Filtered and ordered lots. Ordering uses committed dates, so rows do
    /// not jump around while a bar is being dragged.
    pub fn visible_lots(&self) -> Vec<Lot> {
        let mut lots = filter_lots(&self.confirmed_lots(), self.status_filter);
        sort_lots(&mut lots);
        lots
    }

    pub fn rows(&self, today: NaiveDate) -> Vec<LotRow> {
        let dragged = self.drag.active().map(|s| s.lot_id.as_str());
        self.visible_lots()
            .into_iter()
            .map(|mut lot| {
                let overlay = self.drag.overlay_for(&lot.id);
                if let Some((start, end)) = overlay {
                    lot.start_date = Some(start);
                    lot.end_date = Some(end);
                }
                let bar = lot.dates().map(|(start, end)| {
                    let (left, right) = self.index.span_of(start, end);
                    BarSpan { left, right }
                });
                LotRow {
                    company: self.company_name(lot.company_id.as_deref()).map(str::to_string),
                    bar,
                    delayed: is_delayed(&lot, today),
                    selected: self.selected.as_deref() == Some(lot.id.as_str()),
                    dragging: dragged == Some(lot.id.as_str()),
                    provisional: overlay.is_some() || self.pending.contains_key(&lot.id),
                    lot,
                }
            })
            .collect()
    }

    /// Totals over the whole schedule, regardless of the status filter
    pub fn stats(&self, today: NaiveDate) -> ScheduleStats {
        compute_stats(&self.confirmed_lots(), today)
    }

    // ---- pointer and keyboard routing -----------------------------------

    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    pub fn quick_add(&self) -> &QuickAddController {
        &self.quick_add
    }

    pub fn quick_add_mut(&mut self) -> &mut QuickAddController {
        &mut self.quick_add
    }

    /// Pointer went down on a lot's bar at timeline x `pointer_x`
    pub fn pointer_down_on_bar(&mut self, lot_id: &str, pointer_x: f32) -> bool {
        let Some(lot) = self.confirmed_lot(lot_id) else {
            return false;
        };
        let Some((start, end)) = lot.dates() else {
            return false;
        };
        let (left, right) = self.index.span_of(start, end);
        let kind = DragKind::classify(pointer_x, left, right, self.drag.handle_band());
        self.drag.press(&lot, kind, pointer_x)
    }

    pub fn pointer_move(&mut self, pointer_x: f32) -> bool {
        self.drag.pointer_move(pointer_x, self.index.day_width())
    }

    /// Finish the gesture. A press that never moved selects the lot instead.
    pub fn pointer_up(&mut self) -> Option<StoreCommand> {
        let lot_id = self.drag.active().map(|s| s.lot_id.clone())?;
        let command = self.drag.release();
        match &command {
            Some(command) => self.track(command),
            None => self.selected = Some(lot_id),
        }
        command
    }

    /// Release at `pointer_x`. The last move may arrive in the same frame as
    /// the release, so the overlay is brought up to date first.
    pub fn pointer_up_at(&mut self, pointer_x: f32) -> Option<StoreCommand> {
        self.pointer_move(pointer_x);
        self.pointer_up()
    }

    pub fn pointer_leave(&mut self) -> bool {
        self.drag.cancel()
    }

    /// Click on empty timeline space opens a quick-add draft at that day
    pub fn click_empty(&mut self, pointer_x: f32) -> bool {
        if self.drag.is_dragging() {
            return false;
        }
        let at = self.index.date_at_position(pointer_x);
        self.quick_add.open(at);
        true
    }

    /// Click on an undated lot's row: place that lot starting at the day
    pub fn click_undated(&mut self, lot_id: &str, pointer_x: f32) -> bool {
        if self.drag.is_dragging() {
            return false;
        }
        let Some(lot) = self.confirmed_lot(lot_id) else {
            return false;
        };
        let at = self.index.date_at_position(pointer_x);
        self.quick_add.open_for_lot(&lot, at);
        true
    }

    pub fn escape(&mut self) -> bool {
        let was_open = self.quick_add.is_open();
        self.quick_add.cancel();
        was_open
    }

    pub fn enter(&mut self) -> Option<StoreCommand> {
        let command = self.quick_add.submit()?;
        self.track(&command);
        Some(command)
    }

    /// Status change from the detail panel. Nothing to send if unchanged.
    pub fn status_command(&mut self, lot_id: &str, status: LotStatus) -> Option<StoreCommand> {
        let lot = self.confirmed_lot(lot_id)?;
        if lot.status == status {
            return None;
        }
        let command = StoreCommand::Update {
            id: lot.id,
            patch: LotPatch::status(status),
        };
        self.track(&command);
        Some(command)
    }

    pub fn delete_command(&self, lot_id: &str) -> Option<StoreCommand> {
        self.lots
            .iter()
            .find(|l| l.id == lot_id)
            .map(|l| StoreCommand::Delete { id: l.id.clone() })
    }

    /// Remember an update optimistically until the store answers
    fn track(&mut self, command: &StoreCommand) {
        if let StoreCommand::Update { id, patch } = command {
            let entry = self.pending.entry(id.clone()).or_default();
            if patch.start_date.is_some() {
                entry.start_date = patch.start_date;
            }
            if patch.end_date.is_some() {
                entry.end_date = patch.end_date;
            }
            if patch.status.is_some() {
                entry.status = patch.status;
            }
        }
    }

    // ---- store results ---------------------------------------------------

    pub fn apply_outcome(&mut self, outcome: CommandOutcome) {
        match outcome {
            CommandOutcome::Updated(lot) => {
                // A newer update for the same lot may still be in flight
                let settled = self.pending.get(&lot.id).map_or(true, |p| {
                    p.start_date.map_or(true, |d| lot.start_date == Some(d))
                        && p.end_date.map_or(true, |d| lot.end_date == Some(d))
                        && p.status.map_or(true, |s| lot.status == s)
                });
                if settled {
                    self.pending.remove(&lot.id);
                }
                match self.lots.iter_mut().find(|l| l.id == lot.id) {
                    Some(existing) => *existing = lot,
                    None => self.lots.push(lot),
                }
            }
            CommandOutcome::Created(lot) => {
                self.selected = Some(lot.id.clone());
                // A reload may have delivered the new lot already
                match self.lots.iter_mut().find(|l| l.id == lot.id) {
                    Some(existing) => *existing = lot,
                    None => self.lots.push(lot),
                }
            }
            CommandOutcome::Deleted(id) => {
                let remaining: Vec<Lot> = self.lots.iter().filter(|l| l.id != id).cloned().collect();
                self.set_snapshot(remaining);
            }
        }
    }

    /// The store rejected a command. Only a failed update has optimistic
    /// state to undo; fields a newer update has since overwritten stay.
    pub fn command_failed(&mut self, command: &StoreCommand) {
        let StoreCommand::Update { id, patch } = command else {
            return;
        };
        let Some(entry) = self.pending.get_mut(id) else {
            return;
        };
        if patch.start_date.is_some() && entry.start_date == patch.start_date {
            entry.start_date = None;
        }
        if patch.end_date.is_some() && entry.end_date == patch.end_date {
            entry.end_date = None;
        }
        if patch.status.is_some() && entry.status == patch.status {
            entry.status = None;
        }
        if entry.is_empty() {
            self.pending.remove(id);
            log::warn!("Rolled back optimistic update of lot {}", id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lot(id: &str, start: Option<NaiveDate>, end: Option<NaiveDate>, status: LotStatus, order: i32) -> Lot {
        Lot {
            id: id.into(),
            name: format!("Lot {}", id),
            start_date: start,
            end_date: end,
            status,
            color: None,
            sort_order: order,
            company_id: None,
            project_id: None,
        }
    }

    fn settings() -> TimelineSettings {
        TimelineSettings {
            day_width: 20.0,
            look_back_months: 1,
            look_ahead_months: 2,
            quick_add_days: 14,
            resize_handle_px: 8.0,
            second_press: SecondPressPolicy::Ignore,
        }
    }

    /// Window Jan 1 - Apr 30 2025 at 20px per day
    fn view_with(lots: Vec<Lot>) -> ScheduleView {
        let mut view = ScheduleView::new(settings(), date(2025, 2, 10)).unwrap();
        view.set_snapshot(lots);
        view
    }

    fn sample() -> Vec<Lot> {
        vec![
            lot("undated-2", None, None, LotStatus::NotStarted, 2),
            lot("late", Some(date(2025, 1, 6)), Some(date(2025, 1, 15)), LotStatus::InProgress, 5),
            lot("a", Some(date(2025, 1, 10)), Some(date(2025, 1, 24)), LotStatus::InProgress, 9),
            lot("undated-1", None, None, LotStatus::OnHold, 1),
            lot("done", Some(date(2025, 1, 2)), Some(date(2025, 1, 5)), LotStatus::Completed, 0),
        ]
    }

    fn today() -> NaiveDate {
        date(2025, 1, 20)
    }

    fn ids(lots: &[Lot]) -> Vec<&str> {
        lots.iter().map(|l| l.id.as_str()).collect()
    }

    #[test]
    fn test_sort_order_and_idempotence() {
        let mut lots = sample();
        sort_lots(&mut lots);
        assert_eq!(ids(&lots), vec!["done", "late", "a", "undated-1", "undated-2"]);

        let once = lots.clone();
        sort_lots(&mut lots);
        assert_eq!(lots, once);
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let mut lots = vec![
            lot("x", Some(date(2025, 1, 1)), None, LotStatus::NotStarted, 3),
            lot("y", Some(date(2025, 1, 1)), None, LotStatus::NotStarted, 1),
            lot("p", None, None, LotStatus::NotStarted, 0),
            lot("q", None, None, LotStatus::NotStarted, 0),
        ];
        sort_lots(&mut lots);
        assert_eq!(ids(&lots), vec!["x", "y", "p", "q"]);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let lots = sample();
        let once = filter_lots(&lots, Some(LotStatus::InProgress));
        assert_eq!(ids(&once), vec!["late", "a"]);
        assert_eq!(filter_lots(&once, Some(LotStatus::InProgress)), once);
        assert_eq!(filter_lots(&lots, None).len(), lots.len());
    }

    #[test]
    fn test_delay_detection() {
        let today = date(2025, 2, 10);
        let yesterday = date(2025, 2, 9);
        let mut l = lot("x", Some(date(2025, 2, 1)), Some(yesterday), LotStatus::InProgress, 0);
        assert!(is_delayed(&l, today));
        l.status = LotStatus::Completed;
        assert!(!is_delayed(&l, today));

        let due_today = lot("y", None, Some(today), LotStatus::InProgress, 0);
        assert!(!is_delayed(&due_today, today));
        let undated = lot("z", None, None, LotStatus::InProgress, 0);
        assert!(!is_delayed(&undated, today));
    }

    #[test]
    fn test_stats_ignore_filter() {
        let mut view = view_with(sample());
        view.set_status_filter(Some(LotStatus::Completed));
        assert_eq!(view.visible_lots().len(), 1);

        let stats = view.stats(today());
        assert_eq!(stats.total, 5);
        assert_eq!(stats.scheduled, 3);
        assert_eq!(stats.count(LotStatus::Completed), 1);
        assert_eq!(stats.count(LotStatus::InProgress), 2);
        assert_eq!(stats.count(LotStatus::Cancelled), 0);
        assert_eq!(stats.delayed, 1);
    }

    #[test]
    fn test_rows_position_bars() {
        let view = view_with(sample());
        let rows = view.rows(today());
        let a = rows.iter().find(|r| r.lot.id == "a").unwrap();
        assert_eq!(a.bar, Some(BarSpan { left: 180.0, right: 480.0 }));
        assert!(!a.delayed);
        let late = rows.iter().find(|r| r.lot.id == "late").unwrap();
        assert!(late.delayed);
        assert!(rows.iter().find(|r| r.lot.id == "undated-1").unwrap().bar.is_none());
    }

    #[test]
    fn test_drag_scenario_issues_single_update() {
        let mut view = view_with(sample());
        // Bar of "a" spans 180..480; press in the body
        assert!(view.pointer_down_on_bar("a", 350.0));
        assert!(view.pointer_move(510.0));

        let row = view.rows(today()).into_iter().find(|r| r.lot.id == "a").unwrap();
        assert_eq!(row.lot.dates(), Some((date(2025, 1, 18), date(2025, 2, 1))));
        assert!(row.dragging && row.provisional);
        // Snapshot untouched during the gesture
        assert_eq!(view.lots().iter().find(|l| l.id == "a").unwrap().start_date, Some(date(2025, 1, 10)));

        let command = view.pointer_up();
        assert_eq!(
            command,
            Some(StoreCommand::Update {
                id: "a".into(),
                patch: LotPatch {
                    start_date: Some(date(2025, 1, 18)),
                    end_date: Some(date(2025, 2, 1)),
                    status: None,
                },
            })
        );
        assert_eq!(view.pointer_up(), None);
        // Optimistic dates until the store answers
        assert_eq!(view.confirmed_lot("a").unwrap().start_date, Some(date(2025, 1, 18)));
    }

    #[test]
    fn test_release_without_intermediate_move_commits() {
        let mut view = view_with(sample());
        view.pointer_down_on_bar("a", 350.0);
        // Move and release land in the same frame
        let command = view.pointer_up_at(510.0);
        assert_eq!(
            command,
            Some(StoreCommand::Update {
                id: "a".into(),
                patch: LotPatch {
                    start_date: Some(date(2025, 1, 18)),
                    end_date: Some(date(2025, 2, 1)),
                    status: None,
                },
            })
        );
        assert_eq!(view.selected(), None);
    }

    #[test]
    fn test_release_in_place_selects() {
        let mut view = view_with(sample());
        view.pointer_down_on_bar("a", 350.0);
        view.pointer_move(510.0);
        assert_eq!(view.pointer_up_at(355.0), None);
        assert_eq!(view.selected(), Some("a"));
        assert!(!view.has_pending("a"));
    }

    #[test]
    fn test_second_press_ignored_by_default() {
        let mut view = view_with(sample());
        assert!(view.pointer_down_on_bar("a", 350.0));
        view.pointer_move(390.0);
        // "late" spans 100..300
        assert!(!view.pointer_down_on_bar("late", 200.0));
        assert_eq!(view.drag().active().map(|s| s.lot_id.as_str()), Some("a"));
    }

    #[test]
    fn test_second_press_restarts_on_other_bar() {
        let mut view = view_with(sample());
        view.apply_settings(TimelineSettings { second_press: SecondPressPolicy::Restart, ..settings() }).unwrap();
        view.pointer_down_on_bar("a", 350.0);
        view.pointer_move(390.0);

        assert!(view.pointer_down_on_bar("late", 200.0));
        assert_eq!(view.drag().active().map(|s| s.lot_id.as_str()), Some("late"));
        let a = view.rows(today()).into_iter().find(|r| r.lot.id == "a").unwrap();
        assert!(!a.provisional);

        let Some(StoreCommand::Update { id, patch }) = view.pointer_up_at(240.0) else {
            panic!("expected update");
        };
        assert_eq!(id, "late");
        assert_eq!(patch.start_date, Some(date(2025, 1, 8)));
        assert!(!view.has_pending("a"));
    }

    #[test]
    fn test_drag_then_leave_reverts() {
        let mut view = view_with(sample());
        view.pointer_down_on_bar("a", 350.0);
        view.pointer_move(700.0);
        assert!(view.pointer_leave());
        assert_eq!(view.pointer_up(), None);

        let row = view.rows(today()).into_iter().find(|r| r.lot.id == "a").unwrap();
        assert_eq!(row.lot.dates(), Some((date(2025, 1, 10), date(2025, 1, 24))));
        assert!(!row.provisional);
    }

    #[test]
    fn test_press_on_edges_resizes() {
        let mut view = view_with(sample());
        view.pointer_down_on_bar("a", 182.0);
        view.pointer_move(182.0 + 400.0);
        let Some(StoreCommand::Update { patch, .. }) = view.pointer_up() else {
            panic!("expected update");
        };
        // Clamped to the original end
        assert_eq!(patch.start_date, Some(date(2025, 1, 24)));
        assert_eq!(patch.end_date, None);
    }

    #[test]
    fn test_click_without_motion_selects() {
        let mut view = view_with(sample());
        view.pointer_down_on_bar("a", 300.0);
        assert_eq!(view.pointer_up(), None);
        assert_eq!(view.selected(), Some("a"));
    }

    #[test]
    fn test_quick_add_scenario() {
        let mut view = view_with(sample());
        // Mar 5 is day 63 of the window
        assert!(view.click_empty(63.0 * 20.0 + 4.0));
        let draft = view.quick_add().draft().unwrap();
        assert_eq!(draft.start_date, Some(date(2025, 3, 5)));
        assert_eq!(draft.end_date, Some(date(2025, 3, 19)));

        view.quick_add_mut().set_name("Scaffolding");
        let command = view.enter();
        assert!(matches!(
            command,
            Some(StoreCommand::Create(ref n))
                if n.name == "Scaffolding" && n.start_date == date(2025, 3, 5) && n.end_date == date(2025, 3, 19)
        ));
        assert!(!view.quick_add().is_open());
        assert_eq!(view.enter(), None);
    }

    #[test]
    fn test_escape_closes_draft() {
        let mut view = view_with(sample());
        view.click_empty(100.0);
        assert!(view.escape());
        assert!(!view.quick_add().is_open());
        assert!(!view.escape());
    }

    #[test]
    fn test_no_quick_add_while_dragging() {
        let mut view = view_with(sample());
        view.pointer_down_on_bar("a", 300.0);
        assert!(!view.click_empty(1000.0));
        assert!(!view.quick_add().is_open());
    }

    #[test]
    fn test_undated_row_places_existing_lot() {
        let mut view = view_with(sample());
        assert!(view.click_undated("undated-1", 40.0));
        let command = view.enter();
        assert_eq!(
            command,
            Some(StoreCommand::Update {
                id: "undated-1".into(),
                patch: LotPatch {
                    start_date: Some(date(2025, 1, 3)),
                    end_date: Some(date(2025, 1, 17)),
                    status: None,
                },
            })
        );
        assert!(view.has_pending("undated-1"));
    }

    #[test]
    fn test_failure_rolls_back_to_snapshot() {
        let mut view = view_with(sample());
        view.pointer_down_on_bar("a", 350.0);
        view.pointer_move(510.0);
        let command = view.pointer_up().unwrap();
        assert!(view.has_pending("a"));

        view.command_failed(&command);
        assert!(!view.has_pending("a"));
        assert_eq!(view.confirmed_lot("a").unwrap().start_date, Some(date(2025, 1, 10)));
    }

    #[test]
    fn test_failed_delete_keeps_pending_update() {
        let mut view = view_with(sample());
        view.pointer_down_on_bar("a", 350.0);
        view.pointer_move(510.0);
        view.pointer_up();

        view.command_failed(&StoreCommand::Delete { id: "a".into() });
        assert!(view.has_pending("a"));
        assert_eq!(view.confirmed_lot("a").unwrap().start_date, Some(date(2025, 1, 18)));
    }

    #[test]
    fn test_failed_update_keeps_newer_fields() {
        let mut view = view_with(sample());
        view.pointer_down_on_bar("a", 350.0);
        view.pointer_move(510.0);
        let moved = view.pointer_up().unwrap();
        let status = view.status_command("a", LotStatus::Completed).unwrap();

        // The status change fails; the move is still in flight
        view.command_failed(&status);
        let lot = view.confirmed_lot("a").unwrap();
        assert_eq!(lot.status, LotStatus::InProgress);
        assert_eq!(lot.start_date, Some(date(2025, 1, 18)));

        view.command_failed(&moved);
        assert!(!view.has_pending("a"));
    }

    #[test]
    fn test_success_replaces_snapshot_entry() {
        let mut view = view_with(sample());
        view.pointer_down_on_bar("a", 350.0);
        view.pointer_move(510.0);
        view.pointer_up();

        let mut stored = view.lots().iter().find(|l| l.id == "a").unwrap().clone();
        stored.start_date = Some(date(2025, 1, 18));
        stored.end_date = Some(date(2025, 2, 1));
        view.apply_outcome(CommandOutcome::Updated(stored));
        assert!(!view.has_pending("a"));
        assert_eq!(view.lots().iter().find(|l| l.id == "a").unwrap().end_date, Some(date(2025, 2, 1)));
    }

    #[test]
    fn test_stale_success_keeps_newer_pending() {
        let mut view = view_with(sample());
        let first = view.lots().iter().find(|l| l.id == "a").unwrap().clone();

        view.pointer_down_on_bar("a", 350.0);
        view.pointer_move(370.0);
        view.pointer_up();
        view.pointer_down_on_bar("a", 370.0);
        view.pointer_move(410.0);
        view.pointer_up();

        let mut echoed = first;
        echoed.start_date = Some(date(2025, 1, 11));
        echoed.end_date = Some(date(2025, 1, 25));
        view.apply_outcome(CommandOutcome::Updated(echoed));
        assert!(view.has_pending("a"));
        assert_eq!(view.confirmed_lot("a").unwrap().start_date, Some(date(2025, 1, 13)));
    }

    #[test]
    fn test_status_command() {
        let mut view = view_with(sample());
        assert_eq!(view.status_command("a", LotStatus::InProgress), None);
        let command = view.status_command("a", LotStatus::Completed);
        assert_eq!(
            command,
            Some(StoreCommand::Update { id: "a".into(), patch: LotPatch::status(LotStatus::Completed) })
        );
        assert_eq!(view.stats(today()).count(LotStatus::Completed), 2);
    }

    #[test]
    fn test_snapshot_refresh_drops_vanished_state() {
        let mut view = view_with(sample());
        view.select(Some("late".into()));
        view.pointer_down_on_bar("late", 700.0);
        view.set_snapshot(sample().into_iter().filter(|l| l.id != "late").collect());
        assert_eq!(view.selected(), None);
        assert!(!view.drag().is_dragging());
    }

    #[test]
    fn test_delete_and_create_outcomes() {
        let mut view = view_with(sample());
        view.select(Some("a".into()));
        let command = view.delete_command("a");
        assert_eq!(command, Some(StoreCommand::Delete { id: "a".into() }));
        view.apply_outcome(CommandOutcome::Deleted("a".into()));
        assert_eq!(view.lots().len(), 4);
        assert_eq!(view.selected(), None);

        let created = lot("new", Some(date(2025, 3, 1)), Some(date(2025, 3, 2)), LotStatus::NotStarted, 10);
        view.apply_outcome(CommandOutcome::Created(created));
        assert_eq!(view.selected(), Some("new"));
        assert_eq!(view.lots().len(), 5);
    }

    #[test]
    fn test_created_after_reload_is_not_duplicated() {
        let created = lot("n1", Some(date(2025, 3, 1)), Some(date(2025, 3, 14)), LotStatus::NotStarted, 0);
        let mut view = view_with(vec![created.clone()]);
        view.apply_outcome(CommandOutcome::Created(created));
        assert_eq!(view.lots().iter().filter(|l| l.id == "n1").count(), 1);
        assert_eq!(view.rows(today()).len(), 1);
        assert_eq!(view.selected(), Some("n1"));
    }

    #[test]
    fn test_month_navigation_moves_window() {
        let mut view = view_with(sample());
        view.next_month();
        assert_eq!(view.current_month(), date(2025, 3, 1));
        assert_eq!(view.index().visible_start(), date(2025, 2, 1));
        assert_eq!(view.index().visible_end(), date(2025, 5, 31));

        view.previous_month();
        view.previous_month();
        assert_eq!(view.index().visible_start(), date(2024, 12, 1));

        view.go_to_today(date(2025, 7, 20));
        assert_eq!(view.current_month(), date(2025, 7, 1));
    }

    #[test]
    fn test_day_width_must_be_positive() {
        let mut view = view_with(sample());
        assert!(view.set_day_width(0.0).is_err());
        assert_eq!(view.index().day_width(), 20.0);
        view.set_day_width(30.0).unwrap();
        assert_eq!(view.index().position_of(date(2025, 1, 2)), 30.0);
    }
}
