//! Pointer gesture state machine for moving and resizing lot bars.
//!
//! While a gesture runs, the proposed dates live in an overlay that only the
//! renderer sees. The store is touched once, on release.

use chrono::NaiveDate;

use super::index::shift;
use crate::api::{Lot, LotId, LotPatch, StoreCommand};
use crate::config::SecondPressPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Move,
    ResizeStart,
    ResizeEnd,
}

impl DragKind {
    /// Presses within `handle_band` pixels of a bar edge grab that edge.
    /// The left edge wins on bars too narrow to hold both bands.
    pub fn classify(press_x: f32, bar_left: f32, bar_right: f32, handle_band: f32) -> Self {
        if press_x - bar_left < handle_band {
            DragKind::ResizeStart
        } else if bar_right - press_x < handle_band {
            DragKind::ResizeEnd
        } else {
            DragKind::Move
        }
    }
}

/// Snapshot taken at pointer-down. Only `last_delta` changes afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct DragState {
    pub lot_id: LotId,
    pub kind: DragKind,
    pub anchor_x: f32,
    pub original_start: NaiveDate,
    pub original_end: NaiveDate,
    last_delta: i64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging(DragState),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub lot_id: LotId,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Candidate dates for a gesture of `kind` displaced by `delta_days`.
/// Resizes clamp at the opposite edge so the range never inverts.
pub fn propose(kind: DragKind, original_start: NaiveDate, original_end: NaiveDate, delta_days: i64) -> (NaiveDate, NaiveDate) {
    match kind {
        DragKind::Move => (shift(original_start, delta_days), shift(original_end, delta_days)),
        DragKind::ResizeStart => (shift(original_start, delta_days).min(original_end), original_end),
        DragKind::ResizeEnd => (original_start, shift(original_end, delta_days).max(original_start)),
    }
}

pub fn delta_days(pointer_x: f32, anchor_x: f32, day_width: f32) -> i64 {
    ((pointer_x - anchor_x) / day_width).round() as i64
}

#[derive(Debug)]
pub struct DragController {
    phase: DragPhase,
    overlay: Option<Overlay>,
    handle_band: f32,
    policy: SecondPressPolicy,
}

impl DragController {
    pub fn new(handle_band: f32, policy: SecondPressPolicy) -> Self {
        Self {
            phase: DragPhase::Idle,
            overlay: None,
            handle_band,
            policy,
        }
    }

    pub fn configure(&mut self, handle_band: f32, policy: SecondPressPolicy) {
        self.handle_band = handle_band;
        self.policy = policy;
    }

    pub fn handle_band(&self) -> f32 {
        self.handle_band
    }

    pub fn active(&self) -> Option<&DragState> {
        match &self.phase {
            DragPhase::Dragging(state) => Some(state),
            DragPhase::Idle => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, DragPhase::Dragging(_))
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn overlay_for(&self, lot_id: &str) -> Option<(NaiveDate, NaiveDate)> {
        self.overlay()
            .filter(|o| o.lot_id == lot_id)
            .map(|o| (o.start, o.end))
    }

    /// Start a gesture on `lot`. Returns false when nothing started: the lot
    /// has no bar, or another gesture holds the surface under `Ignore`.
    pub fn press(&mut self, lot: &Lot, kind: DragKind, pointer_x: f32) -> bool {
        if let DragPhase::Dragging(current) = &self.phase {
            match self.policy {
                SecondPressPolicy::Ignore => {
                    log::debug!("Ignoring press on {} while {} is dragged", lot.id, current.lot_id);
                    return false;
                }
                SecondPressPolicy::Restart => {
                    log::debug!("Restarting gesture: {} replaces {}", lot.id, current.lot_id);
                    self.cancel();
                }
            }
        }

        let Some((start, end)) = lot.dates() else {
            return false;
        };

        self.phase = DragPhase::Dragging(DragState {
            lot_id: lot.id.clone(),
            kind,
            anchor_x: pointer_x,
            original_start: start,
            original_end: end,
            last_delta: 0,
        });
        self.overlay = None;
        true
    }

    /// Recompute the overlay. Returns true only when the day offset changed,
    /// so callers can skip work for sub-day pointer motion.
    pub fn pointer_move(&mut self, pointer_x: f32, day_width: f32) -> bool {
        let DragPhase::Dragging(state) = &mut self.phase else {
            return false;
        };
        if !day_width.is_finite() || day_width <= 0.0 {
            return false;
        }

        let delta = delta_days(pointer_x, state.anchor_x, day_width);
        if delta == state.last_delta {
            return false;
        }
        state.last_delta = delta;

        if delta == 0 {
            // Back where it started: nothing to commit
            self.overlay = None;
            return true;
        }

        let (start, end) = propose(state.kind, state.original_start, state.original_end, delta);
        self.overlay = Some(Overlay {
            lot_id: state.lot_id.clone(),
            start,
            end,
        });
        true
    }

    /// End the gesture. Yields the single update for it when the dates moved.
    pub fn release(&mut self) -> Option<StoreCommand> {
        let phase = std::mem::take(&mut self.phase);
        let overlay = self.overlay.take();
        let DragPhase::Dragging(state) = phase else {
            return None;
        };
        let overlay = overlay.filter(|o| o.lot_id == state.lot_id)?;

        let patch = LotPatch {
            start_date: (overlay.start != state.original_start).then_some(overlay.start),
            end_date: (overlay.end != state.original_end).then_some(overlay.end),
            status: None,
        };
        if patch.is_empty() {
            return None;
        }

        log::info!(
            "Committing {:?} of lot {}: {} - {}",
            state.kind, state.lot_id, overlay.start, overlay.end
        );
        Some(StoreCommand::Update {
            id: state.lot_id,
            patch,
        })
    }

    /// Pointer left the surface: throw the gesture away. Returns whether
    /// there was one.
    pub fn cancel(&mut self) -> bool {
        let was_dragging = self.is_dragging();
        if was_dragging {
            log::debug!("Discarding drag gesture");
        }
        self.phase = DragPhase::Idle;
        self.overlay = None;
        was_dragging
    }

    /// The lot vanished from the snapshot mid-gesture
    pub fn forget(&mut self, lot_id: &str) {
        if self.active().is_some_and(|s| s.lot_id == lot_id) {
            self.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::LotStatus;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lot(id: &str, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Lot {
        Lot {
            id: id.into(),
            name: id.to_uppercase(),
            start_date: start,
            end_date: end,
            status: LotStatus::InProgress,
            color: None,
            sort_order: 0,
            company_id: None,
            project_id: None,
        }
    }

    fn controller() -> DragController {
        DragController::new(8.0, SecondPressPolicy::Ignore)
    }

    #[test]
    fn test_classify_edges() {
        assert_eq!(DragKind::classify(102.0, 100.0, 200.0, 8.0), DragKind::ResizeStart);
        assert_eq!(DragKind::classify(195.0, 100.0, 200.0, 8.0), DragKind::ResizeEnd);
        assert_eq!(DragKind::classify(150.0, 100.0, 200.0, 8.0), DragKind::Move);
        assert_eq!(DragKind::classify(108.0, 100.0, 200.0, 8.0), DragKind::Move);
        // 10px bar: left band takes precedence
        assert_eq!(DragKind::classify(105.0, 100.0, 110.0, 8.0), DragKind::ResizeStart);
    }

    #[test]
    fn test_move_preserves_duration() {
        let (s, e) = (date(2025, 1, 10), date(2025, 1, 24));
        for delta in [-400, -31, -1, 1, 8, 29, 365] {
            let (ns, ne) = propose(DragKind::Move, s, e, delta);
            assert_eq!(ne - ns, e - s, "delta {}", delta);
        }
    }

    #[test]
    fn test_resize_start_never_passes_end() {
        let (s, e) = (date(2025, 1, 10), date(2025, 1, 24));
        for delta in [1, 14, 15, 100, 10_000, i64::MAX] {
            let (ns, ne) = propose(DragKind::ResizeStart, s, e, delta);
            assert!(ns <= e);
            assert_eq!(ne, e);
        }
        assert_eq!(propose(DragKind::ResizeStart, s, e, 100).0, e);
        assert_eq!(propose(DragKind::ResizeStart, s, e, -3).0, date(2025, 1, 7));
    }

    #[test]
    fn test_resize_end_never_passes_start() {
        let (s, e) = (date(2025, 1, 10), date(2025, 1, 24));
        for delta in [-1, -14, -15, -100, i64::MIN] {
            let (ns, ne) = propose(DragKind::ResizeEnd, s, e, delta);
            assert!(ne >= s);
            assert_eq!(ns, s);
        }
    }

    #[test]
    fn test_move_gesture_commits_once_with_both_dates() {
        let mut drag = controller();
        let l = lot("a", Some(date(2025, 1, 10)), Some(date(2025, 1, 24)));
        assert!(drag.press(&l, DragKind::Move, 350.0));

        assert!(drag.pointer_move(430.0, 20.0));
        assert!(drag.pointer_move(510.0, 20.0));
        // Same day offset, no recomputation
        assert!(!drag.pointer_move(512.0, 20.0));
        assert_eq!(drag.overlay_for("a"), Some((date(2025, 1, 18), date(2025, 2, 1))));

        let command = drag.release();
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
        assert!(!drag.is_dragging());
        assert!(drag.overlay().is_none());
        assert_eq!(drag.release(), None);
    }

    #[test]
    fn test_resize_commit_only_sends_changed_edge() {
        let mut drag = controller();
        let l = lot("a", Some(date(2025, 1, 10)), Some(date(2025, 1, 24)));
        drag.press(&l, DragKind::ResizeEnd, 480.0);
        drag.pointer_move(540.0, 20.0);
        let Some(StoreCommand::Update { patch, .. }) = drag.release() else {
            panic!("expected an update");
        };
        assert_eq!(patch.start_date, None);
        assert_eq!(patch.end_date, Some(date(2025, 1, 27)));
    }

    #[test]
    fn test_leave_discards_without_command() {
        let mut drag = controller();
        let l = lot("a", Some(date(2025, 1, 10)), Some(date(2025, 1, 24)));
        drag.press(&l, DragKind::Move, 350.0);
        drag.pointer_move(600.0, 20.0);
        assert!(drag.overlay_for("a").is_some());

        assert!(drag.cancel());
        assert!(drag.overlay_for("a").is_none());
        assert_eq!(drag.release(), None);
    }

    #[test]
    fn test_returning_to_anchor_clears_overlay() {
        let mut drag = controller();
        let l = lot("a", Some(date(2025, 1, 10)), Some(date(2025, 1, 24)));
        drag.press(&l, DragKind::Move, 100.0);
        drag.pointer_move(160.0, 20.0);
        assert!(drag.overlay().is_some());
        assert!(drag.pointer_move(101.0, 20.0));
        assert!(drag.overlay().is_none());
        assert_eq!(drag.release(), None);
    }

    #[test]
    fn test_clamped_resize_without_change_commits_nothing() {
        let mut drag = controller();
        let day = date(2025, 1, 10);
        let l = lot("a", Some(day), Some(day));
        drag.press(&l, DragKind::ResizeStart, 180.0);
        drag.pointer_move(400.0, 20.0);
        assert_eq!(drag.overlay_for("a"), Some((day, day)));
        assert_eq!(drag.release(), None);
    }

    #[test]
    fn test_second_press_ignored_by_default() {
        let mut drag = controller();
        let a = lot("a", Some(date(2025, 1, 10)), Some(date(2025, 1, 24)));
        let b = lot("b", Some(date(2025, 2, 1)), Some(date(2025, 2, 5)));
        assert!(drag.press(&a, DragKind::Move, 100.0));
        drag.pointer_move(140.0, 20.0);
        assert!(!drag.press(&b, DragKind::Move, 300.0));
        assert_eq!(drag.active().map(|s| s.lot_id.as_str()), Some("a"));
        assert!(drag.overlay_for("a").is_some());
    }

    #[test]
    fn test_second_press_restarts_when_configured() {
        let mut drag = DragController::new(8.0, SecondPressPolicy::Restart);
        let a = lot("a", Some(date(2025, 1, 10)), Some(date(2025, 1, 24)));
        let b = lot("b", Some(date(2025, 2, 1)), Some(date(2025, 2, 5)));
        drag.press(&a, DragKind::Move, 100.0);
        drag.pointer_move(140.0, 20.0);
        assert!(drag.press(&b, DragKind::Move, 300.0));
        assert_eq!(drag.active().map(|s| s.lot_id.as_str()), Some("b"));
        assert!(drag.overlay().is_none());
    }

    #[test]
    fn test_undated_lot_cannot_be_dragged() {
        let mut drag = controller();
        assert!(!drag.press(&lot("a", Some(date(2025, 1, 10)), None), DragKind::Move, 0.0));
        assert!(!drag.press(&lot("b", None, None), DragKind::Move, 0.0));
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_forget_only_cancels_matching_lot() {
        let mut drag = controller();
        let a = lot("a", Some(date(2025, 1, 10)), Some(date(2025, 1, 24)));
        drag.press(&a, DragKind::Move, 0.0);
        drag.forget("b");
        assert!(drag.is_dragging());
        drag.forget("a");
        assert!(!drag.is_dragging());
    }
}
