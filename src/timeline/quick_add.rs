//! Inline "click the timeline to add a lot" draft.

use chrono::NaiveDate;

use super::index::shift;
use crate::api::{Lot, LotId, LotPatch, NewLot, StoreCommand};

#[derive(Debug, Clone, PartialEq)]
pub struct QuickAddDraft {
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Set when the draft places an existing undated lot instead of
    /// creating a new one
    pub target: Option<LotId>,
}

impl QuickAddDraft {
    fn normalize(&mut self) {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                self.start_date = Some(end);
                self.end_date = Some(start);
            }
        }
    }
}

#[derive(Debug)]
pub struct QuickAddController {
    draft: Option<QuickAddDraft>,
    default_days: i64,
}

impl QuickAddController {
    pub fn new(default_days: i64) -> Self {
        Self {
            draft: None,
            default_days: default_days.max(0),
        }
    }

    pub fn set_default_days(&mut self, days: i64) {
        self.default_days = days.max(0);
    }

    pub fn is_open(&self) -> bool {
        self.draft.is_some()
    }

    pub fn draft(&self) -> Option<&QuickAddDraft> {
        self.draft.as_ref()
    }

    /// Seed a fresh draft at `at`. Any draft already open is dropped; it was
    /// never persisted, so nothing is lost.
    pub fn open(&mut self, at: NaiveDate) {
        self.draft = Some(QuickAddDraft {
            name: String::new(),
            start_date: Some(at),
            end_date: Some(shift(at, self.default_days)),
            target: None,
        });
    }

    /// Like `open`, pre-filled from an undated lot and bound to it
    pub fn open_for_lot(&mut self, lot: &Lot, at: NaiveDate) {
        self.open(at);
        if let Some(draft) = self.draft.as_mut() {
            draft.name = lot.name.clone();
            draft.target = Some(lot.id.clone());
        }
    }

    pub fn set_name(&mut self, name: &str) {
        if let Some(draft) = self.draft.as_mut() {
            draft.name = name.to_string();
        }
    }

    pub fn set_start_date(&mut self, date: Option<NaiveDate>) {
        if let Some(draft) = self.draft.as_mut() {
            draft.start_date = date;
            draft.normalize();
        }
    }

    pub fn set_end_date(&mut self, date: Option<NaiveDate>) {
        if let Some(draft) = self.draft.as_mut() {
            draft.end_date = date;
            draft.normalize();
        }
    }

    pub fn can_submit(&self) -> bool {
        self.draft.as_ref().is_some_and(|d| {
            !d.name.trim().is_empty() && d.start_date.is_some() && d.end_date.is_some()
        })
    }

    /// Turn the draft into its store command and close it. A draft that is
    /// not ready stays open and nothing is emitted.
    pub fn submit(&mut self) -> Option<StoreCommand> {
        if !self.can_submit() {
            return None;
        }
        let draft = self.draft.take()?;
        let (start, end) = (draft.start_date?, draft.end_date?);
        let (start, end) = (start.min(end), start.max(end));

        let command = match draft.target {
            Some(id) => {
                log::info!("Placing lot {} at {} - {}", id, start, end);
                StoreCommand::Update {
                    id,
                    patch: LotPatch {
                        start_date: Some(start),
                        end_date: Some(end),
                        status: None,
                    },
                }
            }
            None => {
                let name = draft.name.trim().to_string();
                log::info!("Creating lot {:?} at {} - {}", name, start, end);
                StoreCommand::Create(NewLot {
                    name,
                    start_date: start,
                    end_date: end,
                    project_id: None,
                })
            }
        };
        Some(command)
    }

    pub fn cancel(&mut self) {
        self.draft = None;
    }

    /// The targeted lot disappeared from the snapshot
    pub fn forget(&mut self, lot_id: &str) {
        if self.draft.as_ref().and_then(|d| d.target.as_deref()) == Some(lot_id) {
            self.draft = None;
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

    #[test]
    fn test_open_seeds_default_duration() {
        let mut quick = QuickAddController::new(14);
        quick.open(date(2025, 3, 5));
        let draft = quick.draft().unwrap();
        assert_eq!(draft.name, "");
        assert_eq!(draft.start_date, Some(date(2025, 3, 5)));
        assert_eq!(draft.end_date, Some(date(2025, 3, 19)));
        assert!(!quick.can_submit());
    }

    #[test]
    fn test_submit_creates_and_closes() {
        let mut quick = QuickAddController::new(14);
        quick.open(date(2025, 3, 5));
        quick.set_name("  Tiling ");
        let command = quick.submit();
        assert_eq!(
            command,
            Some(StoreCommand::Create(NewLot {
                name: "Tiling".into(),
                start_date: date(2025, 3, 5),
                end_date: date(2025, 3, 19),
                project_id: None,
            }))
        );
        assert!(!quick.is_open());
        assert_eq!(quick.submit(), None);
    }

    #[test]
    fn test_submit_requires_name_and_dates() {
        let mut quick = QuickAddController::new(14);
        quick.open(date(2025, 3, 5));
        quick.set_name("   ");
        assert_eq!(quick.submit(), None);
        assert!(quick.is_open());

        quick.set_name("Tiling");
        quick.set_end_date(None);
        assert!(!quick.can_submit());
        assert_eq!(quick.submit(), None);
    }

    #[test]
    fn test_inverted_dates_are_swapped() {
        let mut quick = QuickAddController::new(14);
        quick.open(date(2025, 3, 5));
        quick.set_end_date(Some(date(2025, 3, 1)));
        let draft = quick.draft().unwrap();
        assert_eq!(draft.start_date, Some(date(2025, 3, 1)));
        assert_eq!(draft.end_date, Some(date(2025, 3, 5)));

        quick.set_start_date(Some(date(2025, 4, 1)));
        let draft = quick.draft().unwrap();
        assert_eq!(draft.start_date, Some(date(2025, 3, 5)));
        assert_eq!(draft.end_date, Some(date(2025, 4, 1)));
    }

    #[test]
    fn test_second_open_replaces_draft() {
        let mut quick = QuickAddController::new(7);
        quick.open(date(2025, 3, 5));
        quick.set_name("First");
        quick.open(date(2025, 4, 1));
        let draft = quick.draft().unwrap();
        assert_eq!(draft.name, "");
        assert_eq!(draft.end_date, Some(date(2025, 4, 8)));
    }

    #[test]
    fn test_cancel_emits_nothing() {
        let mut quick = QuickAddController::new(14);
        quick.open(date(2025, 3, 5));
        quick.set_name("Tiling");
        quick.cancel();
        assert!(!quick.is_open());
        assert_eq!(quick.submit(), None);
    }

    #[test]
    fn test_targeted_draft_places_existing_lot() {
        let lot = Lot {
            id: "l9".into(),
            name: "Roofing".into(),
            start_date: None,
            end_date: None,
            status: LotStatus::NotStarted,
            color: None,
            sort_order: 4,
            company_id: None,
            project_id: None,
        };
        let mut quick = QuickAddController::new(14);
        quick.open_for_lot(&lot, date(2025, 5, 1));
        assert_eq!(quick.draft().unwrap().name, "Roofing");

        let command = quick.submit();
        assert_eq!(
            command,
            Some(StoreCommand::Update {
                id: "l9".into(),
                patch: LotPatch {
                    start_date: Some(date(2025, 5, 1)),
                    end_date: Some(date(2025, 5, 15)),
                    status: None,
                },
            })
        );

        quick.open_for_lot(&lot, date(2025, 5, 1));
        quick.forget("other");
        assert!(quick.is_open());
        quick.forget("l9");
        assert!(!quick.is_open());
    }
}
