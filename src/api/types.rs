use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::time::lenient_date;

pub type LotId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LotStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    OnHold,
    Cancelled,
}

impl LotStatus {
    pub const ALL: [LotStatus; 5] = [
        LotStatus::NotStarted,
        LotStatus::InProgress,
        LotStatus::Completed,
        LotStatus::OnHold,
        LotStatus::Cancelled,
    ];

    pub fn label(self) -> &'static str {
        match self {
            LotStatus::NotStarted => "Not started",
            LotStatus::InProgress => "In progress",
            LotStatus::Completed => "Completed",
            LotStatus::OnHold => "On hold",
            LotStatus::Cancelled => "Cancelled",
        }
    }
}

/// A work package on the construction schedule.
///
/// Dates are independently optional: the backend happily stores a lot with
/// only one of them, so nothing here assumes they come in pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    pub id: LotId,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: LotStatus,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl Lot {
    /// Both dates, when the lot can be drawn as a bar
    pub fn dates(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.start_date?, self.end_date?))
    }

    pub fn apply(&mut self, patch: &LotPatch) {
        if let Some(start) = patch.start_date {
            self.start_date = Some(start);
        }
        if let Some(end) = patch.end_date {
            self.end_date = Some(end);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }
}

/// Partial update sent to the store. Unset fields are left out of the
/// request body entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LotPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LotStatus>,
}

impl LotPatch {
    pub fn status(status: LotStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none() && self.status.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewLot {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
}

/// A persistence request produced by the timeline controllers.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCommand {
    Update { id: LotId, patch: LotPatch },
    Create(NewLot),
    Delete { id: LotId },
}

/// What the store handed back after a command went through
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Updated(Lot),
    Created(Lot),
    Deleted(LotId),
}
