//! In-memory lot store used in demo mode, so the planner can be tried
//! without a backend.

use chrono::{Duration, NaiveDate};

use super::error::StoreError;
use super::types::*;

pub struct DemoStore {
    lots: Vec<Lot>,
    companies: Vec<Company>,
    next_id: u32,
}

impl DemoStore {
    pub fn empty() -> Self {
        Self {
            lots: Vec::new(),
            companies: Vec::new(),
            next_id: 1,
        }
    }

    /// A small house build laid out around `today`
    pub fn seeded(today: NaiveDate) -> Self {
        let mut store = Self::empty();
        store.companies = vec![
            Company { id: "c1".into(), name: "Durand Terrassement".into() },
            Company { id: "c2".into(), name: "Maçonnerie Petit".into() },
            Company { id: "c3".into(), name: "Elec Services".into() },
            Company { id: "c4".into(), name: "Plomberie Moreau".into() },
        ];

        let d = |offset: i64| Some(today + Duration::days(offset));
        let seed: [(&str, Option<NaiveDate>, Option<NaiveDate>, LotStatus, &str); 7] = [
            ("Earthworks", d(-40), d(-26), LotStatus::Completed, "c1"),
            ("Foundations", d(-25), d(-4), LotStatus::InProgress, "c2"),
            ("Structural walls", d(-5), d(20), LotStatus::InProgress, "c2"),
            ("Plumbing rough-in", d(10), d(24), LotStatus::NotStarted, "c4"),
            ("Electrical", d(14), d(35), LotStatus::NotStarted, "c3"),
            ("Roofing", None, None, LotStatus::NotStarted, ""),
            ("Finishes", None, None, LotStatus::OnHold, ""),
        ];

        for (order, (name, start, end, status, company)) in seed.into_iter().enumerate() {
            let id = store.allocate_id();
            store.lots.push(Lot {
                id,
                name: name.to_string(),
                start_date: start,
                end_date: end,
                status,
                color: None,
                sort_order: order as i32,
                company_id: (!company.is_empty()).then(|| company.to_string()),
                project_id: None,
            });
        }
        store
    }

    fn allocate_id(&mut self) -> LotId {
        let id = format!("demo-{}", self.next_id);
        self.next_id += 1;
        id
    }

    pub fn lots(&self) -> Vec<Lot> {
        self.lots.clone()
    }

    pub fn companies(&self) -> Vec<Company> {
        self.companies.clone()
    }

    pub fn update_lot(&mut self, id: &str, patch: &LotPatch) -> Result<Lot, StoreError> {
        let lot = self.lots.iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| StoreError::LotNotFound(id.to_string()))?;
        lot.apply(patch);
        Ok(lot.clone())
    }

    pub fn create_lot(&mut self, new_lot: &NewLot) -> Lot {
        let sort_order = self.lots.iter().map(|l| l.sort_order).max().unwrap_or(-1) + 1;
        let lot = Lot {
            id: self.allocate_id(),
            name: new_lot.name.clone(),
            start_date: Some(new_lot.start_date),
            end_date: Some(new_lot.end_date),
            status: LotStatus::NotStarted,
            color: None,
            sort_order,
            company_id: None,
            project_id: new_lot.project_id.clone(),
        };
        self.lots.push(lot.clone());
        lot
    }

    pub fn delete_lot(&mut self, id: &str) -> Result<(), StoreError> {
        let before = self.lots.len();
        self.lots.retain(|l| l.id != id);
        if self.lots.len() == before {
            return Err(StoreError::LotNotFound(id.to_string()));
        }
        Ok(())
    }
}
