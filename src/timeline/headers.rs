//! Month and ISO-week header runs over the visible days.

use chrono::{Datelike, NaiveDate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthRun {
    pub start_index: usize,
    pub day_count: usize,
    pub year: i32,
    pub month: u32,
}

impl MonthRun {
    pub fn label(&self) -> String {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekRun {
    pub start_index: usize,
    pub day_count: usize,
    pub iso_year: i32,
    pub week: u32,
    pub contains_today: bool,
}

/// Split consecutive days into runs sharing the same key
fn runs_by<K: PartialEq>(days: &[NaiveDate], key: impl Fn(NaiveDate) -> K) -> Vec<(usize, usize, K)> {
    let mut runs: Vec<(usize, usize, K)> = Vec::new();
    for (i, day) in days.iter().enumerate() {
        let k = key(*day);
        if let Some((_, count, last)) = runs.last_mut() {
            if *last == k {
                *count += 1;
                continue;
            }
        }
        runs.push((i, 1, k));
    }
    runs
}

pub fn month_runs(days: &[NaiveDate]) -> Vec<MonthRun> {
    runs_by(days, |d| (d.year(), d.month()))
        .into_iter()
        .map(|(start_index, day_count, (year, month))| MonthRun {
            start_index,
            day_count,
            year,
            month,
        })
        .collect()
}

/// Weeks start on Monday; partial weeks at either edge are their own run
pub fn week_runs(days: &[NaiveDate], today: NaiveDate) -> Vec<WeekRun> {
    runs_by(days, |d| {
        let iso = d.iso_week();
        (iso.year(), iso.week())
    })
    .into_iter()
    .map(|(start_index, day_count, (iso_year, week))| WeekRun {
        start_index,
        day_count,
        iso_year,
        week,
        contains_today: days[start_index..start_index + day_count].contains(&today),
    })
    .collect()
}
