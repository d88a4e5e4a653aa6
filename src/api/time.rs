//! Date parsing and formatting for backend payloads and user input

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer};

/// Parse a backend date that may come as "2025-01-10" or as a full timestamp
/// like "2025-01-10T00:00:00+00:00". Only the calendar day is kept.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.trim().split(['T', ' ']).next().unwrap_or(raw);
    match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(e) => {
            log::debug!("Unparseable date {:?}: {}", raw, e);
            None
        }
    }
}

/// Serde adapter for nullable date columns. Empty strings and garbage read as
/// `None` rather than failing the whole snapshot.
pub fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_date))
}

/// Parse a date typed by the user.
///
/// Accepts "2025-03-05", "5/3/2025" or "05/03/2025" (day first), and "5/3"
/// which is resolved against `reference_year`.
pub fn parse_user_date(input: &str, reference_year: i32) -> Option<NaiveDate> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(date);
    }

    let parts: Vec<&str> = input.split(['/', '.']).collect();
    let day = parts.first()?.trim().parse::<u32>().ok()?;
    let month = parts.get(1)?.trim().parse::<u32>().ok()?;
    let year = match parts.get(2) {
        Some(y) => {
            let y = y.trim().parse::<i32>().ok()?;
            if y < 100 { 2000 + y } else { y }
        }
        None => reference_year,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// "2025-03-05" form used in text fields
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Short label for bars and tooltips, e.g. "5 Mar"
pub fn format_short(date: NaiveDate) -> String {
    format!("{} {}", date.day(), date.format("%b"))
}
