//! Calendar-month bucketing of submission timestamps.
//!
//! All bucketing is done in UTC so a slot reads the same regardless of the
//! host timezone.

use chrono::{DateTime, Datelike, Utc};

use crate::lead::Lead;

/// Parse a lead's `submittedAt` as RFC 3339, normalised to UTC.
pub fn submitted_at(lead: &Lead) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&lead.submitted_at)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `"YYYY-MM"` for a zero-based month.
pub fn month_key(year: i32, month0: u32) -> String {
    format!("{:04}-{:02}", year, month0 + 1)
}

/// Bucket key for a lead, or `None` when its timestamp does not parse.
pub fn lead_month_key(lead: &Lead) -> Option<String> {
    submitted_at(lead).map(|dt| month_key(dt.year(), dt.month0()))
}

/// Whether the lead was submitted in zero-based `month0` of `year`.
pub fn in_month(lead: &Lead, month0: u32, year: i32) -> bool {
    submitted_at(lead).is_some_and(|dt| dt.month0() == month0 && dt.year() == year)
}
