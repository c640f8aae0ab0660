//! Data model for captured leads.
//! - `lead` holds the persisted record and the form input it is built from.
//! - `month` buckets submission timestamps into calendar months.

pub mod errors;
pub mod lead;
pub mod month;
