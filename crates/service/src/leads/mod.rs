//! Lead persistence and monthly reporting.

pub mod migration;
pub mod store;

pub use migration::{MigrationOutcome, CURRENT_SCHEMA_VERSION};
pub use store::{LeadStore, DEFAULT_LEADS_KEY};
