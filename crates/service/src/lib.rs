//! Service layer persisting leads into a single key-value slot.
//! - `storage` abstracts the key-value backend the slot lives in.
//! - `leads` implements read/append/reporting on top of it.
//! - `runtime` wires a store from configuration.

pub mod errors;
pub mod storage;
pub mod leads;
pub mod runtime;

pub use leads::{LeadStore, DEFAULT_LEADS_KEY};
