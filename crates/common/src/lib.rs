//! Shared runtime helpers: logging setup and data-directory checks.

pub mod utils;
pub mod env;
