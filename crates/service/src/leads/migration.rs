//! Schema check for the lead slot.
//!
//! The slot's schema version is kept in a sibling key. Slots written before
//! the marker existed are classified structurally: an array whose first
//! element carries `name` without `fullName` is the legacy shape and is
//! discarded.

use serde_json::Value;
use tracing::{info, warn};

use crate::errors::ServiceError;
use crate::storage::KvBackend;

/// Version written alongside every slot this crate persists.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;
/// The `name`/`eventDate` form that predates `fullName`.
pub const LEGACY_SCHEMA_VERSION: u32 = 1;

/// What a migration pass did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Marker already current, or nothing stored yet.
    UpToDate,
    /// Unversioned slot in the current shape; marker written.
    Stamped,
    /// Legacy slot removed and marker written.
    Cleared,
    /// Marker is newer than this build understands; slot left alone.
    NewerVersion(u32),
}

pub fn version_key(slot_key: &str) -> String {
    format!("{slot_key}.schema_version")
}

/// Whether `raw` is a non-empty array whose first element has a truthy `name`
/// and no truthy `fullName`.
pub fn is_legacy_shape(raw: &str) -> Result<bool, serde_json::Error> {
    let data: Value = serde_json::from_str(raw)?;
    let legacy = match data.as_array().and_then(|items| items.first()) {
        Some(first) => truthy(first.get("name")) && !truthy(first.get("fullName")),
        None => false,
    };
    Ok(legacy)
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Write the current version marker for `slot_key`.
pub async fn stamp(backend: &dyn KvBackend, slot_key: &str) -> Result<(), ServiceError> {
    backend
        .set_item(&version_key(slot_key), CURRENT_SCHEMA_VERSION.to_string())
        .await
}

async fn read_marker(backend: &dyn KvBackend, slot_key: &str) -> Result<Option<u32>, ServiceError> {
    let key = version_key(slot_key);
    let Some(raw) = backend.get_item(&key).await? else {
        return Ok(None);
    };
    match raw.trim().parse::<u32>() {
        Ok(v) => Ok(Some(v)),
        Err(e) => {
            warn!(%key, value = %raw, error = %e, "unreadable schema marker; falling back to shape check");
            Ok(None)
        }
    }
}

/// Bring the slot to the current schema. Destructive for legacy data.
///
/// Errors are returned as-is; callers on the read path log and drop them.
pub async fn migrate(backend: &dyn KvBackend, slot_key: &str) -> Result<MigrationOutcome, ServiceError> {
    match read_marker(backend, slot_key).await? {
        Some(v) if v == CURRENT_SCHEMA_VERSION => return Ok(MigrationOutcome::UpToDate),
        Some(v) if v > CURRENT_SCHEMA_VERSION => {
            warn!(key = %slot_key, version = v, "slot written by a newer schema; leaving it untouched");
            return Ok(MigrationOutcome::NewerVersion(v));
        }
        Some(v) => {
            backend.remove_item(slot_key).await?;
            stamp(backend, slot_key).await?;
            info!(event = "leads_migrated", key = %slot_key, from = v, "cleared lead slot with outdated schema");
            return Ok(MigrationOutcome::Cleared);
        }
        None => {}
    }

    let Some(raw) = backend.get_item(slot_key).await? else {
        return Ok(MigrationOutcome::UpToDate);
    };
    if is_legacy_shape(&raw)? {
        backend.remove_item(slot_key).await?;
        stamp(backend, slot_key).await?;
        info!(event = "leads_migrated", key = %slot_key, from = LEGACY_SCHEMA_VERSION, "cleared lead slot in legacy shape");
        Ok(MigrationOutcome::Cleared)
    } else {
        stamp(backend, slot_key).await?;
        Ok(MigrationOutcome::Stamped)
    }
}
