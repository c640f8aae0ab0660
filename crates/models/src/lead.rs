use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::errors::ModelError;

/// A captured form submission.
///
/// Property names on the wire are camelCase (`fullName`, `submittedAt`, ...).
/// Reads are lenient: missing properties fall back to empty strings, numbers
/// and booleans are taken as their text, and properties this type does not
/// know are kept in `extra` and written back unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Lead {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub full_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub phone_number: String,
    #[serde(deserialize_with = "lenient_string")]
    pub property_type: String,
    #[serde(deserialize_with = "lenient_string")]
    pub budget: String,
    #[serde(deserialize_with = "lenient_string")]
    pub city: String,
    #[serde(deserialize_with = "lenient_string")]
    pub preference: String,
    #[serde(deserialize_with = "lenient_string")]
    pub submitted_at: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Any JSON value as text: `null` is empty, strings are taken verbatim and
/// everything else is its JSON rendering.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Form input for a new lead; everything except `id` and `submittedAt`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewLead {
    pub full_name: String,
    pub phone_number: String,
    pub property_type: String,
    pub budget: String,
    pub city: String,
    pub preference: String,
}

impl NewLead {
    /// Build the stored record for a submission made at `at`.
    ///
    /// The id is the millisecond epoch of `at`, so two leads created within the
    /// same millisecond share an id.
    pub fn into_lead(self, at: DateTime<Utc>) -> Lead {
        Lead {
            id: at.timestamp_millis().to_string(),
            full_name: self.full_name,
            phone_number: self.phone_number,
            property_type: self.property_type,
            budget: self.budget,
            city: self.city,
            preference: self.preference,
            submitted_at: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            extra: Map::new(),
        }
    }

    /// Presence check only: every field must be non-blank.
    pub fn validate(&self) -> Result<(), ModelError> {
        let fields = [
            ("fullName", &self.full_name),
            ("phoneNumber", &self.phone_number),
            ("propertyType", &self.property_type),
            ("budget", &self.budget),
            ("city", &self.city),
            ("preference", &self.preference),
        ];
        match fields.iter().find(|(_, v)| v.trim().is_empty()) {
            Some((name, _)) => Err(ModelError::Validation(format!("{name} required"))),
            None => Ok(()),
        }
    }

    /// Set a field by its wire name; returns `false` for an unknown name.
    pub fn set_field(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "fullName" => &mut self.full_name,
            "phoneNumber" => &mut self.phone_number,
            "propertyType" => &mut self.property_type,
            "budget" => &mut self.budget,
            "city" => &mut self.city,
            "preference" => &mut self.preference,
            _ => return false,
        };
        *slot = value;
        true
    }
}
