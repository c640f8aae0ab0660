use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use serde_json::Value;
use models::{lead::{Lead, NewLead}, month};
use tracing::{debug, error, info, warn};

use crate::errors::ServiceError;
use crate::leads::migration::{self, MigrationOutcome};
use crate::storage::KvBackend;

pub use configs::DEFAULT_LEADS_KEY;

/// All leads, kept as one JSON array under a single storage key.
///
/// A store built with [`LeadStore::detached`] has no storage capability:
/// reads come back empty and appends hand back the lead without keeping it.
///
/// `append` is a read-modify-write with no lock around it. Two stores sharing
/// a backend can lose each other's appends; the last write wins.
#[derive(Clone)]
pub struct LeadStore {
    backend: Option<Arc<dyn KvBackend>>,
    key: String,
}

impl LeadStore {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self::with_key(backend, DEFAULT_LEADS_KEY)
    }

    pub fn with_key(backend: Arc<dyn KvBackend>, key: impl Into<String>) -> Self {
        Self { backend: Some(backend), key: key.into() }
    }

    /// A store with no backing storage.
    pub fn detached() -> Self {
        Self { backend: None, key: DEFAULT_LEADS_KEY.to_string() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_persistent(&self) -> bool {
        self.backend.is_some()
    }

    /// Run the schema check on the slot. Failures are logged and swallowed.
    pub async fn migrate(&self) -> Option<MigrationOutcome> {
        let backend = self.backend.as_deref()?;
        match migration::migrate(backend, &self.key).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(key = %self.key, error = %e, "lead migration check failed");
                None
            }
        }
    }

    /// Every stored lead in insertion order. Never fails: storage or parse
    /// errors are logged and read as an empty list.
    pub async fn read_all(&self) -> Vec<Lead> {
        let Some(backend) = self.backend.as_deref() else {
            return Vec::new();
        };
        self.migrate().await;

        self.load_items(backend)
            .await
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| match serde_json::from_value::<Lead>(item) {
                Ok(lead) => Some(lead),
                Err(e) => {
                    warn!(key = %self.key, index, error = %e, "skipping stored entry that is not a lead object");
                    None
                }
            })
            .collect()
    }

    /// The slot's array elements exactly as stored.
    async fn load_items(&self, backend: &dyn KvBackend) -> Vec<Value> {
        let raw = match backend.get_item(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                error!(key = %self.key, error = %e, "error reading leads");
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(items) => items,
            Err(e) => {
                error!(key = %self.key, error = %e, "error parsing stored leads");
                Vec::new()
            }
        }
    }

    /// Record a new lead submitted now.
    pub async fn append(&self, fields: NewLead) -> Result<Lead, ServiceError> {
        self.append_at(fields, Utc::now()).await
    }

    /// Record a new lead submitted at `at`.
    ///
    /// Without storage the lead is returned but not persisted. Existing
    /// entries are written back as they were read. A slot marked with a newer
    /// schema is refused and left untouched.
    pub async fn append_at(&self, fields: NewLead, at: DateTime<Utc>) -> Result<Lead, ServiceError> {
        let lead = fields.into_lead(at);
        let Some(backend) = self.backend.as_deref() else {
            debug!(id = %lead.id, "no storage available; lead not persisted");
            return Ok(lead);
        };

        if let Some(MigrationOutcome::NewerVersion(version)) = self.migrate().await {
            return Err(ServiceError::NewerSchema(version));
        }

        let mut items = self.load_items(backend).await;
        items.push(serde_json::to_value(&lead)?);
        let raw = serde_json::to_string(&items)?;
        backend.set_item(&self.key, raw).await?;
        if let Err(e) = migration::stamp(backend, &self.key).await {
            warn!(key = %self.key, error = %e, "lead saved but schema marker not written");
        }

        info!(event = "lead_appended", id = %lead.id, count = items.len(), "lead stored");
        Ok(lead)
    }

    /// Leads submitted in zero-based `month0` of `year` (UTC), in insertion order.
    pub async fn filter_by_month(&self, month0: u32, year: i32) -> Vec<Lead> {
        self.read_all()
            .await
            .into_iter()
            .filter(|lead| month::in_month(lead, month0, year))
            .collect()
    }

    /// Lead count per `"YYYY-MM"` (UTC). Leads with unreadable timestamps are skipped.
    pub async fn aggregate_by_month(&self) -> BTreeMap<String, usize> {
        let mut stats = BTreeMap::new();
        for lead in self.read_all().await {
            match month::lead_month_key(&lead) {
                Some(key) => *stats.entry(key).or_insert(0) += 1,
                None => warn!(id = %lead.id, submitted_at = %lead.submitted_at, "skipping lead with unreadable timestamp"),
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKv;
    use async_trait::async_trait;
    use chrono::TimeZone;

    fn new_lead(name: &str) -> NewLead {
        NewLead {
            full_name: name.into(),
            phone_number: "0500000000".into(),
            property_type: "Apartment".into(),
            budget: "1M".into(),
            city: "Sharjah".into(),
            preference: "Near school".into(),
        }
    }

    fn memory_store() -> (Arc<MemoryKv>, LeadStore) {
        let kv = Arc::new(MemoryKv::new());
        let store = LeadStore::new(kv.clone());
        (kv, store)
    }

    /// Reads succeed, writes always fail.
    struct ReadOnlyKv(MemoryKv);

    #[async_trait]
    impl KvBackend for ReadOnlyKv {
        async fn get_item(&self, key: &str) -> Result<Option<String>, ServiceError> {
            self.0.get_item(key).await
        }
        async fn set_item(&self, _key: &str, _value: String) -> Result<(), ServiceError> {
            Err(ServiceError::Storage("quota exceeded".into()))
        }
        async fn remove_item(&self, _key: &str) -> Result<bool, ServiceError> {
            Err(ServiceError::Storage("read only".into()))
        }
    }

    /// Every call fails.
    struct BrokenKv;

    #[async_trait]
    impl KvBackend for BrokenKv {
        async fn get_item(&self, _key: &str) -> Result<Option<String>, ServiceError> {
            Err(ServiceError::Storage("unavailable".into()))
        }
        async fn set_item(&self, _key: &str, _value: String) -> Result<(), ServiceError> {
            Err(ServiceError::Storage("unavailable".into()))
        }
        async fn remove_item(&self, _key: &str) -> Result<bool, ServiceError> {
            Err(ServiceError::Storage("unavailable".into()))
        }
    }

    #[tokio::test]
    async fn append_writes_array_and_schema_marker() -> Result<(), anyhow::Error> {
        let (kv, store) = memory_store();
        let at = Utc.with_ymd_and_hms(2024, 2, 10, 8, 0, 0).unwrap();
        let lead = store.append_at(new_lead("A"), at).await?;

        let raw = kv.get_item(DEFAULT_LEADS_KEY).await?.unwrap_or_default();
        let stored: Vec<Lead> = serde_json::from_str(&raw)?;
        assert_eq!(stored, vec![lead]);
        assert_eq!(
            kv.get_item(&migration::version_key(DEFAULT_LEADS_KEY)).await?.as_deref(),
            Some("2")
        );
        Ok(())
    }

    #[tokio::test]
    async fn custom_key_is_honoured() -> Result<(), anyhow::Error> {
        let kv = Arc::new(MemoryKv::new());
        let store = LeadStore::with_key(kv.clone(), "crm");
        store.append(new_lead("A")).await?;

        assert!(kv.get_item("crm").await?.is_some());
        assert!(kv.get_item(DEFAULT_LEADS_KEY).await?.is_none());
        assert_eq!(store.key(), "crm");
        Ok(())
    }

    #[tokio::test]
    async fn read_errors_are_soft() -> Result<(), anyhow::Error> {
        let store = LeadStore::new(Arc::new(BrokenKv));
        assert!(store.read_all().await.is_empty());
        assert!(store.migrate().await.is_none());
        assert!(store.aggregate_by_month().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn write_errors_propagate_from_append() -> Result<(), anyhow::Error> {
        let store = LeadStore::new(Arc::new(ReadOnlyKv(MemoryKv::new())));
        match store.append(new_lead("A")).await {
            Err(ServiceError::Storage(msg)) => assert!(msg.contains("quota")),
            other => panic!("expected storage error, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn append_over_corrupt_slot_starts_fresh() -> Result<(), anyhow::Error> {
        let (kv, store) = memory_store();
        kv.set_item(DEFAULT_LEADS_KEY, "<<garbage>>".into()).await?;

        let lead = store.append(new_lead("A")).await?;
        assert_eq!(store.read_all().await, vec![lead]);
        Ok(())
    }

    #[tokio::test]
    async fn aggregate_skips_unreadable_timestamps() -> Result<(), anyhow::Error> {
        let (kv, store) = memory_store();
        kv.set_item(
            DEFAULT_LEADS_KEY,
            r#"[{"id":"1","fullName":"A","submittedAt":"2024-05-01T00:00:00.000Z"},
                {"id":"2","fullName":"B","submittedAt":"yesterday"}]"#
                .into(),
        )
        .await?;

        let stats = store.aggregate_by_month().await;
        assert_eq!(stats.len(), 1);
        assert_eq!(stats.get("2024-05"), Some(&1));
        assert_eq!(store.filter_by_month(4, 2024).await.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn append_refuses_newer_schema_slot() -> Result<(), anyhow::Error> {
        let (kv, store) = memory_store();
        let raw = r#"[{"id":"1","fullName":"Future","tags":["vip"]}]"#;
        kv.set_item(DEFAULT_LEADS_KEY, raw.into()).await?;
        kv.set_item(&migration::version_key(DEFAULT_LEADS_KEY), "3".into()).await?;

        match store.append(new_lead("A")).await {
            Err(ServiceError::NewerSchema(3)) => {}
            other => panic!("expected newer schema error, got {other:?}"),
        }
        assert_eq!(kv.get_item(DEFAULT_LEADS_KEY).await?.as_deref(), Some(raw));
        assert_eq!(
            kv.get_item(&migration::version_key(DEFAULT_LEADS_KEY)).await?.as_deref(),
            Some("3")
        );
        Ok(())
    }

    #[tokio::test]
    async fn non_object_entries_are_skipped_on_read_but_kept_on_append() -> Result<(), anyhow::Error> {
        let (kv, store) = memory_store();
        kv.set_item(DEFAULT_LEADS_KEY, r#"[42,{"id":"1","fullName":"A"}]"#.into()).await?;

        let leads = store.read_all().await;
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].full_name, "A");

        store.append(new_lead("B")).await?;
        let raw = kv.get_item(DEFAULT_LEADS_KEY).await?.unwrap_or_default();
        let items: Vec<Value> = serde_json::from_str(&raw)?;
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], Value::from(42));
        Ok(())
    }
}
