//! Snapshot persistence seam.
//!
//! Stores keep the most recent successful payload per domain key so the
//! service layer can serve stale-but-recent data when every live source
//! is down. Staleness policy lives with the caller; stores only record
//! when a snapshot was written.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

use crate::domain::{TradeDate, UtcDateTime};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot backend error: {0}")]
    Backend(String),
    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A persisted payload with its write time.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRecord {
    pub domain: String,
    pub date: TradeDate,
    pub saved_at: UtcDateTime,
    pub payload: serde_json::Value,
}

/// Append-style store of the latest snapshot per domain key.
pub trait SnapshotStore: Send + Sync {
    fn save_snapshot(
        &self,
        domain: &str,
        date: TradeDate,
        payload: &serde_json::Value,
    ) -> Result<(), StoreError>;

    /// Most recently saved snapshot for the domain, if any.
    fn latest(&self, domain: &str) -> Result<Option<SnapshotRecord>, StoreError>;
}

/// Process-local store; snapshots do not survive a restart.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    records: Mutex<HashMap<String, SnapshotRecord>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn save_snapshot(
        &self,
        domain: &str,
        date: TradeDate,
        payload: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let record = SnapshotRecord {
            domain: domain.to_owned(),
            date,
            saved_at: UtcDateTime::now(),
            payload: payload.clone(),
        };
        self.records
            .lock()
            .expect("snapshot store lock should not be poisoned")
            .insert(domain.to_owned(), record);
        Ok(())
    }

    fn latest(&self, domain: &str) -> Result<Option<SnapshotRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .expect("snapshot store lock should not be poisoned")
            .get(domain)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn latest_returns_the_most_recent_write() {
        let store = MemorySnapshotStore::new();
        let date = TradeDate::parse("20240102").expect("valid date");

        store
            .save_snapshot("quote:600519", date, &json!({"price": 10.0}))
            .expect("save should succeed");
        store
            .save_snapshot("quote:600519", date, &json!({"price": 11.0}))
            .expect("save should succeed");

        let record = store
            .latest("quote:600519")
            .expect("lookup should succeed")
            .expect("record should exist");
        assert_eq!(record.payload, json!({"price": 11.0}));
        assert_eq!(record.date, date);
    }

    #[test]
    fn domains_do_not_leak_into_each_other() {
        let store = MemorySnapshotStore::new();
        let date = TradeDate::parse("20240102").expect("valid date");

        store
            .save_snapshot("daily:600519", date, &json!([1, 2]))
            .expect("save should succeed");

        assert!(store
            .latest("daily:000001")
            .expect("lookup should succeed")
            .is_none());
    }
}
