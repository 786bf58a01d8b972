//! Storage abstraction for workflow records and their history.
//!
//! The engine treats the store as an external collaborator: a single
//! authoritative backend exposing a conditional (compare-and-set) update
//! keyed on record identifier plus version. [`MemoryStore`] is the in-process
//! reference implementation, used by the tests and small deployments; a
//! relational backend implements the same trait over `UPDATE ... WHERE uid =
//! ? AND version = ?`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::history::HistoryEntry;
use crate::record::Record;

/// Backend contract for record persistence.
///
/// The conditional update is the single serialization point among concurrent
/// writers: for a given `(uid, expected_version)` pair at most one caller can
/// observe a non-zero row count.
pub trait RecordStore: Send + Sync {
    /// Persist a newly created record (version 0).
    fn create(&self, record: &Record) -> Result<(), StoreError>;

    /// Re-read the current snapshot of a record.
    fn get(&self, uid: &str) -> Result<Record, StoreError>;

    /// Atomic compare-and-set: set `state`, bump the version and touch
    /// `modified_at` — but only if the stored version still equals
    /// `expected_version`. Returns the number of rows affected (0 or 1);
    /// a missing record matches zero rows, like its SQL counterpart.
    fn conditional_update(
        &self,
        uid: &str,
        expected_version: u64,
        new_state: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Append one history entry.
    fn append_history(&self, entry: HistoryEntry) -> Result<(), StoreError>;

    /// All history entries for a record, ordered by timestamp ascending.
    /// Entries with equal timestamps keep their append order.
    fn history_for(&self, uid: &str) -> Result<Vec<HistoryEntry>, StoreError>;
}

/// In-process store backed by a mutex-guarded map.
///
/// The compare-and-set runs entirely under the lock, so it is atomic with
/// respect to every other store operation. Clones share the same backing
/// data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<String, Record>,
    history: Vec<HistoryEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("store lock poisoned".into()))
    }
}

impl RecordStore for MemoryStore {
    fn create(&self, record: &Record) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if inner.records.contains_key(&record.uid) {
            return Err(StoreError::DuplicateRecord(record.uid.clone()));
        }
        inner.records.insert(record.uid.clone(), record.clone());
        Ok(())
    }

    fn get(&self, uid: &str) -> Result<Record, StoreError> {
        self.lock()?
            .records
            .get(uid)
            .cloned()
            .ok_or_else(|| StoreError::RecordNotFound(uid.to_string()))
    }

    fn conditional_update(
        &self,
        uid: &str,
        expected_version: u64,
        new_state: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut inner = self.lock()?;
        match inner.records.get_mut(uid) {
            Some(record) if record.version == expected_version => {
                record.state = new_state.to_string();
                record.version += 1;
                record.modified_at = now;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    fn append_history(&self, entry: HistoryEntry) -> Result<(), StoreError> {
        self.lock()?.history.push(entry);
        Ok(())
    }

    fn history_for(&self, uid: &str) -> Result<Vec<HistoryEntry>, StoreError> {
        let inner = self.lock()?;
        let mut entries: Vec<HistoryEntry> = inner
            .history
            .iter()
            .filter(|e| e.record_uid == uid)
            .cloned()
            .collect();
        // Stable sort, so equal timestamps fall back to append order.
        entries.sort_by_key(|e| e.timestamp);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn create_and_get_roundtrip() {
        let store = MemoryStore::new();
        let record = Record::new("OrderWorkflow", "start");
        store.create(&record).unwrap();

        let loaded = store.get(&record.uid).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn create_twice_rejected() {
        let store = MemoryStore::new();
        let record = Record::new("OrderWorkflow", "start");
        store.create(&record).unwrap();
        assert_eq!(
            store.create(&record),
            Err(StoreError::DuplicateRecord(record.uid.clone()))
        );
    }

    #[test]
    fn get_missing_record() {
        let store = MemoryStore::new();
        assert_eq!(
            store.get("nope"),
            Err(StoreError::RecordNotFound("nope".into()))
        );
    }

    #[test]
    fn conditional_update_wins_on_matching_version() {
        let store = MemoryStore::new();
        let record = Record::new("OrderWorkflow", "start");
        store.create(&record).unwrap();

        let now = Utc::now();
        let rows = store
            .conditional_update(&record.uid, 0, "state_1", now)
            .unwrap();
        assert_eq!(rows, 1);

        let loaded = store.get(&record.uid).unwrap();
        assert_eq!(loaded.state, "state_1");
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.modified_at, now);
    }

    #[test]
    fn conditional_update_loses_on_stale_version() {
        let store = MemoryStore::new();
        let record = Record::new("OrderWorkflow", "start");
        store.create(&record).unwrap();
        store
            .conditional_update(&record.uid, 0, "state_1", Utc::now())
            .unwrap();

        // Same expected version again: another writer already advanced it.
        let rows = store
            .conditional_update(&record.uid, 0, "state_2", Utc::now())
            .unwrap();
        assert_eq!(rows, 0);
        assert_eq!(store.get(&record.uid).unwrap().state, "state_1");
    }

    #[test]
    fn conditional_update_on_missing_record_matches_zero_rows() {
        let store = MemoryStore::new();
        let rows = store
            .conditional_update("nope", 0, "state_1", Utc::now())
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[test]
    fn history_is_filtered_and_ordered() {
        let store = MemoryStore::new();
        let a = Record::new("OrderWorkflow", "start");
        let b = Record::new("OrderWorkflow", "start");

        store.append_history(HistoryEntry::creation(&a)).unwrap();
        store.append_history(HistoryEntry::creation(&b)).unwrap();
        store
            .append_history(HistoryEntry::applied(&a, "start", "state_1"))
            .unwrap();

        let history = store.history_for(&a.uid).unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert!(history.iter().all(|e| e.record_uid == a.uid));
    }

    #[test]
    fn racing_cas_calls_admit_one_winner_per_version() {
        let store = MemoryStore::new();
        let record = Record::new("OrderWorkflow", "start");
        store.create(&record).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                let uid = record.uid.clone();
                thread::spawn(move || {
                    store
                        .conditional_update(&uid, 0, &format!("state_{i}"), Utc::now())
                        .unwrap()
                })
            })
            .collect();

        let wins: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(wins, 1);
        assert_eq!(store.get(&record.uid).unwrap().version, 1);
    }
}
