use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Sentinel "from" state for the history entry written at record creation.
pub const CREATION_STATE: &str = "#created";

/// An immutable audit record of one state change (or creation) for one
/// record. Append-only; ordered by timestamp ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub record_uid: String,
    pub from_state: String,
    pub to_state: String,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    /// The entry written once at record creation: from the reserved creation
    /// sentinel to the record's initial state.
    pub fn creation(record: &Record) -> Self {
        Self {
            record_uid: record.uid.clone(),
            from_state: CREATION_STATE.to_string(),
            to_state: record.state.clone(),
            timestamp: Utc::now(),
        }
    }

    /// The entry written after each successful apply.
    pub fn applied(record: &Record, from_state: impl Into<String>, to_state: impl Into<String>) -> Self {
        Self {
            record_uid: record.uid.clone(),
            from_state: from_state.into(),
            to_state: to_state.into(),
            timestamp: Utc::now(),
        }
    }
}

/// The earliest entry by timestamp.
pub fn first(entries: &[HistoryEntry]) -> Option<&HistoryEntry> {
    entries.iter().min_by_key(|e| e.timestamp)
}

/// The most recent entry by timestamp.
pub fn latest(entries: &[HistoryEntry]) -> Option<&HistoryEntry> {
    entries.iter().max_by_key(|e| e.timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn entry(uid: &str, from: &str, to: &str, offset_ms: i64) -> HistoryEntry {
        HistoryEntry {
            record_uid: uid.into(),
            from_state: from.into(),
            to_state: to.into(),
            timestamp: Utc::now() + TimeDelta::milliseconds(offset_ms),
        }
    }

    #[test]
    fn creation_entry_uses_sentinel() {
        let record = Record::new("OrderWorkflow", "start");
        let entry = HistoryEntry::creation(&record);
        assert_eq!(entry.record_uid, record.uid);
        assert_eq!(entry.from_state, CREATION_STATE);
        assert_eq!(entry.to_state, "start");
    }

    #[test]
    fn applied_entry_records_both_states() {
        let record = Record::new("OrderWorkflow", "state_1");
        let entry = HistoryEntry::applied(&record, "start", "state_1");
        assert_eq!(entry.from_state, "start");
        assert_eq!(entry.to_state, "state_1");
    }

    #[test]
    fn first_and_latest_by_timestamp() {
        let entries = vec![
            entry("r", CREATION_STATE, "start", 0),
            entry("r", "start", "state_1", 10),
            entry("r", "state_1", "state_2", 20),
        ];
        assert_eq!(first(&entries).unwrap().to_state, "start");
        assert_eq!(latest(&entries).unwrap().to_state, "state_2");
    }

    #[test]
    fn empty_history_has_no_first_or_latest() {
        assert!(first(&[]).is_none());
        assert!(latest(&[]).is_none());
    }

    #[test]
    fn history_entry_serialization_roundtrip() {
        let record = Record::new("OrderWorkflow", "start");
        let entry = HistoryEntry::creation(&record);
        let json = serde_json::to_string(&entry).unwrap();
        let back: HistoryEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
