use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TransitionError;
use crate::workflow::WorkflowTable;

const UID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Make a short opaque id from random lowercase alphanumerics, with an
/// optional prefix. Uniqueness is probabilistic; 12 chars of base-36 give
/// 36^12 > 4e18 combinations.
pub fn make_uid(prefix: Option<&str>, length: usize) -> String {
    let mut bytes = Vec::with_capacity(length);
    while bytes.len() < length {
        bytes.extend_from_slice(Uuid::new_v4().as_bytes());
    }
    // Slight modulo bias is fine for opaque identifiers.
    let id: String = bytes
        .into_iter()
        .take(length)
        .map(|b| UID_ALPHABET[b as usize % UID_ALPHABET.len()] as char)
        .collect();
    match prefix {
        Some(p) => format!("{p}_{id}"),
        None => id,
    }
}

/// A workflow-enabled entity as held in memory: a snapshot of what the store
/// knows, plus the dry-run transition path.
///
/// The uid is immutable once created. `state` and `version` mutate only
/// through the engine's apply path (or the in-memory [`Record::advance_state`]
/// preview, which never persists). The version counter exists purely for
/// optimistic concurrency control — it is not a business field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub uid: String,
    pub variant: String,
    pub state: String,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Record {
    pub fn new(variant: impl Into<String>, initial_state: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            uid: make_uid(None, 12),
            variant: variant.into(),
            state: initial_state.into(),
            version: 0,
            created_at: now,
            modified_at: now,
        }
    }

    /// Advance this snapshot's state in memory only — a dry-run/preview.
    ///
    /// Nothing is persisted and no history is written; version and
    /// timestamps are untouched. The persisted path is
    /// [`Engine::safe_advance_state`](crate::Engine::safe_advance_state).
    pub fn advance_state(
        &mut self,
        table: &WorkflowTable,
        transition: &str,
    ) -> Result<(), TransitionError> {
        self.state = table.advance_state(transition, &self.state)?;
        Ok(())
    }
}
