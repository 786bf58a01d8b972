//! The workflow engine: record creation, the transition guard, and the
//! concurrency-safe apply.
//!
//! The engine is synchronous and makes no internal concurrency decisions; it
//! may be invoked from any number of independent threads racing on the same
//! record uid, coordinated only through the store's conditional update. The
//! two store round trips inside [`Engine::safe_advance_state`] (conditional
//! update, refresh) are the only operations that may block.

use chrono::Utc;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, TransitionError};
use crate::history::HistoryEntry;
use crate::record::Record;
use crate::registry::Registry;
use crate::store::RecordStore;
use crate::workflow::{State, Transition};

/// Drives records through their registered workflows against a backing
/// store.
pub struct Engine<S: RecordStore> {
    store: S,
    registry: Registry<S>,
    config: EngineConfig,
}

/// The bound apply callback handed to a transition handler.
///
/// `apply()` commits the guarded transition for the record the handler was
/// invoked on; the handler decides when, or whether, to call it.
pub struct ApplyHandle<'a, S: RecordStore> {
    engine: &'a Engine<S>,
    record: &'a mut Record,
    transition: &'a str,
    applied: bool,
}

impl<S: RecordStore> ApplyHandle<'_, S> {
    pub fn record(&self) -> &Record {
        &*self.record
    }

    pub fn transition(&self) -> &str {
        self.transition
    }

    /// Run the concurrency-safe apply for the guarded transition.
    ///
    /// Returns whether the commit won; a contention loss is `Ok(false)`,
    /// never an error.
    pub fn apply(&mut self) -> Result<bool, EngineError> {
        let applied = self.engine.safe_advance_state(self.record, self.transition)?;
        self.applied |= applied;
        Ok(applied)
    }
}

impl<S: RecordStore> Engine<S> {
    pub fn new(store: S, registry: Registry<S>) -> Self {
        Self::with_config(store, registry, EngineConfig::default())
    }

    pub fn with_config(store: S, registry: Registry<S>, config: EngineConfig) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> &Registry<S> {
        &self.registry
    }

    /// Create and persist a record for a registered variant, in the family's
    /// agreed initial state, at version 0.
    ///
    /// When historisation is enabled, the creation entry
    /// (`#created` → initial state) is appended.
    pub fn create_record(&self, variant: &str) -> Result<Record, EngineError> {
        let entry = self.registry.variant(variant)?;
        let family = self.registry.family(&entry.family)?;
        let initial = family.initial_state()?;

        let record = Record::new(variant, initial);
        self.store.create(&record)?;
        if self.config.historise {
            self.store.append_history(HistoryEntry::creation(&record))?;
        }
        Ok(record)
    }

    /// Invoke the named transition operation for a record — the guard path.
    ///
    /// The transition name is validated against the variant's table before
    /// the handler runs (raising
    /// [`TransitionError::InvalidTransitionName`] regardless of the record's
    /// current state — a pre-check, not the transition itself). The handler
    /// then receives an [`ApplyHandle`] bound to this record and transition.
    ///
    /// Returns whether a state change was actually committed.
    pub fn invoke(&self, record: &mut Record, transition: &str) -> Result<bool, EngineError> {
        let table = self.registry.table(&record.variant)?;
        table.find_transition(transition)?;

        let handler = self.registry.handler(&record.variant, transition).ok_or_else(|| {
            TransitionError::InvalidTransitionName {
                workflow: record.variant.clone(),
                transition: transition.to_string(),
            }
        })?;

        let mut handle = ApplyHandle {
            engine: self,
            record,
            transition,
            applied: false,
        };
        handler(&mut handle)?;
        Ok(handle.applied)
    }

    /// Commit the named transition against the store — the persisted,
    /// concurrency-safe path.
    ///
    /// The target state is computed from the caller's in-memory snapshot; a
    /// logic error ([`TransitionError`]) propagates immediately with no
    /// retry. The commit is a conditional update keyed on the snapshot's
    /// `(uid, version)`; on a win the snapshot is refreshed from the store
    /// and a history entry appended. On a loss the call retries up to
    /// `max_attempts` total attempts, then reports `Ok(false)` — contention
    /// is expected under load and never an error.
    ///
    /// With `refetch_on_retry` enabled the snapshot is re-read before each
    /// retry; if the transition is no longer valid from the refreshed state
    /// the race was lost for good and the call reports `Ok(false)`.
    pub fn safe_advance_state(
        &self,
        record: &mut Record,
        transition: &str,
    ) -> Result<bool, EngineError> {
        let table = self.registry.table(&record.variant)?;
        let mut next = table.advance_state(transition, &record.state)?;

        let max_attempts = self.config.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            let rows =
                self.store
                    .conditional_update(&record.uid, record.version, &next, Utc::now())?;
            if rows >= 1 {
                let from = record.state.clone();
                *record = self.store.get(&record.uid)?;
                if self.config.historise {
                    self.store
                        .append_history(HistoryEntry::applied(record, from, next))?;
                }
                return Ok(true);
            }

            debug!(
                uid = %record.uid,
                transition,
                attempt,
                version = record.version,
                "conditional update lost"
            );

            if attempt < max_attempts && self.config.refetch_on_retry {
                *record = self.store.get(&record.uid)?;
                match table.advance_state(transition, &record.state) {
                    Ok(target) => next = target,
                    Err(_) => {
                        // The competing writer moved the record somewhere the
                        // transition no longer applies; the caller's request
                        // was simply stale.
                        warn!(
                            uid = %record.uid,
                            transition,
                            state = %record.state,
                            "transition no longer valid after refresh, giving up"
                        );
                        return Ok(false);
                    }
                }
            }
        }

        warn!(
            uid = %record.uid,
            transition,
            state = %record.state,
            "failed to advance state due to high concurrency"
        );
        Ok(false)
    }

    /// Aggregated states of a family, for introspection.
    pub fn states(&self, family: &str) -> Result<Vec<State>, EngineError> {
        Ok(self.registry.family(family)?.aggregated_states())
    }

    /// Declared transitions of a variant.
    pub fn transitions(&self, variant: &str) -> Result<Vec<Transition>, EngineError> {
        Ok(self.registry.table(variant)?.transitions().to_vec())
    }

    /// The family's agreed initial state.
    pub fn initial_state(&self, family: &str) -> Result<String, EngineError> {
        Ok(self.registry.family(family)?.initial_state()?.to_string())
    }

    /// Ordered audit history for a record.
    pub fn history_for(&self, record: &Record) -> Result<Vec<HistoryEntry>, EngineError> {
        Ok(self.store.history_for(&record.uid)?)
    }
}
