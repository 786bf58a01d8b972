use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use super::table::{State, WorkflowTable};
use crate::error::DefinitionError;

/// A named grouping of workflow variants that share one conceptual lifecycle
/// and one agreed initial state.
///
/// Siblings are registered explicitly at startup; after registration the
/// family is read-only and safely shared by all callers.
#[derive(Debug)]
pub struct WorkflowFamily {
    name: String,
    siblings: Vec<Arc<WorkflowTable>>,
    initial: OnceLock<String>,
}

impl WorkflowFamily {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            siblings: Vec::new(),
            initial: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn siblings(&self) -> &[Arc<WorkflowTable>] {
        &self.siblings
    }

    /// Register a sibling variant's table into the family.
    ///
    /// A state id already declared by an earlier sibling must carry the same
    /// label; a clash is a [`DefinitionError::ConflictingAggregatedState`]
    /// rather than a silent overwrite.
    pub fn register(&mut self, table: Arc<WorkflowTable>) -> Result<(), DefinitionError> {
        for state in table.states() {
            for sibling in &self.siblings {
                if let Some(existing) = sibling.states().iter().find(|s| s.id == state.id)
                    && existing.label != state.label
                {
                    return Err(DefinitionError::ConflictingAggregatedState {
                        family: self.name.clone(),
                        workflow: table.name().to_string(),
                        state: state.id.clone(),
                        label: state.label.clone(),
                        existing: existing.label.clone(),
                    });
                }
            }
        }
        self.siblings.push(table);
        Ok(())
    }

    /// Union of all siblings' state sets, keyed by identifier, in order of
    /// first appearance across siblings.
    pub fn aggregated_states(&self) -> Vec<State> {
        let mut seen = HashSet::new();
        let mut states = Vec::new();
        for sibling in &self.siblings {
            for state in sibling.states() {
                if seen.insert(state.id.clone()) {
                    states.push(state.clone());
                }
            }
        }
        states
    }

    /// The single initial state shared by every sibling.
    ///
    /// Fails with [`DefinitionError::MultipleDifferentFirstStates`] when
    /// siblings disagree on their first declared state. Cached after the
    /// first successful computation — siblings are closed for registration
    /// by then in practice.
    pub fn initial_state(&self) -> Result<&str, DefinitionError> {
        if let Some(initial) = self.initial.get() {
            return Ok(initial);
        }

        if self.siblings.is_empty() {
            return Err(DefinitionError::EmptyFamily {
                family: self.name.clone(),
            });
        }

        let firsts: HashSet<&str> = self
            .siblings
            .iter()
            .map(|t| t.first_state().id.as_str())
            .collect();
        if firsts.len() > 1 {
            let mut found: Vec<String> = firsts.into_iter().map(|s| s.to_string()).collect();
            found.sort();
            return Err(DefinitionError::MultipleDifferentFirstStates {
                family: self.name.clone(),
                found,
            });
        }

        let first = self.siblings[0].first_state().id.clone();
        Ok(self.initial.get_or_init(|| first))
    }
}
