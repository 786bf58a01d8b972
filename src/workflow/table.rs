use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{DefinitionError, TransitionError};

/// One named point in an entity's lifecycle: a short identifier plus a
/// human-readable label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub id: String,
    pub label: String,
}

impl State {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// A named, directed rule permitting movement from one or more source states
/// to a single target state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub name: String,
    pub sources: Vec<String>,
    pub target: String,
}

impl Transition {
    /// A transition with a single source state.
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            sources: vec![source.into()],
            target: target.into(),
        }
    }

    /// A transition permitted from several source states.
    pub fn from_any(
        name: impl Into<String>,
        sources: &[&str],
        target: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
            target: target.into(),
        }
    }
}

/// The validated state/transition declaration for one concrete workflow
/// variant.
///
/// Built once at registration time and immutable afterwards; all validation
/// happens in [`WorkflowTable::register`], never per call. Shared read-only
/// by every record of the variant.
#[derive(Debug, Clone)]
pub struct WorkflowTable {
    name: String,
    states: Vec<State>,
    transitions: Vec<Transition>,
    by_name: HashMap<String, usize>,
}

impl WorkflowTable {
    /// Validate and build a table for one workflow variant.
    ///
    /// Fails with [`DefinitionError::InconsistentStateList`] on a duplicate
    /// state id, [`DefinitionError::InconsistentStateInTransition`] when a
    /// transition references an undeclared source or target, and
    /// [`DefinitionError::DuplicateTransitionName`] when two transitions in
    /// the same table share a name.
    pub fn register(
        name: impl Into<String>,
        states: Vec<State>,
        transitions: Vec<Transition>,
    ) -> Result<Self, DefinitionError> {
        let name = name.into();

        if states.is_empty() {
            return Err(DefinitionError::EmptyStateList { workflow: name });
        }

        let mut state_ids = HashSet::new();
        for state in &states {
            if !state_ids.insert(state.id.as_str()) {
                return Err(DefinitionError::InconsistentStateList {
                    workflow: name,
                    state: state.id.clone(),
                });
            }
        }

        let mut by_name = HashMap::new();
        for (i, transition) in transitions.iter().enumerate() {
            if transition.sources.is_empty() {
                return Err(DefinitionError::EmptyTransitionSources {
                    workflow: name,
                    transition: transition.name.clone(),
                });
            }
            for source in &transition.sources {
                if !state_ids.contains(source.as_str()) {
                    return Err(DefinitionError::InconsistentStateInTransition {
                        workflow: name,
                        transition: transition.name.clone(),
                        position: "source",
                        state: source.clone(),
                    });
                }
            }
            if !state_ids.contains(transition.target.as_str()) {
                return Err(DefinitionError::InconsistentStateInTransition {
                    workflow: name,
                    transition: transition.name.clone(),
                    position: "target",
                    state: transition.target.clone(),
                });
            }
            if by_name.insert(transition.name.clone(), i).is_some() {
                return Err(DefinitionError::DuplicateTransitionName {
                    workflow: name,
                    transition: transition.name.clone(),
                });
            }
        }

        Ok(Self {
            name,
            states,
            transitions,
            by_name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// The first declared state — the variant's candidate initial state,
    /// which its family requires all siblings to agree on.
    pub fn first_state(&self) -> &State {
        &self.states[0]
    }

    pub fn has_state(&self, id: &str) -> bool {
        self.states.iter().any(|s| s.id == id)
    }

    /// Look up a transition by name.
    ///
    /// O(1) after the one-time build of the name map. Fails with
    /// [`TransitionError::InvalidTransitionName`] when undeclared.
    pub fn find_transition(&self, name: &str) -> Result<&Transition, TransitionError> {
        self.by_name
            .get(name)
            .map(|&i| &self.transitions[i])
            .ok_or_else(|| TransitionError::InvalidTransitionName {
                workflow: self.name.clone(),
                transition: name.to_string(),
            })
    }

    /// Pure transition function: the target state for `name` applied at
    /// `current`, or [`TransitionError::InvalidStateForTransition`] when
    /// `current` is not among the transition's permitted sources.
    ///
    /// No side effects, no I/O.
    pub fn advance_state(&self, name: &str, current: &str) -> Result<String, TransitionError> {
        let transition = self.find_transition(name)?;
        if transition.sources.iter().any(|s| s == current) {
            Ok(transition.target.clone())
        } else {
            Err(TransitionError::InvalidStateForTransition {
                workflow: self.name.clone(),
                transition: name.to_string(),
                state: current.to_string(),
            })
        }
    }

    /// Check that the transition handler names a variant registers match the
    /// declared transition set exactly — neither fewer nor extra.
    pub fn check_transition_methods(&self, methods: &[&str]) -> Result<(), DefinitionError> {
        let declared: HashSet<&str> = self.by_name.keys().map(String::as_str).collect();
        let supplied: HashSet<&str> = methods.iter().copied().collect();

        if declared == supplied {
            return Ok(());
        }

        let mut missing: Vec<String> = declared
            .difference(&supplied)
            .map(|s| s.to_string())
            .collect();
        let mut extra: Vec<String> = supplied
            .difference(&declared)
            .map(|s| s.to_string())
            .collect();
        missing.sort();
        extra.sort();

        Err(DefinitionError::InvalidTransitionMethod {
            workflow: self.name.clone(),
            missing,
            extra,
        })
    }
}
