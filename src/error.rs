use thiserror::Error;

/// Fatal errors raised while a workflow declaration is being registered.
///
/// These indicate a programming error in the declaration itself and abort
/// initialization — they are never produced once registration has succeeded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("workflow {workflow}: state '{state}' is declared twice")]
    InconsistentStateList { workflow: String, state: String },

    #[error(
        "workflow {workflow}: {position} state '{state}' of transition '{transition}' \
         not found in states list"
    )]
    InconsistentStateInTransition {
        workflow: String,
        transition: String,
        /// Which end of the transition dangles: "source" or "target".
        position: &'static str,
        state: String,
    },

    #[error("workflow {workflow}: transition '{transition}' is declared twice")]
    DuplicateTransitionName { workflow: String, transition: String },

    #[error("workflow {workflow}: states list is empty")]
    EmptyStateList { workflow: String },

    #[error("workflow {workflow}: transition '{transition}' has no source states")]
    EmptyTransitionSources { workflow: String, transition: String },

    #[error(
        "workflow {workflow}: transition methods do not match declared transitions \
         (missing: {missing:?}, extra: {extra:?})"
    )]
    InvalidTransitionMethod {
        workflow: String,
        missing: Vec<String>,
        extra: Vec<String>,
    },

    #[error("family {family}: siblings must all have the same first state (found {found:?})")]
    MultipleDifferentFirstStates { family: String, found: Vec<String> },

    #[error(
        "family {family}: state '{state}' is declared with label '{label}' by {workflow} \
         but an earlier sibling declared it as '{existing}'"
    )]
    ConflictingAggregatedState {
        family: String,
        workflow: String,
        state: String,
        label: String,
        existing: String,
    },

    #[error("family {family}: no sibling workflows registered")]
    EmptyFamily { family: String },

    #[error("unknown workflow variant: {0}")]
    UnknownVariant(String),

    #[error("workflow variant registered twice: {0}")]
    DuplicateVariant(String),

    #[error("unknown workflow family: {0}")]
    UnknownFamily(String),
}

/// Call-time logic errors from a bad transition request.
///
/// Recoverable by the caller, but never retried by the engine: retrying
/// cannot change a logic error's outcome.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("transition '{transition}' not found in workflow {workflow}")]
    InvalidTransitionName { workflow: String, transition: String },

    #[error("invalid transition '{transition}' for state '{state}' in workflow {workflow}")]
    InvalidStateForTransition {
        workflow: String,
        transition: String,
        state: String,
    },
}

/// Failures reported by the record store collaborator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("record already exists: {0}")]
    DuplicateRecord(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Top-level error for engine operations.
///
/// Contention is deliberately absent from this enum: a lost conditional
/// update is reported as `Ok(false)` by the apply path, never as an error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_error_messages() {
        let e = DefinitionError::InconsistentStateList {
            workflow: "OvhActivate".into(),
            state: "start".into(),
        };
        assert_eq!(
            e.to_string(),
            "workflow OvhActivate: state 'start' is declared twice"
        );

        let e = DefinitionError::InconsistentStateInTransition {
            workflow: "OvhActivate".into(),
            transition: "submit".into(),
            position: "target",
            state: "nowhere".into(),
        };
        assert!(e.to_string().contains("target state 'nowhere'"));
    }

    #[test]
    fn transition_error_messages() {
        let e = TransitionError::InvalidTransitionName {
            workflow: "OvhActivate".into(),
            transition: "toto".into(),
        };
        assert_eq!(
            e.to_string(),
            "transition 'toto' not found in workflow OvhActivate"
        );
    }

    #[test]
    fn engine_error_wraps_transition() {
        let inner = TransitionError::InvalidStateForTransition {
            workflow: "OvhActivate".into(),
            transition: "submit".into(),
            state: "end".into(),
        };
        let e = EngineError::from(inner);
        assert!(matches!(e, EngineError::Transition(_)));
        assert!(e.to_string().contains("invalid transition 'submit'"));
    }
}
