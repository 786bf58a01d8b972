//! Variant registration.
//!
//! Replaces runtime subclass discovery with an explicit registration call:
//! each workflow variant registers its validated table and its transition
//! handler map into a named family at startup. All definition-time errors
//! surface here, before any record exists.

use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::ApplyHandle;
use crate::error::{DefinitionError, EngineError};
use crate::store::RecordStore;
use crate::workflow::{WorkflowFamily, WorkflowTable};

/// A user-supplied transition implementation.
///
/// Invoked by the guard with an [`ApplyHandle`] whose `apply()` is the bound
/// concurrency-safe commit for the transition being invoked. The handler
/// decides when (or whether) to call it, and can wrap business logic around
/// the state change without re-implementing validation.
pub type TransitionHandler<S> =
    Box<dyn Fn(&mut ApplyHandle<'_, S>) -> Result<(), EngineError> + Send + Sync>;

/// Explicit mapping from transition name to handler, supplied at variant
/// registration.
pub struct TransitionHandlers<S: RecordStore> {
    map: HashMap<String, TransitionHandler<S>>,
}

impl<S: RecordStore> TransitionHandlers<S> {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Attach a handler for one named transition.
    pub fn on<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut ApplyHandle<'_, S>) -> Result<(), EngineError> + Send + Sync + 'static,
    {
        self.map.insert(name.into(), Box::new(handler));
        self
    }

    /// Handlers whose entire effect is the guarded state change — the
    /// common case where an operation has no extra business logic.
    pub fn pass_through(names: &[&str]) -> Self {
        let mut handlers = Self::new();
        for name in names {
            handlers = handlers.on(*name, |handle| {
                handle.apply()?;
                Ok(())
            });
        }
        handlers
    }

    fn names(&self) -> Vec<&str> {
        self.map.keys().map(String::as_str).collect()
    }
}

impl<S: RecordStore> Default for TransitionHandlers<S> {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct Variant<S: RecordStore> {
    pub(crate) table: Arc<WorkflowTable>,
    pub(crate) family: String,
    handlers: HashMap<String, TransitionHandler<S>>,
}

/// Process-wide registry of workflow variants and their families.
///
/// Built once at startup, immutable afterwards, shared read-only by all
/// callers through the engine.
pub struct Registry<S: RecordStore> {
    families: HashMap<String, WorkflowFamily>,
    variants: HashMap<String, Variant<S>>,
}

impl<S: RecordStore> Registry<S> {
    pub fn new() -> Self {
        Self {
            families: HashMap::new(),
            variants: HashMap::new(),
        }
    }

    /// Register one variant into a named family.
    ///
    /// Validates eagerly, in order: the variant name is unused, the handler
    /// names match the table's declared transitions exactly
    /// ([`DefinitionError::InvalidTransitionMethod`]), and the table's
    /// states aggregate into the family without label conflicts.
    pub fn register_variant(
        &mut self,
        family: impl Into<String>,
        table: WorkflowTable,
        handlers: TransitionHandlers<S>,
    ) -> Result<(), DefinitionError> {
        let family = family.into();
        let name = table.name().to_string();

        if self.variants.contains_key(&name) {
            return Err(DefinitionError::DuplicateVariant(name));
        }
        table.check_transition_methods(&handlers.names())?;

        let table = Arc::new(table);
        self.families
            .entry(family.clone())
            .or_insert_with(|| WorkflowFamily::new(family.clone()))
            .register(Arc::clone(&table))?;

        self.variants.insert(
            name,
            Variant {
                table,
                family,
                handlers: handlers.map,
            },
        );
        Ok(())
    }

    pub(crate) fn variant(&self, name: &str) -> Result<&Variant<S>, DefinitionError> {
        self.variants
            .get(name)
            .ok_or_else(|| DefinitionError::UnknownVariant(name.to_string()))
    }

    /// The validated table for a variant.
    pub fn table(&self, variant: &str) -> Result<&Arc<WorkflowTable>, DefinitionError> {
        self.variant(variant).map(|v| &v.table)
    }

    /// A registered family, for aggregated introspection.
    pub fn family(&self, name: &str) -> Result<&WorkflowFamily, DefinitionError> {
        self.families
            .get(name)
            .ok_or_else(|| DefinitionError::UnknownFamily(name.to_string()))
    }

    pub(crate) fn handler(&self, variant: &str, transition: &str) -> Option<&TransitionHandler<S>> {
        self.variants.get(variant)?.handlers.get(transition)
    }
}

impl<S: RecordStore> Default for Registry<S> {
    fn default() -> Self {
        Self::new()
    }
}
