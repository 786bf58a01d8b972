//! lockstep — a workflow engine with optimistic-concurrency state
//! transitions and audit history.
//!
//! Applications declare, per entity type, a finite set of named states and
//! named transitions between them, then execute transitions against
//! persisted records safely under concurrent access. Declarations are
//! validated eagerly at registration, before any record exists; the commit
//! path is a version-gated conditional update against the store with a
//! bounded retry, and every successful change appends to an append-only
//! history.
//!
//! ```
//! use lockstep::{
//!     Engine, MemoryStore, Registry, State, Transition, TransitionHandlers, WorkflowTable,
//! };
//!
//! # fn main() -> Result<(), lockstep::EngineError> {
//! let table = WorkflowTable::register(
//!     "OrderWorkflow",
//!     vec![State::new("start", "Start"), State::new("end", "End")],
//!     vec![Transition::new("finish", "start", "end")],
//! )?;
//!
//! let mut registry = Registry::new();
//! registry.register_variant(
//!     "ProviderOrder",
//!     table,
//!     TransitionHandlers::pass_through(&["finish"]),
//! )?;
//! let engine = Engine::new(MemoryStore::new(), registry);
//!
//! let mut record = engine.create_record("OrderWorkflow")?;
//! assert!(engine.invoke(&mut record, "finish")?);
//! assert_eq!(record.state, "end");
//! # Ok(())
//! # }
//! ```

mod config;
mod engine;
mod error;
pub mod history;
mod record;
mod registry;
mod store;
mod workflow;

pub use config::EngineConfig;
pub use engine::{ApplyHandle, Engine};
pub use error::{DefinitionError, EngineError, StoreError, TransitionError};
pub use history::{CREATION_STATE, HistoryEntry};
pub use record::{Record, make_uid};
pub use registry::{Registry, TransitionHandler, TransitionHandlers};
pub use store::{MemoryStore, RecordStore};
pub use workflow::{State, Transition, WorkflowFamily, WorkflowTable};
