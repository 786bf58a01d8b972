mod family;
mod table;

pub use family::WorkflowFamily;
pub use table::{State, Transition, WorkflowTable};
