//! Analyze-then-rewrite workflow.
//!
//! Structure:
//! - `state.rs`: inputs and the two request slots
//! - `events.rs`: events in, effects out
//! - `update.rs`: pure reducer
//! - `task.rs`: task ids used to drop superseded completions
//! - `runtime.rs`: executes effects against the API client

mod events;
mod runtime;
mod state;
mod task;
mod update;

pub use events::{AnalysisRequest, WorkflowEffect, WorkflowEvent};
pub use runtime::WorkflowRuntime;
pub use state::{InputMode, Operation, RequestOutcome, WorkflowState};
pub use task::{TaskId, TaskSeq, TaskState};
pub use update::update;
