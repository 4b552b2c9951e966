//! Task module - task records, deadlines, and status derivation.
//!
//! - `task`: the record mirrored from the storage collaborator
//! - `deadline`: deadline text and the instant it names
//! - `status`: the pure `(deadline, completed, now) -> label` evaluator

pub mod deadline;
pub mod status;
pub mod task;

pub use deadline::Deadline;
pub use status::{evaluate, humanize_future, StatusLabel};
pub use task::{Task, TaskId, TaskPatch};
