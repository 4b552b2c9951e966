//! Storage collaborator interface.
//!
//! The remote task store owns ids and persists subject, name and deadline.
//! Completion and derived status are never sent to it.
//!
//! - `http`: the `/api/tasks` JSON protocol over reqwest
//! - `memory`: an in-process store for offline runs and tests

pub mod http;
pub mod memory;

pub use http::HttpTaskBackend;
pub use memory::InMemoryBackend;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::task::{Task, TaskId, TaskPatch};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("Request to task store failed: {0}")]
    Network(String),

    #[error("Task store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode task store response: {0}")]
    Decode(String),

    #[error("Task not found in task store: {0}")]
    NotFound(TaskId),

    #[error("Task store unavailable: {0}")]
    Unavailable(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Result of a delete call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Request/response access to the remote task store.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    /// Create a task; the store assigns the id.
    async fn create_task(&self, draft: &TaskPatch) -> RemoteResult<Task>;

    /// All tasks, in the store's order.
    async fn list_tasks(&self) -> RemoteResult<Vec<Task>>;

    /// Replace the editable fields of a task.
    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> RemoteResult<Task>;

    async fn delete_task(&self, id: &TaskId) -> RemoteResult<DeleteOutcome>;
}

pub type SharedBackend = Arc<dyn TaskBackend>;
