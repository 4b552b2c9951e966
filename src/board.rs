//! Task board - the entry points a presentation layer drives.
//!
//! Each mutation that touches the remote store runs the remote call first
//! with no lock held, then applies its result in one write-locked step. A
//! failed remote call leaves the local mirror exactly as it was.
//!
//! Completion is local-only: the remote store has no field for it.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, Mutex};

use crate::clock::{Clock, SharedClock};
use crate::filter::{FilterEngine, FilterSelector};
use crate::remote::{DeleteOutcome, RemoteError, SharedBackend};
use crate::store::{SharedTaskStore, StoreError, TaskStore};
use crate::task::{Task, TaskId, TaskPatch};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("Task store unavailable: {0}")]
    RemoteUnavailable(#[source] RemoteError),

    #[error("Task not found: {0}")]
    NotFound(TaskId),

    #[error("Task id already present: {0}")]
    Conflict(TaskId),
}

impl From<RemoteError> for BoardError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::NotFound(id) => Self::NotFound(id),
            other => Self::RemoteUnavailable(other),
        }
    }
}

impl From<StoreError> for BoardError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::DuplicateId(id) => Self::Conflict(id),
        }
    }
}

pub type BoardResult<T> = Result<T, BoardError>;

/// A task as handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRow {
    pub id: TaskId,
    pub subject: String,
    pub name: String,
    pub deadline: Option<String>,
    /// Deadline as `yyyy-MM-dd HH:mm` local time, when it could be read.
    pub deadline_display: Option<String>,
    pub completed: bool,
    pub status: String,
}

impl From<&Task> for TaskRow {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            subject: task.subject.clone(),
            name: task.name.clone(),
            deadline: task.deadline.as_ref().map(|d| d.raw().to_string()),
            deadline_display: task.deadline.as_ref().and_then(|d| d.display()),
            completed: task.completed,
            status: task.status.to_string(),
        }
    }
}

pub struct TaskBoard {
    store: SharedTaskStore,
    backend: SharedBackend,
    clock: SharedClock,
    filter: Mutex<FilterEngine>,
    changes: watch::Sender<u64>,
}

impl TaskBoard {
    pub fn new(
        store: SharedTaskStore,
        backend: SharedBackend,
        clock: SharedClock,
        selector: FilterSelector,
    ) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            store,
            backend,
            clock,
            filter: Mutex::new(FilterEngine::new(selector)),
            changes,
        }
    }

    /// The mirror the ticker should drive.
    pub fn store(&self) -> SharedTaskStore {
        Arc::clone(&self.store)
    }

    /// Store revision published after every board mutation.
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Re-derive statuses immediately and announce the new revision.
    fn commit(&self, store: &mut TaskStore) {
        store.apply_statuses(self.clock.now());
        self.changes.send_replace(store.revision());
    }

    /// Replace the mirror with the remote store's current list.
    pub async fn load(&self) -> BoardResult<usize> {
        let tasks = self.backend.list_tasks().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to fetch tasks");
            BoardError::from(e)
        })?;

        let mut store = self.store.write().await;
        store.replace_all(tasks);
        self.commit(&mut store);
        tracing::info!(count = store.len(), "Loaded tasks from task store");
        Ok(store.len())
    }

    pub async fn add_task(&self, draft: TaskPatch) -> BoardResult<TaskRow> {
        let created = self.backend.create_task(&draft).await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to add task");
            BoardError::from(e)
        })?;

        let id = created.id.clone();
        let mut store = self.store.write().await;
        store.upsert(created);
        self.commit(&mut store);
        tracing::info!(%id, "Task added");
        row_of(&store, &id)
    }

    pub async fn edit_task(&self, id: &TaskId, patch: TaskPatch) -> BoardResult<TaskRow> {
        self.ensure_known(id).await?;

        let updated = self.backend.update_task(id, &patch).await.map_err(|e| {
            tracing::warn!(%id, error = %e, "Failed to update task");
            BoardError::from(e)
        })?;

        let mut store = self.store.write().await;
        store.update(id, &TaskPatch::from(&updated))?;
        self.commit(&mut store);
        tracing::info!(%id, "Task updated");
        row_of(&store, id)
    }

    /// Delete remotely, then locally.
    ///
    /// If the remote store no longer has the task, the stale local copy is
    /// dropped and `NotFound` is still reported.
    pub async fn delete_task(&self, id: &TaskId) -> BoardResult<()> {
        self.ensure_known(id).await?;

        let outcome = self.backend.delete_task(id).await.map_err(|e| {
            tracing::warn!(%id, error = %e, "Failed to delete task");
            BoardError::from(e)
        })?;

        let mut store = self.store.write().await;
        // A concurrent delete may already have removed it locally.
        let removed = store.remove(id).is_ok();
        if removed {
            self.commit(&mut store);
        }

        match outcome {
            DeleteOutcome::Deleted if removed => {
                tracing::info!(%id, "Task deleted");
                Ok(())
            }
            DeleteOutcome::Deleted => Err(BoardError::NotFound(id.clone())),
            DeleteOutcome::NotFound => {
                tracing::warn!(%id, "Task was already gone from the task store");
                Err(BoardError::NotFound(id.clone()))
            }
        }
    }

    /// Mark a task complete. Local only, idempotent.
    pub async fn complete_task(&self, id: &TaskId) -> BoardResult<TaskRow> {
        let mut store = self.store.write().await;
        store.mark_complete(id)?;
        self.commit(&mut store);
        tracing::info!(%id, "Task completed");
        row_of(&store, id)
    }

    pub async fn selector(&self) -> FilterSelector {
        self.filter.lock().await.selector()
    }

    /// Change the selector and return the newly visible rows.
    pub async fn select_filter(&self, selector: FilterSelector) -> Vec<TaskRow> {
        let store = self.store.read().await;
        let mut filter = self.filter.lock().await;
        filter.select(selector);
        self.changes.send_replace(store.revision());
        filter.view(&store).iter().map(TaskRow::from).collect()
    }

    /// Rows visible under the current selector.
    pub async fn visible(&self) -> Vec<TaskRow> {
        let store = self.store.read().await;
        let mut filter = self.filter.lock().await;
        filter.view(&store).iter().map(TaskRow::from).collect()
    }

    /// Rows visible under `selector`, leaving the current selector alone.
    pub async fn visible_with(&self, selector: FilterSelector) -> Vec<TaskRow> {
        let store = self.store.read().await;
        let mut filter = self.filter.lock().await;
        filter
            .view_with(&store, selector)
            .iter()
            .map(TaskRow::from)
            .collect()
    }

    pub async fn revision(&self) -> u64 {
        self.store.read().await.revision()
    }

    async fn ensure_known(&self, id: &TaskId) -> BoardResult<()> {
        if self.store.read().await.get(id).is_some() {
            Ok(())
        } else {
            Err(BoardError::NotFound(id.clone()))
        }
    }
}

fn row_of(store: &TaskStore, id: &TaskId) -> BoardResult<TaskRow> {
    store
        .get(id)
        .map(TaskRow::from)
        .ok_or_else(|| BoardError::NotFound(id.clone()))
}

pub type SharedBoard = Arc<TaskBoard>;
