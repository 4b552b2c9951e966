//! In-process task store.
//!
//! Assigns sequential numeric ids like the original store did. Can be
//! switched offline to exercise the failure paths of callers.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;

use super::{DeleteOutcome, RemoteError, RemoteResult, TaskBackend};
use crate::task::{Task, TaskId, TaskPatch};

#[derive(Debug)]
pub struct InMemoryBackend {
    tasks: RwLock<Vec<Task>>,
    next_id: AtomicU64,
    online: AtomicBool,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            online: AtomicBool::new(true),
        }
    }

    /// Seed with existing records. Ids are kept; new ids continue after them.
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let next = tasks
            .iter()
            .filter_map(|t| t.id.as_str().parse::<u64>().ok())
            .max()
            .map_or(1, |max| max + 1);
        Self {
            tasks: RwLock::new(tasks.into_iter().map(stored).collect()),
            next_id: AtomicU64::new(next),
            online: AtomicBool::new(true),
        }
    }

    /// While offline every call fails with [`RemoteError::Unavailable`].
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Snapshot of what the store holds.
    pub async fn snapshot(&self) -> Vec<Task> {
        self.tasks.read().await.clone()
    }

    fn ensure_online(&self) -> RemoteResult<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RemoteError::Unavailable("in-memory store is offline".to_string()))
        }
    }
}

/// Strip local-only state; the store does not persist it.
fn stored(mut task: Task) -> Task {
    task.completed = false;
    task.status = Default::default();
    task
}

#[async_trait]
impl TaskBackend for InMemoryBackend {
    async fn create_task(&self, draft: &TaskPatch) -> RemoteResult<Task> {
        self.ensure_online()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let task = Task::new(
            id.to_string(),
            draft.subject.clone(),
            draft.name.clone(),
            draft.deadline.clone(),
        );
        self.tasks.write().await.push(task.clone());
        Ok(task)
    }

    async fn list_tasks(&self) -> RemoteResult<Vec<Task>> {
        self.ensure_online()?;
        Ok(self.snapshot().await)
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> RemoteResult<Task> {
        self.ensure_online()?;
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| RemoteError::NotFound(id.clone()))?;
        task.apply(patch);
        Ok(task.clone())
    }

    async fn delete_task(&self, id: &TaskId) -> RemoteResult<DeleteOutcome> {
        self.ensure_online()?;
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|t| &t.id != id);
        if tasks.len() == before {
            Ok(DeleteOutcome::NotFound)
        } else {
            Ok(DeleteOutcome::Deleted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_ids_continue_after_seed() {
        let backend = InMemoryBackend::with_tasks(vec![
            Task::new("3", "a", "b", None),
            Task::new("legacy", "a", "b", None),
        ]);
        let created = assert_ok!(backend.create_task(&TaskPatch::new("c", "d", None)).await);
        assert_eq!(created.id, TaskId::new("4"));
        assert_eq!(backend.snapshot().await.len(), 3);
    }

    #[tokio::test]
    async fn test_offline_rejects_everything() {
        let backend = InMemoryBackend::new();
        backend.set_online(false);
        assert_err!(backend.list_tasks().await);
        assert_err!(backend.create_task(&TaskPatch::default()).await);
        assert_err!(backend.delete_task(&TaskId::new("1")).await);
        assert!(backend.snapshot().await.is_empty());

        backend.set_online(true);
        assert_ok!(backend.list_tasks().await);
    }

    #[tokio::test]
    async fn test_delete_reports_missing() {
        let backend = InMemoryBackend::new();
        let created = backend.create_task(&TaskPatch::new("a", "b", None)).await.unwrap();
        assert_eq!(
            backend.delete_task(&created.id).await.unwrap(),
            DeleteOutcome::Deleted
        );
        assert_eq!(
            backend.delete_task(&created.id).await.unwrap(),
            DeleteOutcome::NotFound
        );
    }
}
