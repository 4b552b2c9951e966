//! In-memory mirror of the task list.
//!
//! Holds tasks in insertion order and applies mutations. The store never
//! talks to the collaborator and never decides what a status should be; it
//! only writes statuses handed to it by [`TaskStore::apply_statuses`].

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::task::{Task, TaskId, TaskPatch};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Task not found: {0}")]
    NotFound(TaskId),

    #[error("Task already exists: {0}")]
    DuplicateId(TaskId),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Whether an upsert replaced an existing task or appended a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Replaced,
    Appended,
}

#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    /// Bumped on every observable change, status rewrites included.
    revision: u64,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from an ordered list, dropping later duplicates of an id.
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        let mut store = Self::new();
        store.replace_all(tasks);
        store
    }

    pub fn list(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn position(&self, id: &TaskId) -> StoreResult<usize> {
        self.tasks
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// Append a task. Ids must stay unique.
    pub fn add(&mut self, task: Task) -> StoreResult<()> {
        if self.get(&task.id).is_some() {
            return Err(StoreError::DuplicateId(task.id));
        }
        self.tasks.push(task);
        self.bump();
        Ok(())
    }

    /// Replace the task with the same id in place, or append it.
    ///
    /// A replaced task keeps its local completion flag, since the collaborator
    /// never reports one.
    pub fn upsert(&mut self, mut task: Task) -> Upserted {
        let outcome = match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => {
                task.completed |= existing.completed;
                *existing = task;
                Upserted::Replaced
            }
            None => {
                self.tasks.push(task);
                Upserted::Appended
            }
        };
        self.bump();
        outcome
    }

    /// Apply the editable fields; completion and status are untouched.
    pub fn update(&mut self, id: &TaskId, patch: &TaskPatch) -> StoreResult<&Task> {
        let idx = self.position(id)?;
        self.tasks[idx].apply(patch);
        self.bump();
        Ok(&self.tasks[idx])
    }

    /// Set the completion flag. Marking an already completed task is a no-op.
    pub fn mark_complete(&mut self, id: &TaskId) -> StoreResult<&Task> {
        let idx = self.position(id)?;
        if !self.tasks[idx].completed {
            self.tasks[idx].completed = true;
            self.bump();
        }
        Ok(&self.tasks[idx])
    }

    /// Remove by id, returning the removed task.
    pub fn remove(&mut self, id: &TaskId) -> StoreResult<Task> {
        let idx = self.position(id)?;
        let task = self.tasks.remove(idx);
        self.bump();
        Ok(task)
    }

    /// Swap in a freshly listed set of tasks.
    ///
    /// Completion flags already known locally survive the reload.
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        let completed: HashSet<TaskId> = self
            .tasks
            .iter()
            .filter(|t| t.completed)
            .map(|t| t.id.clone())
            .collect();

        let mut seen = HashSet::new();
        let mut next = Vec::with_capacity(tasks.len());
        for mut task in tasks {
            if !seen.insert(task.id.clone()) {
                tracing::warn!(id = %task.id, "Dropping duplicate task id from listing");
                continue;
            }
            task.completed |= completed.contains(&task.id);
            next.push(task);
        }
        self.tasks = next;
        self.bump();
    }

    /// Re-derive every task's status at `now`. Returns how many changed.
    pub fn apply_statuses(&mut self, now: DateTime<Utc>) -> usize {
        let changed = self
            .tasks
            .iter_mut()
            .map(|task| task.refresh_status(now))
            .filter(|changed| *changed)
            .count();
        if changed > 0 {
            self.bump();
        }
        changed
    }
}

/// Store shared between the board, the ticker and the API.
pub type SharedTaskStore = Arc<RwLock<TaskStore>>;

pub fn shared(store: TaskStore) -> SharedTaskStore {
    Arc::new(RwLock::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Deadline, StatusLabel};
    use chrono::{Duration, TimeZone};

    fn sample() -> TaskStore {
        TaskStore::from_tasks(vec![
            Task::new("1", "Kalkulus", "Latihan 1", None),
            Task::new("2", "Fisika", "Laporan", None),
            Task::new("3", "Kimia", "Praktikum", None),
        ])
    }

    fn ids(store: &TaskStore) -> Vec<&str> {
        store.list().iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let mut store = sample();
        store.add(Task::new("0", "Agama", "Essay", None)).unwrap();
        assert_eq!(ids(&store), vec!["1", "2", "3", "0"]);
    }

    #[test]
    fn test_add_rejects_duplicate_id() {
        let mut store = sample();
        let err = store.add(Task::new("2", "x", "y", None)).unwrap_err();
        assert_eq!(err, StoreError::DuplicateId(TaskId::new("2")));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_update_only_editable_fields() {
        let mut store = sample();
        store.mark_complete(&TaskId::new("2")).unwrap();
        let patch = TaskPatch::new("Fisika Dasar", "Laporan 2", Deadline::parse("2030-01-01T00:00:00Z"));
        let task = store.update(&TaskId::new("2"), &patch).unwrap();
        assert_eq!(task.subject, "Fisika Dasar");
        assert!(task.completed);
        assert_eq!(ids(&store), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let mut store = sample();
        let err = store
            .update(&TaskId::new("9"), &TaskPatch::default())
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound(TaskId::new("9")));
    }

    #[test]
    fn test_mark_complete_is_idempotent() {
        let mut once = sample();
        once.mark_complete(&TaskId::new("1")).unwrap();

        let mut twice = sample();
        twice.mark_complete(&TaskId::new("1")).unwrap();
        let revision = twice.revision();
        twice.mark_complete(&TaskId::new("1")).unwrap();

        assert_eq!(once.list(), twice.list());
        assert_eq!(twice.revision(), revision);
    }

    #[test]
    fn test_remove_missing_leaves_list_unchanged() {
        let mut store = sample();
        let before = store.list().to_vec();
        let err = store.remove(&TaskId::new("404")).unwrap_err();
        assert_eq!(err, StoreError::NotFound(TaskId::new("404")));
        assert_eq!(store.list(), before.as_slice());
    }

    #[test]
    fn test_remove_keeps_relative_order() {
        let mut store = sample();
        let removed = store.remove(&TaskId::new("2")).unwrap();
        assert_eq!(removed.name, "Laporan");
        assert_eq!(ids(&store), vec!["1", "3"]);
    }

    #[test]
    fn test_upsert_replaces_in_place_and_keeps_completion() {
        let mut store = sample();
        store.mark_complete(&TaskId::new("2")).unwrap();
        let outcome = store.upsert(Task::new("2", "Fisika", "Laporan final", None));
        assert_eq!(outcome, Upserted::Replaced);
        assert_eq!(ids(&store), vec!["1", "2", "3"]);
        let task = store.get(&TaskId::new("2")).unwrap();
        assert_eq!(task.name, "Laporan final");
        assert!(task.completed);

        assert_eq!(store.upsert(Task::new("4", "a", "b", None)), Upserted::Appended);
        assert_eq!(ids(&store), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_replace_all_dedupes_and_keeps_completion() {
        let mut store = sample();
        store.mark_complete(&TaskId::new("3")).unwrap();
        store.replace_all(vec![
            Task::new("3", "Kimia", "Praktikum", None),
            Task::new("5", "Biologi", "Poster", None),
            Task::new("3", "dup", "dup", None),
        ]);
        assert_eq!(ids(&store), vec!["3", "5"]);
        assert!(store.get(&TaskId::new("3")).unwrap().completed);
        assert_eq!(store.get(&TaskId::new("3")).unwrap().name, "Praktikum");
    }

    #[test]
    fn test_apply_statuses_counts_and_bumps_revision() {
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
        let mut store = TaskStore::from_tasks(vec![
            Task::new("1", "a", "b", Some(Deadline::at(now + Duration::seconds(30)))),
            Task::new("2", "a", "b", None),
        ]);
        let rev = store.revision();
        // Task 2 already shows NoDeadline, so only task 1 changes.
        assert_eq!(store.apply_statuses(now), 1);
        assert_eq!(store.revision(), rev + 1);
        assert_eq!(store.apply_statuses(now), 0);
        assert_eq!(store.revision(), rev + 1);
        assert_eq!(
            store.get(&TaskId::new("1")).unwrap().status,
            StatusLabel::CountdownSeconds(30)
        );
    }
}
