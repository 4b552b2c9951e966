//! Task record as mirrored from the storage collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::deadline::{self, Deadline};
use super::status::{evaluate, StatusLabel};

/// Identifier assigned by the storage collaborator.
///
/// Collaborators hand out either numbers or strings; both are kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(i64),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Text(text) => Ok(Self(text)),
            RawId::Number(n) => Ok(Self(n.to_string())),
        }
    }
}

/// A deadline-bound task.
///
/// `completed` and `status` are local-only: the collaborator never stores
/// them, and any `status` it sends back is ignored when deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "deadline::deserialize_optional")]
    pub deadline: Option<Deadline>,
    #[serde(skip)]
    pub completed: bool,
    #[serde(skip)]
    pub status: StatusLabel,
}

impl Task {
    pub fn new(
        id: impl Into<TaskId>,
        subject: impl Into<String>,
        name: impl Into<String>,
        deadline: Option<Deadline>,
    ) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            name: name.into(),
            deadline,
            completed: false,
            status: StatusLabel::default(),
        }
    }

    /// Status this task should show at `now`.
    pub fn status_at(&self, now: DateTime<Utc>) -> StatusLabel {
        evaluate(self.deadline.as_ref(), self.completed, now)
    }

    /// Recompute the derived status. Returns true if it changed.
    pub fn refresh_status(&mut self, now: DateTime<Utc>) -> bool {
        let next = self.status_at(now);
        if next == self.status {
            return false;
        }
        self.status = next;
        true
    }

    /// Apply the editable fields of a patch.
    pub fn apply(&mut self, patch: &TaskPatch) {
        self.subject.clone_from(&patch.subject);
        self.name.clone_from(&patch.name);
        self.deadline.clone_from(&patch.deadline);
    }
}

/// The user-editable fields of a task.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "deadline::deserialize_optional")]
    pub deadline: Option<Deadline>,
}

impl TaskPatch {
    pub fn new(
        subject: impl Into<String>,
        name: impl Into<String>,
        deadline: Option<Deadline>,
    ) -> Self {
        Self {
            subject: subject.into(),
            name: name.into(),
            deadline,
        }
    }
}

impl From<&Task> for TaskPatch {
    fn from(task: &Task) -> Self {
        Self {
            subject: task.subject.clone(),
            name: task.name.clone(),
            deadline: task.deadline.clone(),
        }
    }
}
