//! Completion filtering.
//!
//! Filtering looks at the completion flag only. An expired task is still
//! incomplete; a display label is never string-matched.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::store::TaskStore;
use crate::task::Task;

/// Which tasks are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterSelector {
    #[default]
    All,
    #[serde(rename = "completed")]
    CompletedOnly,
    #[serde(rename = "incomplete")]
    IncompleteOnly,
}

impl FilterSelector {
    pub const ALL: [FilterSelector; 3] = [Self::All, Self::CompletedOnly, Self::IncompleteOnly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::CompletedOnly => "completed",
            Self::IncompleteOnly => "incomplete",
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::CompletedOnly => task.completed,
            Self::IncompleteOnly => !task.completed,
        }
    }
}

impl fmt::Display for FilterSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown filter '{0}' (expected all, completed or incomplete)")]
pub struct UnknownFilter(pub String);

impl FromStr for FilterSelector {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "completed" | "done" => Ok(Self::CompletedOnly),
            "incomplete" | "pending" => Ok(Self::IncompleteOnly),
            other => Err(UnknownFilter(other.to_string())),
        }
    }
}

/// Select the visible tasks, preserving input order.
pub fn filter<'a, I>(tasks: I, selector: FilterSelector) -> Vec<Task>
where
    I: IntoIterator<Item = &'a Task>,
{
    tasks
        .into_iter()
        .filter(|task| selector.matches(task))
        .cloned()
        .collect()
}

/// Holds the current selector and the last computed view.
///
/// The view is recomputed in full whenever the store revision or the
/// selector differs from the one it was built from.
#[derive(Debug, Default)]
pub struct FilterEngine {
    selector: FilterSelector,
    cached: Option<CachedView>,
}

#[derive(Debug)]
struct CachedView {
    revision: u64,
    selector: FilterSelector,
    tasks: Vec<Task>,
}

impl FilterEngine {
    pub fn new(selector: FilterSelector) -> Self {
        Self {
            selector,
            cached: None,
        }
    }

    pub fn selector(&self) -> FilterSelector {
        self.selector
    }

    pub fn select(&mut self, selector: FilterSelector) {
        self.selector = selector;
    }

    /// Visible tasks for the current selector.
    pub fn view(&mut self, store: &TaskStore) -> &[Task] {
        let selector = self.selector;
        self.view_with(store, selector)
    }

    /// Visible tasks for an explicit selector, without changing the current one.
    pub fn view_with(&mut self, store: &TaskStore, selector: FilterSelector) -> &[Task] {
        let revision = store.revision();
        let stale = self
            .cached
            .as_ref()
            .map_or(true, |c| c.revision != revision || c.selector != selector);
        if stale {
            tracing::trace!(revision, %selector, "Recomputing filtered view");
            self.cached = Some(CachedView {
                revision,
                selector,
                tasks: filter(store.list(), selector),
            });
        }
        self.cached
            .as_ref()
            .map(|c| c.tasks.as_slice())
            .unwrap_or_default()
    }
}
