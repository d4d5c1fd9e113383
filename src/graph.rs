//! Task registry shared across orchestrator calls.
//!
//! [`TaskGraph`] is the mapping from [`TaskId`] to [`Task`], owned exclusively
//! by one orchestrator instance. It accumulates tasks across `add_task` calls
//! and is conceptually frozen for the duration of one `execute()` call; the
//! orchestrator enforces that through its exclusive-access boundary.

use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::task::{Task, TaskId};

/// Errors arising from task registration.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    /// A task with the same id is already registered.
    ///
    /// Duplicate registration is rejected rather than silently replacing the
    /// existing descriptor.
    #[error("task already registered: {id}")]
    #[diagnostic(
        code(taskwave::graph::duplicate_task),
        help("Pick a unique id per task; re-registration is not supported.")
    )]
    DuplicateTask { id: TaskId },
}

/// Registry of all tasks known to one orchestrator, keyed by id.
#[derive(Clone, Debug, Default)]
pub struct TaskGraph {
    tasks: FxHashMap<TaskId, Arc<Task>>,
}

impl TaskGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a task under its id, rejecting duplicates.
    pub fn insert(&mut self, task: Task) -> Result<(), GraphError> {
        let id = task.id().clone();
        if self.tasks.contains_key(&id) {
            return Err(GraphError::DuplicateTask { id });
        }
        self.tasks.insert(id, Arc::new(task));
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&Arc<Task>> {
        self.tasks.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &TaskId) -> bool {
        self.tasks.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Iterate over registered tasks in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&TaskId, &Arc<Task>)> {
        self.tasks.iter()
    }

    /// All task ids in lexicographic order.
    ///
    /// The validator and scheduler traverse in this order so that error
    /// reporting and launch order do not depend on hash-map iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self.tasks.keys().cloned().collect();
        ids.sort();
        ids
    }
}
