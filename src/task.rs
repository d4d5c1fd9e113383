//! Task descriptors and the action contract.
//!
//! This module provides the core abstractions for schedulable units of work:
//! the [`TaskAction`] trait, the immutable [`Task`] descriptor, the
//! [`TaskContext`] handed to running actions, and action-level errors.
//!
//! # Design Principles
//!
//! - **Opaque**: the orchestrator never inspects what an action does; it only
//!   observes succeeded or failed-with-error
//! - **Immutable**: a task is registered once and read-only thereafter
//! - **Observable**: actions can emit events through their context for
//!   monitoring and test capture
//!
//! # Examples
//!
//! ```
//! use taskwave::task::{Task, TaskContext, TaskError};
//!
//! // Closure form, for simple actions:
//! let fetch = Task::from_fn("fetch", &[], |ctx: TaskContext| async move {
//!     ctx.emit("io", "fetching input")?;
//!     Ok(())
//! });
//!
//! // "parse" only runs after "fetch" has completed successfully.
//! let parse = Task::from_fn("parse", &["fetch"], |_ctx| async move { Ok(()) });
//! assert_eq!(parse.id().as_str(), "parse");
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event_bus::Event;

/// Opaque, caller-chosen task identifier, unique within one graph.
///
/// Identity and equality of a task are defined solely by its id. Ids are
/// ordered lexicographically, which the validator and scheduler use to keep
/// error reporting and launch order deterministic.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Cooperative cancellation signal shared between the scheduler and in-flight
/// actions.
///
/// On the first task failure the scheduler flips the signal; running siblings
/// may observe it via [`is_cancelled`](Self::is_cancelled) or await
/// [`cancelled`](Self::cancelled). Compliance is best-effort: an action that
/// ignores the signal runs to completion and its side effects remain visible.
#[derive(Clone, Debug)]
pub struct CancelSignal {
    rx: tokio::sync::watch::Receiver<bool>,
}

/// Sender half of a [`CancelSignal`], held by the scheduler.
#[derive(Debug)]
pub(crate) struct CancelHandle {
    tx: tokio::sync::watch::Sender<bool>,
}

impl CancelSignal {
    pub(crate) fn new() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = tokio::sync::watch::channel(false);
        (CancelHandle { tx }, CancelSignal { rx })
    }

    /// Returns true once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when cancellation is requested. Never resolves on a run that
    /// completes without failure, so callers should race it against their own
    /// work (e.g. with `tokio::select!`).
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                // Scheduler dropped without signalling: the run is over.
                return;
            }
        }
    }
}

impl CancelHandle {
    pub(crate) fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Execution context passed to actions while they run.
///
/// Carries the task's identity, the run id of the owning execution, an event
/// channel for observability, and the cooperative [`CancelSignal`].
#[derive(Clone, Debug)]
pub struct TaskContext {
    /// Id of the task this action belongs to.
    pub task_id: TaskId,
    /// Identifier of the `execute()` run this action is part of.
    pub run_id: String,
    /// Channel for emitting events to the orchestrator's event bus.
    pub event_sender: flume::Sender<Event>,
    /// Cooperative cancellation signal for this run.
    pub cancel: CancelSignal,
}

impl TaskContext {
    /// Emit a task-scoped event enriched with this context's metadata.
    pub fn emit(
        &self,
        scope: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<(), TaskContextError> {
        self.event_sender
            .send(Event::task_message(
                self.task_id.clone(),
                self.run_id.clone(),
                scope,
                message,
            ))
            .map_err(|_| TaskContextError::EventBusUnavailable)
    }
}

/// Errors that can occur when using [`TaskContext`] methods.
#[derive(Debug, Error, Diagnostic)]
pub enum TaskContextError {
    /// Event could not be sent because the event bus has shut down.
    #[error("failed to emit event: event bus unavailable")]
    #[diagnostic(
        code(taskwave::task::event_bus_unavailable),
        help("The event bus may be disconnected. Check orchestrator lifecycle.")
    )]
    EventBusUnavailable,
}

/// Errors reported by task actions.
///
/// The orchestrator treats these as opaque: any variant aborts the run and is
/// wrapped in [`OrchestrationError::TaskFailed`](crate::orchestrator::OrchestrationError::TaskFailed).
#[derive(Debug, Error, Diagnostic)]
pub enum TaskError {
    /// Free-form failure message from the action.
    #[error("{0}")]
    #[diagnostic(code(taskwave::task::message))]
    Message(String),

    /// The action observed the cancellation signal and stopped early.
    #[error("task stopped after observing cancellation")]
    #[diagnostic(code(taskwave::task::cancelled))]
    Cancelled,

    /// Event bus communication error.
    #[error("event bus error: {0}")]
    #[diagnostic(code(taskwave::task::event_bus))]
    EventBus(#[from] TaskContextError),

    /// Arbitrary underlying error from the action's own domain.
    #[error(transparent)]
    #[diagnostic(code(taskwave::task::source))]
    Source(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl TaskError {
    /// Convenience constructor for free-form failures.
    pub fn msg(message: impl Into<String>) -> Self {
        TaskError::Message(message.into())
    }
}

/// Core trait defining a schedulable unit of work.
///
/// An action takes no input beyond its [`TaskContext`] and has exactly one
/// observable outcome: succeeded or failed-with-error. I/O, computation, and
/// suspension behavior are entirely the implementor's responsibility.
#[async_trait]
pub trait TaskAction: Send + Sync {
    /// Execute this action.
    async fn run(&self, ctx: TaskContext) -> Result<(), TaskError>;
}

/// Adapter turning an async closure into a [`TaskAction`].
///
/// Keeps simple actions as stored function values instead of one-off structs.
pub struct TaskFn<F> {
    f: F,
}

impl<F> TaskFn<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> TaskAction for TaskFn<F>
where
    F: Fn(TaskContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), TaskError>> + Send,
{
    async fn run(&self, ctx: TaskContext) -> Result<(), TaskError> {
        (self.f)(ctx).await
    }
}

/// Immutable task descriptor: identity, declared prerequisites, and action.
///
/// A task is created by the caller, registered once with an
/// [`Orchestrator`](crate::orchestrator::Orchestrator), and read-only
/// thereafter. An empty dependency set means "runnable immediately".
#[derive(Clone)]
pub struct Task {
    id: TaskId,
    dependencies: FxHashSet<TaskId>,
    action: Arc<dyn TaskAction>,
}

impl Task {
    /// Creates a task from an id, its prerequisite ids, and an action.
    ///
    /// An empty `dependencies` slice means "runnable immediately".
    pub fn new(
        id: impl Into<TaskId>,
        dependencies: &[&str],
        action: impl TaskAction + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            dependencies: dependencies.iter().copied().map(TaskId::from).collect(),
            action: Arc::new(action),
        }
    }

    /// Creates a task whose action is an async closure.
    pub fn from_fn<F, Fut>(id: impl Into<TaskId>, dependencies: &[&str], f: F) -> Self
    where
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        Self::new(id, dependencies, TaskFn::new(f))
    }

    #[must_use]
    pub fn id(&self) -> &TaskId {
        &self.id
    }

    #[must_use]
    pub fn dependencies(&self) -> &FxHashSet<TaskId> {
        &self.dependencies
    }

    #[must_use]
    pub fn action(&self) -> Arc<dyn TaskAction> {
        Arc::clone(&self.action)
    }

    /// Declared prerequisites in lexicographic order, for deterministic
    /// traversal and reporting.
    #[must_use]
    pub fn sorted_dependencies(&self) -> Vec<TaskId> {
        let mut deps: Vec<TaskId> = self.dependencies.iter().cloned().collect();
        deps.sort();
        deps
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("dependencies", &self.sorted_dependencies())
            .finish_non_exhaustive()
    }
}
