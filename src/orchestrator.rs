//! Public orchestrator surface: registration, validation, execution.
//!
//! An [`Orchestrator`] owns one [`TaskGraph`] behind a single
//! `tokio::sync::Mutex`. Registration and execution both take that lock, and
//! `execute()` holds it for its entire duration, so registrations never race
//! the graph and at most one execution per instance is ever in flight. That
//! serialization is a design invariant, not an incidental property.
//!
//! # Examples
//!
//! ```
//! use taskwave::orchestrator::Orchestrator;
//! use taskwave::task::Task;
//!
//! # async fn example() -> miette::Result<()> {
//! let orchestrator = Orchestrator::new();
//! orchestrator
//!     .add_task(Task::from_fn("fetch", &[], |_| async { Ok(()) }))
//!     .await?;
//! orchestrator
//!     .add_task(Task::from_fn("parse", &["fetch"], |_| async { Ok(()) }))
//!     .await?;
//!
//! // Optional pre-flight check; execute() always re-runs it.
//! orchestrator.validate().await?;
//! orchestrator.execute().await?;
//! # Ok(())
//! # }
//! ```

use miette::Diagnostic;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinError;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::OrchestratorConfig;
use crate::event_bus::{Event, EventBus};
use crate::graph::{GraphError, TaskGraph};
use crate::scheduler;
use crate::task::{CancelSignal, Task, TaskId};
use crate::validation::{self, ValidationError};

/// Terminal errors surfaced by [`Orchestrator::execute`].
///
/// Exactly one error is returned per failed call: either the validation
/// defect found before any action ran, or the first runtime failure observed
/// by the coordination loop. Action errors are always wrapped as
/// [`TaskFailed`](Self::TaskFailed); the raw error stays available as the
/// source.
#[derive(Debug, Error, Diagnostic)]
pub enum OrchestrationError {
    /// Pre-flight validation failed; no task action was invoked.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    /// A task's action reported failure during execution.
    #[error("task {id} failed")]
    #[diagnostic(code(taskwave::orchestrator::task_failed))]
    TaskFailed {
        id: TaskId,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A task's action panicked or its runtime handle was aborted.
    #[error("task join error: {0}")]
    #[diagnostic(code(taskwave::orchestrator::join))]
    Join(#[from] JoinError),
}

/// Dependency-graph task orchestrator.
///
/// Accepts named tasks with declared prerequisites, validates the resulting
/// graph, and executes every task to completion such that a task never starts
/// before all of its prerequisites have succeeded, running independent tasks
/// concurrently.
pub struct Orchestrator {
    graph: Mutex<TaskGraph>,
    event_bus: EventBus,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    /// Creates an orchestrator with an empty graph and default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(OrchestratorConfig::default())
    }

    /// Creates an orchestrator with explicit configuration.
    #[must_use]
    pub fn with_config(config: OrchestratorConfig) -> Self {
        let event_bus = config.event_bus.build_event_bus();
        event_bus.listen_for_events();
        Self {
            graph: Mutex::new(TaskGraph::new()),
            event_bus,
        }
    }

    /// Access the event bus, e.g. to attach extra sinks before executing.
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Registers a task under its id.
    ///
    /// Returns [`GraphError::DuplicateTask`] if the id is already taken.
    /// Registration while an execution is in flight waits for it to finish;
    /// the running execution keeps working on the snapshot it started with.
    pub async fn add_task(&self, task: Task) -> Result<(), GraphError> {
        let mut graph = self.graph.lock().await;
        info!(task = %task.id(), deps = task.dependencies().len(), "registering task");
        graph.insert(task)
    }

    /// Number of registered tasks.
    pub async fn task_count(&self) -> usize {
        self.graph.lock().await.len()
    }

    /// Runs pre-flight checks without executing any task.
    pub async fn validate(&self) -> Result<(), ValidationError> {
        let graph = self.graph.lock().await;
        validation::validate(&graph)
    }

    /// Validates the graph, then drives it to completion or first failure.
    ///
    /// The graph lock is held for the whole call, so concurrent `execute()`
    /// invocations on the same instance run one after another. On success,
    /// every registered task's action ran exactly once. On failure, exactly
    /// one error is returned; completed tasks keep their side effects and
    /// tasks whose prerequisites never completed were never started.
    #[instrument(skip(self))]
    pub async fn execute(&self) -> Result<(), OrchestrationError> {
        let graph = self.graph.lock().await;
        validation::validate(&graph)?;

        let run_id = Uuid::new_v4().to_string();
        let sender = self.event_bus.sender();
        let (cancel_handle, cancel) = CancelSignal::new();

        info!(run_id = %run_id, tasks = graph.len(), "starting execution");
        let _ = sender.send(Event::run_started(&run_id, graph.len()));

        let result = scheduler::run(&graph, &run_id, sender.clone(), cancel, cancel_handle).await;

        let _ = sender.send(Event::run_finished(
            &run_id,
            result.as_ref().err().map(|e| e.to_string()),
        ));
        match &result {
            Ok(()) => info!(run_id = %run_id, "execution completed"),
            Err(err) => info!(run_id = %run_id, error = %err, "execution failed"),
        }
        result
    }
}
