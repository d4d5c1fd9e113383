//! # Taskwave: dependency-graph task orchestration
//!
//! Taskwave accepts named units of work, each declaring zero or more
//! prerequisite units, validates the resulting graph, and executes all units
//! to completion: a unit never starts before every prerequisite has
//! succeeded, and independent units run concurrently.
//!
//! ## Core Concepts
//!
//! - **Tasks**: immutable descriptors pairing an id and prerequisite ids with
//!   an opaque async action
//! - **Validation**: referential-integrity and cycle checks that run before
//!   any action is invoked
//! - **Scheduling**: dynamic wave execution — every ready task launches
//!   concurrently, and completions unlock their dependents immediately
//! - **Failure policy**: the first failure aborts the run with exactly one
//!   error; siblings are cancelled cooperatively and completed work keeps its
//!   side effects
//!
//! ## Quick Start
//!
//! ```
//! use taskwave::orchestrator::Orchestrator;
//! use taskwave::task::Task;
//!
//! # async fn example() -> miette::Result<()> {
//! let orchestrator = Orchestrator::new();
//!
//! orchestrator
//!     .add_task(Task::from_fn("download", &[], |ctx| async move {
//!         ctx.emit("io", "downloading dataset")?;
//!         Ok(())
//!     }))
//!     .await?;
//! orchestrator
//!     .add_task(Task::from_fn("index", &["download"], |_| async { Ok(()) }))
//!     .await?;
//! orchestrator
//!     .add_task(Task::from_fn("report", &["index"], |_| async { Ok(()) }))
//!     .await?;
//!
//! orchestrator.execute().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Guide
//!
//! - [`task`] - Task descriptors, the action trait, contexts, cancellation
//! - [`graph`] - The task registry owned by one orchestrator
//! - [`validation`] - Pre-flight referential and cycle checks
//! - [`orchestrator`] - Registration and execution entry points
//! - [`event_bus`] - Run/task lifecycle events, sinks, and fan-out
//! - [`config`] - Orchestrator and event-bus configuration
//! - [`telemetry`] - Tracing subscriber setup

pub mod config;
pub mod event_bus;
pub mod graph;
pub mod orchestrator;
mod scheduler;
pub mod task;
pub mod telemetry;
pub mod validation;

pub use config::OrchestratorConfig;
pub use graph::GraphError;
pub use orchestrator::{OrchestrationError, Orchestrator};
pub use task::{Task, TaskAction, TaskContext, TaskError, TaskId};
pub use validation::ValidationError;
