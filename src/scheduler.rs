//! Concurrent wave-based execution of a validated task graph.
//!
//! The scheduler owns no state across runs: every call to [`run`] derives a
//! fresh [`RunState`] (remaining-prerequisite counters plus a
//! reverse-dependency index) from a snapshot of the graph, launches every
//! currently-ready task onto a [`tokio::task::JoinSet`], and as completions
//! arrive launches whatever became ready, until the graph is exhausted or a
//! failure is observed.
//!
//! A single coordination loop does all bookkeeping; the only CPU work here is
//! counter updates. Ordering guarantee: a task launches only after every
//! declared prerequisite has *successfully completed*. Unrelated tasks have
//! no relative order.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

use crate::event_bus::Event;
use crate::graph::TaskGraph;
use crate::orchestrator::OrchestrationError;
use crate::task::{CancelSignal, Task, TaskContext, TaskError, TaskId};

/// Ephemeral scheduling state, derived once per run and discarded afterward.
struct RunState {
    /// Prerequisites not yet completed, per task.
    remaining: FxHashMap<TaskId, usize>,
    /// Reverse index: task id -> tasks that declare it as a prerequisite.
    dependents: FxHashMap<TaskId, Vec<TaskId>>,
}

impl RunState {
    fn build(graph: &TaskGraph) -> Self {
        let mut remaining = FxHashMap::default();
        let mut dependents: FxHashMap<TaskId, Vec<TaskId>> = FxHashMap::default();

        // Sorted traversal keeps the reverse-dependency lists, and therefore
        // launch order within a wave, independent of map iteration order.
        for id in graph.sorted_ids() {
            let task = graph.get(&id).expect("sorted_ids yields registered ids");
            remaining.insert(id.clone(), task.dependencies().len());
            for dep in task.sorted_dependencies() {
                dependents.entry(dep).or_default().push(id.clone());
            }
        }
        Self {
            remaining,
            dependents,
        }
    }

    /// Tasks whose counter is zero, in lexicographic order.
    fn initial_ready(&self) -> Vec<TaskId> {
        let mut ready: Vec<TaskId> = self
            .remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| id.clone())
            .collect();
        ready.sort();
        ready
    }

    /// Records a successful completion and returns the newly-ready tasks.
    fn complete(&mut self, id: &TaskId) -> Vec<TaskId> {
        let mut ready = Vec::new();
        if let Some(dependents) = self.dependents.get(id) {
            for dependent in dependents {
                let count = self
                    .remaining
                    .get_mut(dependent)
                    .expect("dependent is a registered task");
                *count -= 1;
                if *count == 0 {
                    ready.push(dependent.clone());
                }
            }
        }
        ready
    }
}

/// Drives one full execution of the (already validated) graph.
///
/// Returns `Ok(())` only when every registered task completed successfully.
/// On the first observed failure, launching stops, the cancel signal fires,
/// in-flight siblings are drained (never forcibly aborted), and exactly that
/// one error is surfaced. Tasks that never became ready are never launched.
#[instrument(skip_all, fields(run_id = %run_id, tasks = graph.len()))]
pub(crate) async fn run(
    graph: &TaskGraph,
    run_id: &str,
    event_sender: flume::Sender<Event>,
    cancel: CancelSignal,
    cancel_handle: crate::task::CancelHandle,
) -> Result<(), OrchestrationError> {
    let mut state = RunState::build(graph);
    let mut in_flight: JoinSet<(TaskId, Result<(), TaskError>)> = JoinSet::new();
    let mut outstanding = graph.len();

    for id in state.initial_ready() {
        launch(graph, &id, run_id, &event_sender, &cancel, &mut in_flight);
    }

    let mut first_error: Option<OrchestrationError> = None;

    while let Some(joined) = in_flight.join_next().await {
        match joined {
            Ok((id, Ok(()))) => {
                outstanding -= 1;
                debug!(task = %id, outstanding, "task completed");
                let _ = event_sender.send(Event::task_completed(id.clone(), run_id));
                if first_error.is_none() {
                    for ready in state.complete(&id) {
                        launch(graph, &ready, run_id, &event_sender, &cancel, &mut in_flight);
                    }
                }
            }
            Ok((id, Err(err))) => {
                outstanding -= 1;
                warn!(task = %id, error = %err, "task failed");
                let _ = event_sender.send(Event::task_failed(id.clone(), run_id, err.to_string()));
                if first_error.is_none() {
                    cancel_handle.cancel();
                    first_error = Some(OrchestrationError::TaskFailed {
                        id,
                        source: Box::new(err),
                    });
                }
            }
            Err(join_err) => {
                // A panicking action is a defect in the action, not the run;
                // it still aborts the execution with a single error.
                warn!(error = %join_err, "task panicked or was aborted");
                if first_error.is_none() {
                    cancel_handle.cancel();
                    first_error = Some(OrchestrationError::Join(join_err));
                }
            }
        }
    }

    if let Some(err) = first_error {
        return Err(err);
    }

    debug_assert_eq!(outstanding, 0, "acyclic validated graphs always drain");
    Ok(())
}

fn launch(
    graph: &TaskGraph,
    id: &TaskId,
    run_id: &str,
    event_sender: &flume::Sender<Event>,
    cancel: &CancelSignal,
    in_flight: &mut JoinSet<(TaskId, Result<(), TaskError>)>,
) {
    let task: &Arc<Task> = graph.get(id).expect("ready ids come from the graph");
    let action = task.action();
    let ctx = TaskContext {
        task_id: id.clone(),
        run_id: run_id.to_string(),
        event_sender: event_sender.clone(),
        cancel: cancel.clone(),
    };
    debug!(task = %id, "launching task");
    let _ = event_sender.send(Event::task_started(id.clone(), run_id));

    let id = id.clone();
    in_flight.spawn(async move {
        let result = action.run(ctx).await;
        (id, result)
    });
}
