//! Pre-flight graph validation: referential integrity and acyclicity.
//!
//! Validation runs before any task action is invoked, both as a standalone
//! check ([`Orchestrator::validate`](crate::orchestrator::Orchestrator::validate))
//! and automatically as the first step of every execution. Tasks and their
//! dependency lists are visited in lexicographic id order, so the first error
//! reported for a given graph is stable across runs.

use miette::Diagnostic;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::graph::TaskGraph;
use crate::task::TaskId;

/// Errors reported by pre-flight validation.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum ValidationError {
    /// A declared prerequisite does not name a registered task.
    #[error("task {task} depends on unknown task {dependency}")]
    #[diagnostic(
        code(taskwave::validation::dependency_not_found),
        help("Register the missing task, or remove the dangling dependency.")
    )]
    DependencyNotFound { task: TaskId, dependency: TaskId },

    /// The dependency relation contains at least one cycle.
    ///
    /// Only the fact of a cycle is reported, not its members.
    #[error("dependency graph contains a cycle")]
    #[diagnostic(
        code(taskwave::validation::cycle_detected),
        help("Break the cycle; every task must be reachable from a task with no prerequisites.")
    )]
    CycleDetected,
}

/// Checks referential integrity, then acyclicity.
///
/// Missing references fail fast: no cycle detection is attempted when a
/// dependency names an unregistered task. An empty graph is trivially valid.
pub fn validate(graph: &TaskGraph) -> Result<(), ValidationError> {
    check_references(graph)?;
    check_acyclic(graph)
}

fn check_references(graph: &TaskGraph) -> Result<(), ValidationError> {
    for id in graph.sorted_ids() {
        let task = graph.get(&id).expect("sorted_ids yields registered ids");
        for dep in task.sorted_dependencies() {
            if !graph.contains(&dep) {
                return Err(ValidationError::DependencyNotFound {
                    task: id,
                    dependency: dep,
                });
            }
        }
    }
    Ok(())
}

/// Depth-first cycle detection over the dependency relation.
///
/// Implemented with an explicit stack rather than recursion so arbitrarily
/// deep graphs cannot overflow. `visited` holds nodes whose reachable
/// subgraph is fully explored; `on_stack` holds the active path. A neighbor
/// already on the active path is a back-edge, i.e. a cycle. Diamond-shaped
/// sharing only revisits `visited` nodes and is not flagged.
fn check_acyclic(graph: &TaskGraph) -> Result<(), ValidationError> {
    enum Frame {
        Enter(TaskId),
        Exit(TaskId),
    }

    let mut visited: FxHashSet<TaskId> = FxHashSet::default();
    let mut on_stack: FxHashSet<TaskId> = FxHashSet::default();

    for root in graph.sorted_ids() {
        if visited.contains(&root) {
            continue;
        }
        let mut stack = vec![Frame::Enter(root)];
        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(id) => {
                    if on_stack.contains(&id) {
                        return Err(ValidationError::CycleDetected);
                    }
                    if !visited.insert(id.clone()) {
                        continue;
                    }
                    on_stack.insert(id.clone());
                    let task = graph.get(&id).expect("references checked first");
                    stack.push(Frame::Exit(id));
                    for dep in task.sorted_dependencies() {
                        if on_stack.contains(&dep) {
                            return Err(ValidationError::CycleDetected);
                        }
                        if !visited.contains(&dep) {
                            stack.push(Frame::Enter(dep));
                        }
                    }
                }
                Frame::Exit(id) => {
                    on_stack.remove(&id);
                }
            }
        }
    }
    Ok(())
}
