//! Reusable actions for integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskwave::task::{Task, TaskError};

/// Shared start/end log, recorded in observation order.
pub type ExecutionLog = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> ExecutionLog {
    Arc::new(Mutex::new(Vec::new()))
}

fn record(log: &ExecutionLog, entry: String) {
    log.lock().unwrap().push(entry);
}

/// A task that records `start:<id>` and `end:<id>` around an optional delay.
pub fn recording_task(id: &str, deps: &[&str], log: ExecutionLog, delay: Duration) -> Task {
    let id_owned = id.to_string();
    Task::from_fn(id, deps, move |_ctx| {
        let log = log.clone();
        let id = id_owned.clone();
        async move {
            record(&log, format!("start:{id}"));
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            record(&log, format!("end:{id}"));
            Ok(())
        }
    })
}

/// A task that bumps a counter once per invocation.
pub fn counting_task(id: &str, deps: &[&str], counter: Arc<AtomicUsize>) -> Task {
    Task::from_fn(id, deps, move |_ctx| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    })
}

/// A task that always fails with the given message.
pub fn failing_task(id: &str, deps: &[&str], message: &str) -> Task {
    let message = message.to_string();
    Task::from_fn(id, deps, move |_ctx| {
        let message = message.clone();
        async move { Err(TaskError::msg(message)) }
    })
}

/// A task that waits for cooperative cancellation (or a generous timeout) and
/// records which of the two it observed.
pub fn cancellation_aware_task(id: &str, deps: &[&str], log: ExecutionLog) -> Task {
    let id_owned = id.to_string();
    Task::from_fn(id, deps, move |ctx| {
        let log = log.clone();
        let id = id_owned.clone();
        async move {
            tokio::select! {
                _ = ctx.cancel.cancelled() => {
                    record(&log, format!("cancelled:{id}"));
                    Err(TaskError::Cancelled)
                }
                _ = tokio::time::sleep(Duration::from_secs(5)) => {
                    record(&log, format!("timeout:{id}"));
                    Ok(())
                }
            }
        }
    })
}
