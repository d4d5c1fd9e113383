//! Ordering assertions over execution logs.
//!
//! Assertions here only constrain relationships implied by the dependency
//! graph; they never pin down the interleaving of unrelated tasks.

use super::actions::ExecutionLog;

fn position(entries: &[String], entry: &str) -> usize {
    entries
        .iter()
        .position(|e| e == entry)
        .unwrap_or_else(|| panic!("log entry {entry:?} missing from {entries:?}"))
}

/// Asserts that `prerequisite` finished strictly before `dependent` started.
pub fn assert_completed_before_start(log: &ExecutionLog, prerequisite: &str, dependent: &str) {
    let entries = log.lock().unwrap().clone();
    let end = position(&entries, &format!("end:{prerequisite}"));
    let start = position(&entries, &format!("start:{dependent}"));
    assert!(
        end < start,
        "{prerequisite} must complete before {dependent} starts; log: {entries:?}"
    );
}

/// Asserts that a task never appears in the log at all.
pub fn assert_never_started(log: &ExecutionLog, id: &str) {
    let entries = log.lock().unwrap().clone();
    assert!(
        !entries.iter().any(|e| e == &format!("start:{id}")),
        "{id} must never start; log: {entries:?}"
    );
}

/// The `end:` entries of the log, stripped to task ids, in completion order.
pub fn completion_order(log: &ExecutionLog) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .filter_map(|e| e.strip_prefix("end:").map(str::to_string))
        .collect()
}
