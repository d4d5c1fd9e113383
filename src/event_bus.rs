//! Event fan-out for orchestration runs.
//!
//! The scheduler and running actions emit [`Event`]s onto a flume channel; a
//! background listener broadcasts each event to every configured
//! [`EventSink`]. [`MemorySink`] doubles as the captured completion log used
//! throughout the test suite.

use std::fmt;
use std::io::{self, Result as IoResult, Write};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task;

use crate::task::TaskId;

/// A single observable moment in an orchestration run, stamped with its
/// emission time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    /// When the event was created.
    pub when: DateTime<Utc>,
    /// What happened.
    pub kind: EventKind,
}

/// Payload of an [`Event`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventKind {
    /// An `execute()` call began, after validation passed.
    RunStarted { run_id: String, tasks: usize },
    /// An `execute()` call ended; `error` is `None` on uniform success.
    RunFinished {
        run_id: String,
        error: Option<String>,
    },
    /// A task's action was launched.
    TaskStarted { run_id: String, task: TaskId },
    /// A task's action returned success.
    TaskCompleted { run_id: String, task: TaskId },
    /// A task's action returned an error.
    TaskFailed {
        run_id: String,
        task: TaskId,
        error: String,
    },
    /// Free-form message emitted by an action through its context.
    TaskMessage {
        run_id: String,
        task: TaskId,
        scope: String,
        message: String,
    },
}

impl Event {
    fn now(kind: EventKind) -> Self {
        Self {
            when: Utc::now(),
            kind,
        }
    }

    pub fn run_started(run_id: impl Into<String>, tasks: usize) -> Self {
        Self::now(EventKind::RunStarted {
            run_id: run_id.into(),
            tasks,
        })
    }

    pub fn run_finished(run_id: impl Into<String>, error: Option<String>) -> Self {
        Self::now(EventKind::RunFinished {
            run_id: run_id.into(),
            error,
        })
    }

    pub fn task_started(task: TaskId, run_id: impl Into<String>) -> Self {
        Self::now(EventKind::TaskStarted {
            run_id: run_id.into(),
            task,
        })
    }

    pub fn task_completed(task: TaskId, run_id: impl Into<String>) -> Self {
        Self::now(EventKind::TaskCompleted {
            run_id: run_id.into(),
            task,
        })
    }

    pub fn task_failed(task: TaskId, run_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self::now(EventKind::TaskFailed {
            run_id: run_id.into(),
            task,
            error: error.into(),
        })
    }

    pub fn task_message(
        task: TaskId,
        run_id: impl Into<String>,
        scope: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::now(EventKind::TaskMessage {
            run_id: run_id.into(),
            task,
            scope: scope.into(),
            message: message.into(),
        })
    }

    /// The task this event concerns, if any.
    #[must_use]
    pub fn task_id(&self) -> Option<&TaskId> {
        match &self.kind {
            EventKind::TaskStarted { task, .. }
            | EventKind::TaskCompleted { task, .. }
            | EventKind::TaskFailed { task, .. }
            | EventKind::TaskMessage { task, .. } => Some(task),
            EventKind::RunStarted { .. } | EventKind::RunFinished { .. } => None,
        }
    }

    /// Structured JSON with a normalized schema and the emission timestamp.
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        use serde_json::json;
        let kind = match &self.kind {
            EventKind::RunStarted { .. } => "run_started",
            EventKind::RunFinished { .. } => "run_finished",
            EventKind::TaskStarted { .. } => "task_started",
            EventKind::TaskCompleted { .. } => "task_completed",
            EventKind::TaskFailed { .. } => "task_failed",
            EventKind::TaskMessage { .. } => "task_message",
        };
        json!({
            "type": kind,
            "event": self.kind,
            "timestamp": self.when.to_rfc3339(),
        })
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            EventKind::RunStarted { run_id, tasks } => {
                write!(f, "[run {run_id}] started with {tasks} task(s)")
            }
            EventKind::RunFinished { run_id, error } => match error {
                None => write!(f, "[run {run_id}] finished"),
                Some(e) => write!(f, "[run {run_id}] failed: {e}"),
            },
            EventKind::TaskStarted { task, .. } => write!(f, "[{task}] started"),
            EventKind::TaskCompleted { task, .. } => write!(f, "[{task}] completed"),
            EventKind::TaskFailed { task, error, .. } => write!(f, "[{task}] failed: {error}"),
            EventKind::TaskMessage {
                task,
                scope,
                message,
                ..
            } => write!(f, "[{task}] {scope}: {message}"),
        }
    }
}

/// Abstraction over an output target that consumes full [`Event`] objects.
pub trait EventSink: Send + Sync {
    fn handle(&mut self, event: &Event) -> IoResult<()>;
}

/// Line-per-event stdout sink.
#[derive(Debug, Default)]
pub struct StdOutSink;

impl EventSink for StdOutSink {
    fn handle(&mut self, event: &Event) -> IoResult<()> {
        let mut out = io::stdout();
        writeln!(out, "{event}")?;
        out.flush()
    }
}

/// In-memory sink for testing and snapshots.
///
/// Clones share the same backing store, so a handle kept by the caller reads
/// everything a clone inside an [`EventBus`] captured.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<Event>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured events.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Event> {
        self.entries.lock().unwrap().clone()
    }

    /// Ids of completed tasks, in completion order.
    #[must_use]
    pub fn completion_log(&self) -> Vec<TaskId> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match &e.kind {
                EventKind::TaskCompleted { task, .. } => Some(task.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

impl EventSink for MemorySink {
    fn handle(&mut self, event: &Event) -> IoResult<()> {
        self.entries.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Forwards events to a flume channel for async consumers.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: flume::Sender<Event>,
}

impl ChannelSink {
    #[must_use]
    pub fn new(tx: flume::Sender<Event>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn handle(&mut self, event: &Event) -> IoResult<()> {
        self.tx
            .send(event.clone())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "channel receiver dropped"))
    }
}

/// Receives events from producers and broadcasts them to every sink.
pub struct EventBus {
    sinks: Arc<Mutex<Vec<Box<dyn EventSink>>>>,
    event_channel: (flume::Sender<Event>, flume::Receiver<Event>),
    listener: Arc<Mutex<Option<ListenerState>>>,
}

struct ListenerState {
    shutdown_tx: oneshot::Sender<()>,
    handle: task::JoinHandle<()>,
}

fn deliver(sinks: &Arc<Mutex<Vec<Box<dyn EventSink>>>>, event: &Event) {
    let mut sinks_guard = sinks.lock().unwrap();
    for sink in sinks_guard.iter_mut() {
        if let Err(e) = sink.handle(event) {
            eprintln!("event bus sink error: {e}");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_sink(StdOutSink)
    }
}

impl EventBus {
    /// Create an event bus with a single sink.
    pub fn with_sink<T>(sink: T) -> Self
    where
        T: EventSink + 'static,
    {
        Self::with_sinks(vec![Box::new(sink)])
    }

    /// Create an event bus with multiple sinks.
    #[must_use]
    pub fn with_sinks(sinks: Vec<Box<dyn EventSink>>) -> Self {
        Self {
            sinks: Arc::new(Mutex::new(sinks)),
            event_channel: flume::unbounded(),
            listener: Arc::new(Mutex::new(None)),
        }
    }

    /// Dynamically add a sink, e.g. a [`MemorySink`] before a test run.
    pub fn add_sink<T: EventSink + 'static>(&self, sink: T) {
        self.sinks.lock().unwrap().push(Box::new(sink));
    }

    /// Clone of the sender side, handed to schedulers and task contexts.
    #[must_use]
    pub fn sender(&self) -> flume::Sender<Event> {
        self.event_channel.0.clone()
    }

    /// Spawn the background task that drains the channel into the sinks.
    /// Idempotent: calling multiple times has no effect.
    pub fn listen_for_events(&self) {
        let mut guard = self.listener.lock().expect("listener poisoned");
        if guard.is_some() {
            return;
        }

        let receiver = self.event_channel.1.clone();
        let sinks = Arc::clone(&self.sinks);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let handle = task::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        // Deliver anything still queued before stopping.
                        while let Ok(event) = receiver.try_recv() {
                            deliver(&sinks, &event);
                        }
                        break;
                    }
                    recv = receiver.recv_async() => match recv {
                        Err(_) => break,
                        Ok(event) => deliver(&sinks, &event),
                    }
                }
            }
        });

        *guard = Some(ListenerState {
            shutdown_tx,
            handle,
        });
    }

    /// Stop the background listener after draining already-queued events.
    pub async fn stop_listener(&self) {
        let state = {
            let mut guard = self.listener.lock().expect("listener poisoned");
            guard.take()
        };
        if let Some(state) = state {
            let _ = state.shutdown_tx.send(());
            let _ = state.handle.await;
        }
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.listener.lock() {
            if let Some(state) = guard.take() {
                let _ = state.shutdown_tx.send(());
                state.handle.abort();
            }
        }
    }
}
