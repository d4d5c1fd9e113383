//! Event capture through the orchestrator's event bus.

mod common;

use std::time::Duration;

use taskwave::config::{EventBusConfig, OrchestratorConfig};
use taskwave::event_bus::{Event, EventKind, MemorySink};
use taskwave::orchestrator::Orchestrator;
use taskwave::task::TaskId;

use common::*;

/// Memory-only bus built through configuration; the handle reads everything
/// the bus captures, and nothing is printed to stdout.
fn captured_orchestrator() -> (Orchestrator, MemorySink) {
    let (config, sink) =
        OrchestratorConfig::new(EventBusConfig::new(vec![])).with_memory_event_bus();
    (Orchestrator::with_config(config), sink)
}

#[tokio::test]
async fn lifecycle_events_are_captured_in_order() {
    let (orchestrator, sink) = captured_orchestrator();

    let log = new_log();
    orchestrator
        .add_task(recording_task("a", &[], log.clone(), Duration::ZERO))
        .await
        .unwrap();
    orchestrator
        .add_task(recording_task("b", &["a"], log.clone(), Duration::ZERO))
        .await
        .unwrap();

    orchestrator.execute().await.unwrap();
    orchestrator.event_bus().stop_listener().await;

    let events = sink.snapshot();
    assert!(matches!(
        events.first().map(|e| &e.kind),
        Some(EventKind::RunStarted { tasks: 2, .. })
    ));
    assert!(matches!(
        events.last().map(|e| &e.kind),
        Some(EventKind::RunFinished { error: None, .. })
    ));

    // Timestamps are minted at emission and never run backwards.
    assert!(events.windows(2).all(|pair| pair[0].when <= pair[1].when));

    // The captured completion log respects the declared edge.
    let completions: Vec<String> = sink
        .completion_log()
        .iter()
        .map(|id| id.as_str().to_string())
        .collect();
    assert_eq!(completions, ["a", "b"]);
}

#[tokio::test]
async fn failed_runs_report_the_error_in_events() {
    let (orchestrator, sink) = captured_orchestrator();

    orchestrator
        .add_task(failing_task("broken", &[], "bad input"))
        .await
        .unwrap();

    assert!(orchestrator.execute().await.is_err());
    orchestrator.event_bus().stop_listener().await;

    let events = sink.snapshot();
    assert!(events.iter().any(|e| matches!(
        &e.kind,
        EventKind::TaskFailed { task, error, .. }
            if task.as_str() == "broken" && error.contains("bad input")
    )));
    assert!(matches!(
        events.last().map(|e| &e.kind),
        Some(EventKind::RunFinished { error: Some(_), .. })
    ));
}

#[tokio::test]
async fn task_messages_flow_through_the_bus() {
    let (orchestrator, sink) = captured_orchestrator();

    orchestrator
        .add_task(taskwave::task::Task::from_fn("talker", &[], |ctx| async move {
            ctx.emit("progress", "halfway there")?;
            Ok(())
        }))
        .await
        .unwrap();

    orchestrator.execute().await.unwrap();
    orchestrator.event_bus().stop_listener().await;

    assert!(sink.snapshot().iter().any(|e| matches!(
        &e.kind,
        EventKind::TaskMessage { scope, message, .. }
            if scope == "progress" && message == "halfway there"
    )));
}

#[tokio::test]
async fn channel_sink_config_streams_events_to_the_receiver() {
    let (bus_config, rx) = EventBusConfig::with_channel_sink(None);
    let orchestrator = Orchestrator::with_config(OrchestratorConfig::new(bus_config));

    orchestrator
        .add_task(taskwave::task::Task::from_fn("t", &[], |_| async { Ok(()) }))
        .await
        .unwrap();
    orchestrator.execute().await.unwrap();
    orchestrator.event_bus().stop_listener().await;

    let events: Vec<Event> = rx.drain().collect();
    assert!(!events.is_empty());

    // Run-level events carry no task id; task-level events all name "t".
    let task_ids: Vec<&TaskId> = events.iter().filter_map(Event::task_id).collect();
    assert!(!task_ids.is_empty());
    assert!(task_ids.iter().all(|id| id.as_str() == "t"));
    assert!(events
        .iter()
        .any(|e| matches!(&e.kind, EventKind::TaskCompleted { task, .. } if task.as_str() == "t")));
}
