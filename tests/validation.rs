//! Pre-flight validation via the public orchestrator surface.

use taskwave::orchestrator::Orchestrator;
use taskwave::task::Task;
use taskwave::validation::ValidationError;

fn noop(id: &str, deps: &[&str]) -> Task {
    Task::from_fn(id, deps, |_| async { Ok(()) })
}

#[tokio::test]
async fn missing_dependency_names_task_and_dependency() {
    let orchestrator = Orchestrator::new();
    orchestrator.add_task(noop("A", &["Missing"])).await.unwrap();

    let err = orchestrator.validate().await.unwrap_err();
    assert_eq!(
        err,
        ValidationError::DependencyNotFound {
            task: "A".into(),
            dependency: "Missing".into(),
        }
    );
}

#[tokio::test]
async fn mutual_cycle_is_rejected() {
    let orchestrator = Orchestrator::new();
    orchestrator.add_task(noop("A", &["B"])).await.unwrap();
    orchestrator.add_task(noop("B", &["A"])).await.unwrap();

    assert_eq!(
        orchestrator.validate().await,
        Err(ValidationError::CycleDetected)
    );
    // execute() hits the same wall before any action runs.
    assert!(orchestrator.execute().await.is_err());
}

#[tokio::test]
async fn self_dependency_is_rejected() {
    let orchestrator = Orchestrator::new();
    orchestrator.add_task(noop("A", &["A"])).await.unwrap();
    assert_eq!(
        orchestrator.validate().await,
        Err(ValidationError::CycleDetected)
    );
}

#[tokio::test]
async fn diamond_sharing_is_accepted() {
    let orchestrator = Orchestrator::new();
    orchestrator.add_task(noop("base", &[])).await.unwrap();
    orchestrator.add_task(noop("left", &["base"])).await.unwrap();
    orchestrator
        .add_task(noop("right", &["base"]))
        .await
        .unwrap();
    orchestrator
        .add_task(noop("top", &["left", "right"]))
        .await
        .unwrap();

    assert_eq!(orchestrator.validate().await, Ok(()));
}

#[tokio::test]
async fn validate_twice_yields_same_result() {
    let orchestrator = Orchestrator::new();
    orchestrator.add_task(noop("A", &["B"])).await.unwrap();
    orchestrator.add_task(noop("B", &[])).await.unwrap();

    let first = orchestrator.validate().await;
    let second = orchestrator.validate().await;
    assert_eq!(first, Ok(()));
    assert_eq!(first, second);
}
