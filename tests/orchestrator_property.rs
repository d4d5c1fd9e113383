//! Property tests over randomly shaped acyclic graphs.

#[macro_use]
extern crate proptest;

mod common;

use proptest::prelude::*;
use std::time::Duration;
use taskwave::orchestrator::Orchestrator;

use common::*;

fn block_on<F: std::future::Future<Output = ()>>(fut: F) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    rt.block_on(fut);
}

/// Dependencies of task `i` are a subset of tasks `0..i`, encoded as a
/// bitmask, so every generated graph is acyclic and reference-complete by
/// construction.
fn edges_from_masks(masks: &[u16]) -> Vec<(String, Vec<String>)> {
    masks
        .iter()
        .enumerate()
        .map(|(i, mask)| {
            let id = format!("t{i:02}");
            let deps = (0..i)
                .filter(|j| mask & (1 << j) != 0)
                .map(|j| format!("t{j:02}"))
                .collect();
            (id, deps)
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn acyclic_graphs_always_complete(masks in prop::collection::vec(any::<u16>(), 1..10)) {
        let specs = edges_from_masks(&masks);

        block_on(async move {
            let orchestrator = Orchestrator::new();
            let log = new_log();

            for (id, deps) in &specs {
                let dep_refs: Vec<&str> = deps.iter().map(String::as_str).collect();
                orchestrator
                    .add_task(recording_task(id, &dep_refs, log.clone(), Duration::ZERO))
                    .await
                    .unwrap();
            }

            orchestrator.execute().await.unwrap();

            // Every task completed exactly once.
            let mut completions = completion_order(&log);
            completions.sort();
            let mut expected: Vec<String> = specs.iter().map(|(id, _)| id.clone()).collect();
            expected.sort();
            assert_eq!(completions, expected);

            // Every declared edge is honored in the captured log.
            for (id, deps) in &specs {
                for dep in deps {
                    assert_completed_before_start(&log, dep, id);
                }
            }
        });
    }

    #[test]
    fn validation_accepts_all_generated_graphs(masks in prop::collection::vec(any::<u16>(), 1..10)) {
        let specs = edges_from_masks(&masks);

        block_on(async move {
            let orchestrator = Orchestrator::new();
            for (id, deps) in &specs {
                let dep_refs: Vec<&str> = deps.iter().map(String::as_str).collect();
                orchestrator
                    .add_task(recording_task(id, &dep_refs, new_log(), Duration::ZERO))
                    .await
                    .unwrap();
            }
            assert_eq!(orchestrator.validate().await, Ok(()));
        });
    }
}
