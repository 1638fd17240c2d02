//! Integration tests for the two teardown strategies: confirmed drain and
//! best-effort immediate destroy.

mod common;

use common::{ScriptedSpawner, SpawnScript};
use std::sync::Arc;
use std::time::Duration;

use procman::core::{Pid, SessionId};
use procman::messages::BufferedSink;
use procman::options::RunOptions;
use procman::process::{DrainConfig, DrainOutcome, ProcessManager};

fn manager_with(script: Vec<SpawnScript>) -> Arc<ProcessManager> {
    let (spawner, controls) = ScriptedSpawner::new(script);
    // Controls are intentionally leaked: the fake processes stay "running"
    // until killed.
    std::mem::forget(controls);
    let (sink, events) = BufferedSink::channel(256);
    std::mem::forget(events);
    Arc::new(ProcessManager::new(
        SessionId::new("drain"),
        spawner,
        Arc::new(sink),
    ))
}

#[tokio::test]
async fn drain_completes_only_after_all_processes_stop() {
    let manager = manager_with(vec![SpawnScript::launch(41), SpawnScript::launch(42)]);
    manager.spawn(RunOptions::new("sleep 30")).await.expect("spawn 41");
    manager.spawn(RunOptions::new("sleep 30")).await.expect("spawn 42");

    let drain = tokio::spawn({
        let manager = manager.clone();
        async move { manager.prepare_shutdown(DrainConfig::default()).await }
    });

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(!drain.is_finished(), "drain must wait for live processes");

    manager.kill(Pid::new(41)).await.expect("kill 41");
    manager.kill(Pid::new(42)).await.expect("kill 42");

    let outcome = tokio::time::timeout(Duration::from_secs(5), drain)
        .await
        .expect("drain timed out")
        .expect("drain task panicked")
        .expect("drain errored");
    assert_eq!(outcome, DrainOutcome::Drained);
    assert_eq!(manager.tracked_count(), 0);
}

#[tokio::test]
async fn drain_resolves_immediately_when_nothing_is_tracked() {
    let manager = manager_with(vec![]);
    let outcome = manager
        .prepare_shutdown(DrainConfig::default())
        .await
        .expect("drain");
    assert_eq!(outcome, DrainOutcome::Drained);
}

#[tokio::test]
async fn drain_deadline_force_reports_remaining_processes() {
    let manager = manager_with(vec![SpawnScript::launch(42)]);
    manager.spawn(RunOptions::new("sleep 30")).await.expect("spawn");

    let outcome = manager
        .prepare_shutdown(DrainConfig::with_deadline(Duration::from_millis(250)))
        .await
        .expect("drain");
    match outcome {
        DrainOutcome::DeadlineExpired { remaining } => {
            assert_eq!(remaining, vec![Pid::new(42)]);
        }
        other => panic!("expected deadline expiry, got {other:?}"),
    }
}

#[tokio::test]
async fn destroy_aborts_an_inflight_drain() {
    let manager = manager_with(vec![SpawnScript::launch(42)]);
    let running = manager.spawn(RunOptions::new("sleep 30")).await.expect("spawn");

    let drain = tokio::spawn({
        let manager = manager.clone();
        async move { manager.prepare_shutdown(DrainConfig::default()).await }
    });
    tokio::time::sleep(Duration::from_millis(150)).await;

    manager.destroy().await;

    let outcome = tokio::time::timeout(Duration::from_secs(5), drain)
        .await
        .expect("drain timed out")
        .expect("drain task panicked")
        .expect("drain errored");
    assert_eq!(outcome, DrainOutcome::Aborted);
    assert!(running.handle.killed());
}

#[tokio::test]
async fn destroy_kills_every_known_process_without_waiting() {
    let manager = manager_with(vec![SpawnScript::launch(41), SpawnScript::launch(42)]);
    let a = manager.spawn(RunOptions::new("sleep 30")).await.expect("spawn 41");
    let b = manager.spawn(RunOptions::new("sleep 30")).await.expect("spawn 42");

    manager.destroy().await;

    assert!(a.handle.killed());
    assert!(b.handle.killed());
    // Killed entries fall out on the next status query.
    assert!(manager.ps().expect("ps").is_empty());
}
