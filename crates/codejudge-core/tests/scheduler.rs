//! Scheduler and trigger behaviour against in-memory fakes.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use codejudge_core::model::{record_id, EvaluationState};
use codejudge_core::scheduler::{Scheduler, MIN_INTERVAL};
use codejudge_core::traits::RecordStore;
use codejudge_core::trigger::TriggerRegistry;

use common::{challenge, harness, seed};

const GOOD: &str = r#"{"score": 70, "reasoning": "fine"}"#;

#[tokio::test]
async fn interval_is_clamped_to_minimum() {
    let h = harness(GOOD);
    let scheduler = Scheduler::new(h.service.clone(), Duration::from_secs(5));
    assert_eq!(scheduler.interval(), MIN_INTERVAL);

    let scheduler = Scheduler::new(h.service.clone(), Duration::from_secs(1800));
    assert_eq!(scheduler.interval(), Duration::from_secs(1800));
}

#[tokio::test]
async fn failing_challenge_does_not_stop_the_others() {
    let h = harness(GOOD);
    seed(&h.store.inner, "x", &["kx"], &["rx"]);
    seed(&h.store.inner, "y", &["ky"], &["ry"]);
    h.source.break_url("https://github.com/acme/rx");

    let scheduler = Scheduler::new(h.service.clone(), MIN_INTERVAL);
    let report = scheduler.tick().await;

    assert_eq!(report.failed, vec!["x".to_string()]);
    assert_eq!(report.succeeded, vec!["y".to_string()]);

    let y = h
        .store
        .get_evaluation(&record_id("ry", "ky"), "ry")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(y.state, EvaluationState::Evaluated);

    // The broken challenge really ran and stopped mid-cycle.
    let x = h
        .store
        .get_evaluation(&record_id("rx", "kx"), "rx")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(x.state, EvaluationState::UnderEvaluation);
}

#[tokio::test]
async fn inactive_and_unidentified_challenges_are_skipped() {
    let h = harness(GOOD);
    seed(&h.store.inner, "live", &["k1"], &["r1"]);

    let mut paused = challenge("paused");
    paused.active = false;
    h.store.inner.add_challenge(paused).unwrap();

    let mut anonymous = challenge("");
    anonymous.name = "anonymous".into();
    h.store.inner.add_challenge(anonymous).unwrap();

    let report = Scheduler::new(h.service.clone(), MIN_INTERVAL).tick().await;

    assert_eq!(report.succeeded, vec!["live".to_string()]);
    assert!(report.failed.is_empty());
    assert_eq!(report.skipped, 2);
    assert_eq!(h.judge.calls().len(), 1);
}

#[tokio::test]
async fn empty_store_is_a_quiet_tick() {
    let h = harness(GOOD);
    let report = Scheduler::new(h.service.clone(), MIN_INTERVAL).tick().await;
    assert_eq!(report, Default::default());
}

#[tokio::test(start_paused = true)]
async fn run_ticks_immediately_then_every_interval_until_cancelled() {
    let h = harness(GOOD);
    seed(&h.store.inner, "c1", &["k1"], &["r1"]);

    let scheduler = Scheduler::new(h.service.clone(), MIN_INTERVAL);
    let cancel = CancellationToken::new();
    let task = tokio::spawn({
        let cancel = cancel.clone();
        async move { scheduler.run(cancel).await }
    });

    // Iterations at 0s, 60s and 120s.
    tokio::time::sleep(Duration::from_secs(150)).await;
    cancel.cancel();
    task.await.unwrap();

    assert_eq!(h.judge.calls().len(), 3);
}

#[tokio::test]
async fn cancelled_token_stops_before_first_iteration() {
    let h = harness(GOOD);
    seed(&h.store.inner, "c1", &["k1"], &["r1"]);

    let cancel = CancellationToken::new();
    cancel.cancel();
    Scheduler::new(h.service.clone(), MIN_INTERVAL)
        .run(cancel)
        .await;

    assert!(h.judge.calls().is_empty());
}

#[tokio::test]
async fn trigger_runs_in_the_background() {
    let h = harness(GOOD);
    seed(&h.store.inner, "c1", &["k1", "k2"], &["r1"]);

    let registry = TriggerRegistry::new();
    registry.trigger(Arc::clone(&h.service), "c1", Some(vec!["k2".to_string()]));
    registry.drain().await;

    assert!(registry.pending().is_empty());
    let evaluations = h.store.list_evaluations_for_challenge("c1").await.unwrap();
    assert_eq!(evaluations.len(), 1);
    assert_eq!(evaluations[0].criterion_id, "k2");
    assert_eq!(evaluations[0].state, EvaluationState::Evaluated);
}

#[tokio::test]
async fn failed_trigger_is_logged_not_propagated() {
    let h = harness(GOOD);

    let registry = TriggerRegistry::new();
    registry.trigger(Arc::clone(&h.service), "missing", None);
    registry.drain().await;

    assert!(registry.pending().is_empty());
    assert!(h.judge.calls().is_empty());
}

#[tokio::test]
async fn shutdown_aborts_outstanding_runs() {
    let h = harness(GOOD);
    seed(&h.store.inner, "c1", &["k1"], &["r1"]);

    let registry = TriggerRegistry::new();
    let abort = registry.trigger(Arc::clone(&h.service), "c1", None);
    registry.shutdown().await;

    assert!(abort.is_finished());
    assert!(registry.pending().is_empty());
}
