//! Queue ordering, precedence and failure-policy tests

mod common;

use beloader::{ConfigurationError, ItemState, LoadError, LoadRequest, QueueConfig, QueueError};
use common::{Log, contains, events, failing, log, position, queue, timed};
use proptest::prelude::*;

// =============================================================================
// Ordering Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_sync_items_commit_in_declaration_order() {
    let log = log();
    let mut q = queue(QueueConfig::default());
    q.enqueue(timed(&log, "s1", 30)).unwrap();
    q.enqueue(timed(&log, "s2", 10)).unwrap();
    q.enqueue(timed(&log, "s3", 20)).unwrap();

    let report = q.run().unwrap().wait().await.unwrap();

    assert!(report.is_success());
    assert_eq!(report.ids(), vec!["s1", "s2", "s3"]);
    assert_eq!(q.document().commit_order().await, vec!["s1", "s2", "s3"]);
}

#[tokio::test(start_paused = true)]
async fn test_mixed_queue_keeps_sync_order() {
    let log = log();
    let mut q = queue(QueueConfig::default());
    q.enqueue(timed(&log, "s1", 20)).unwrap();
    q.enqueue(timed(&log, "a1", 5).asynchronous(true)).unwrap();
    q.enqueue(timed(&log, "s2", 10)).unwrap();

    let report = q.run().unwrap().wait().await.unwrap();

    // Joint result keeps declaration order regardless of settle order
    assert_eq!(report.ids(), vec!["s1", "a1", "s2"]);
    let doc = q.document();
    assert!(doc.position_of("s1").await.unwrap() < doc.position_of("s2").await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_async_item_does_not_block_later_items() {
    let log = log();
    let mut q = queue(QueueConfig::default());
    q.enqueue(timed(&log, "s1", 10)).unwrap();
    q.enqueue(timed(&log, "a1", 100).asynchronous(true)).unwrap();
    q.enqueue(timed(&log, "s2", 10)).unwrap();

    q.run().unwrap().wait().await.unwrap();

    assert_eq!(q.document().commit_order().await, vec!["s1", "s2", "a1"]);
    assert!(position(&log, "start:s2") < position(&log, "fetched:a1"));
}

// =============================================================================
// Precedence Directive Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_load_directive_waits_for_predecessor() {
    let log = log();
    let mut q = queue(QueueConfig::default());
    q.enqueue(timed(&log, "a1", 50).asynchronous(true)).unwrap();
    q.enqueue(timed(&log, "a2", 5).asynchronous(true).load_after("a1")).unwrap();

    q.run().unwrap().wait().await.unwrap();

    // a2's load is not invoked until a1 settled
    assert!(position(&log, "committed:a1") < position(&log, "start:a2"));
    assert_eq!(q.document().commit_order().await, vec!["a1", "a2"]);
}

#[tokio::test(start_paused = true)]
async fn test_commit_directive_lets_fetch_race() {
    let log = log();
    let mut q = queue(QueueConfig::default());
    q.enqueue(timed(&log, "a1", 50).asynchronous(true)).unwrap();
    q.enqueue(timed(&log, "a2", 5).asynchronous(true).commit_after("a1")).unwrap();

    q.run().unwrap().wait().await.unwrap();

    // a2 finished fetching first but committed second
    assert!(position(&log, "fetched:a2") < position(&log, "fetched:a1"));
    assert_eq!(q.document().commit_order().await, vec!["a1", "a2"]);
}

/// Async timed item on the ordered commit lane
fn ordered(log: &Log, id: &str, latency_ms: u64) -> LoadRequest {
    timed(log, id, latency_ms).asynchronous(true).with_option("ordered", true)
}

#[tokio::test(start_paused = true)]
async fn test_ordered_async_commits_follow_declaration_order() {
    let log = log();
    let mut q = queue(QueueConfig::default());
    q.enqueue(ordered(&log, "a1", 50)).unwrap();
    q.enqueue(ordered(&log, "a2", 1)).unwrap();

    q.run().unwrap().wait().await.unwrap();

    // a2 fetched first but kept its declared position
    assert!(position(&log, "fetched:a2") < position(&log, "fetched:a1"));
    assert_eq!(q.document().commit_order().await, vec!["a1", "a2"]);
}

#[tokio::test(start_paused = true)]
async fn test_sync_commit_waits_for_earlier_ordered_async() {
    let log = log();
    let mut q = queue(QueueConfig::default());
    q.enqueue(ordered(&log, "vendor", 50)).unwrap();
    q.enqueue(ordered(&log, "app", 1)).unwrap();
    q.enqueue(timed(&log, "late", 1)).unwrap();

    q.run().unwrap().wait().await.unwrap();

    assert!(position(&log, "fetched:late") < position(&log, "fetched:vendor"));
    assert_eq!(q.document().commit_order().await, vec!["vendor", "app", "late"]);
}

#[tokio::test(start_paused = true)]
async fn test_ordered_async_waits_for_earlier_sync_items() {
    let log = log();
    let mut q = queue(QueueConfig::default());
    q.enqueue(ordered(&log, "a1", 5)).unwrap();
    q.enqueue(timed(&log, "s1", 30)).unwrap();
    q.enqueue(ordered(&log, "a2", 1)).unwrap();

    q.run().unwrap().wait().await.unwrap();

    assert_eq!(q.document().commit_order().await, vec!["a1", "s1", "a2"]);
}

#[tokio::test(start_paused = true)]
async fn test_unordered_async_commits_when_ready() {
    let log = log();
    let mut q = queue(QueueConfig::default());
    q.enqueue(ordered(&log, "a1", 50)).unwrap();
    q.enqueue(timed(&log, "a2", 1).asynchronous(true)).unwrap();

    q.run().unwrap().wait().await.unwrap();

    assert_eq!(q.document().commit_order().await, vec!["a2", "a1"]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_ordered_item_releases_lane() {
    let log = log();
    let mut q = queue(QueueConfig::default());
    q.enqueue(failing(&log, "a1", 50).asynchronous(true).with_option("ordered", true))
        .unwrap();
    q.enqueue(ordered(&log, "a2", 1)).unwrap();

    let report = q.run().unwrap().wait().await.unwrap();

    assert!(report.get("a1").unwrap().error().is_some());
    assert!(report.get("a2").unwrap().is_success());
    assert!(position(&log, "fetched:a1") < position(&log, "committed:a2"));
    assert_eq!(q.document().commit_order().await, vec!["a2"]);
}

#[test]
fn test_ordered_item_cannot_wait_on_later_sync_item() {
    let log = log();
    let mut q = queue(QueueConfig::default());
    q.enqueue(ordered(&log, "a1", 1).commit_after("s1")).unwrap();
    let err = q.enqueue(timed(&log, "s1", 1)).unwrap_err();

    assert!(matches!(err, ConfigurationError::Cycle { .. }));
}

// =============================================================================
// Failure Policy Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_fail_soft_reports_every_outcome() {
    let log = log();
    let mut q = queue(QueueConfig::default());
    q.enqueue(timed(&log, "s1", 10)).unwrap();
    q.enqueue(failing(&log, "s2", 10)).unwrap();
    q.enqueue(timed(&log, "s3", 10)).unwrap();

    let report = q.run().unwrap().wait().await.unwrap();

    assert!(!report.is_success());
    let s2 = report.get("s2").unwrap();
    assert_eq!(s2.state(), ItemState::Failed);
    assert_eq!(
        s2.error(),
        Some(&LoadError::Fetch {
            url: "s2.timed".to_string(),
            reason: "timed failure".to_string()
        })
    );
    assert_eq!(report.get("s3").unwrap().state(), ItemState::Committed);
    assert_eq!(q.document().commit_order().await, vec!["s1", "s3"]);
}

#[tokio::test(start_paused = true)]
async fn test_fail_fast_rejects_and_aborts_pending_items() {
    let log = log();
    let mut q = queue(QueueConfig::fail_fast());
    q.enqueue(timed(&log, "s1", 10)).unwrap();
    q.enqueue(failing(&log, "s2", 10)).unwrap();
    q.enqueue(timed(&log, "s3", 10)).unwrap();

    let err = q.run().unwrap().wait().await.unwrap_err();

    assert_eq!(err.item(), Some("s2"));
    assert!(matches!(err, QueueError::Load { source: LoadError::Fetch { .. }, .. }));

    let s3 = q.item("s3").unwrap().wait().await.unwrap_err();
    assert_eq!(
        s3,
        LoadError::Aborted {
            item: "s3".to_string(),
            failed: "s2".to_string()
        }
    );
    assert!(!contains(&log, "start:s3"));
}

#[tokio::test(start_paused = true)]
async fn test_fail_fast_lets_in_flight_items_finish() {
    let log = log();
    let mut q = queue(QueueConfig::fail_fast());
    q.enqueue(timed(&log, "a1", 100).asynchronous(true)).unwrap();
    q.enqueue(failing(&log, "s1", 10)).unwrap();
    q.enqueue(timed(&log, "s2", 10)).unwrap();

    let err = q.run().unwrap().wait().await.unwrap_err();
    assert_eq!(err.item(), Some("s1"));

    assert!(q.item("a1").unwrap().wait().await.is_ok());
    assert!(q.item("s2").unwrap().wait().await.unwrap_err().is_aborted());
    assert_eq!(q.document().commit_order().await, vec!["a1"]);
}

#[tokio::test(start_paused = true)]
async fn test_predecessor_failure_short_circuits() {
    let log = log();
    let mut q = queue(QueueConfig::default());
    q.enqueue(failing(&log, "a1", 20).asynchronous(true)).unwrap();
    q.enqueue(timed(&log, "a2", 5).asynchronous(true).load_after("a1")).unwrap();
    q.enqueue(timed(&log, "a3", 5).asynchronous(true).commit_after("a1")).unwrap();

    let report = q.run().unwrap().wait().await.unwrap();

    let root = report.get("a1").unwrap().error().cloned().unwrap();
    assert_eq!(report.get("a2").unwrap().error(), Some(&root));
    assert_eq!(report.get("a3").unwrap().error(), Some(&root));

    // Load gate: never started. Commit gate: fetched, never committed.
    assert!(!contains(&log, "start:a2"));
    assert!(contains(&log, "fetched:a3"));
    assert!(q.document().is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_directive_on_later_async_item() {
    let log = log();
    let mut q = queue(QueueConfig::default());
    q.enqueue(timed(&log, "a1", 5).asynchronous(true).load_after("a2")).unwrap();
    q.enqueue(timed(&log, "a2", 30).asynchronous(true)).unwrap();

    q.run().unwrap().wait().await.unwrap();

    assert!(position(&log, "committed:a2") < position(&log, "start:a1"));
}

#[tokio::test(start_paused = true)]
async fn test_precede_before_dispatch() {
    let log = log();
    let mut q = queue(QueueConfig::default());
    q.enqueue(timed(&log, "a1", 100).asynchronous(true).with_option("precede", "s2"))
        .unwrap();
    q.enqueue(timed(&log, "s1", 50)).unwrap();
    q.enqueue(timed(&log, "s2", 5)).unwrap();

    q.run().unwrap().wait().await.unwrap();

    assert!(contains(&log, "precede:s2:ok"));
    assert!(position(&log, "committed:a1") < position(&log, "start:s2"));
}

#[tokio::test(start_paused = true)]
async fn test_precede_after_dispatch_is_too_late() {
    let log = log();
    let mut q = queue(QueueConfig::default());
    q.enqueue(timed(&log, "s1", 5)).unwrap();
    q.enqueue(timed(&log, "a1", 5).asynchronous(true).with_option("precede", "s1"))
        .unwrap();
    q.enqueue(timed(&log, "a2", 5).asynchronous(true).with_option("precede", "ghost"))
        .unwrap();

    let report = q.run().unwrap().wait().await.unwrap();

    assert!(report.is_success());
    assert!(contains(&log, "precede:s1:too-late"));
    assert!(contains(&log, "precede:ghost:unknown"));
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_cycle_rejected_at_configuration() {
    let log = log();
    let mut q = queue(QueueConfig::default());
    q.enqueue(timed(&log, "a", 1).asynchronous(true).load_after("b")).unwrap();
    let err = q
        .enqueue(timed(&log, "b", 1).asynchronous(true).commit_after("a"))
        .unwrap_err();

    assert!(matches!(err, ConfigurationError::Cycle { .. }));
}

#[test]
fn test_sync_item_cannot_wait_on_later_item() {
    let log = log();
    let mut q = queue(QueueConfig::default());
    q.enqueue(timed(&log, "s1", 1).load_after("s2")).unwrap();
    let err = q.enqueue(timed(&log, "s2", 1)).unwrap_err();

    assert!(matches!(err, ConfigurationError::Cycle { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_second_run_never_restarts_items() {
    let log = log();
    let mut q = queue(QueueConfig::default());
    q.enqueue(timed(&log, "s1", 10)).unwrap();

    let completion = q.run().unwrap();
    assert_eq!(q.run().unwrap_err(), ConfigurationError::AlreadyStarted);
    completion.wait().await.unwrap();

    assert_eq!(q.run().unwrap_err(), ConfigurationError::AlreadyStarted);
    assert_eq!(events(&log).iter().filter(|e| *e == "start:s1").count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_item_lookup_tracks_state() {
    let log = log();
    let mut q = queue(QueueConfig::default());
    let s1 = q.enqueue(timed(&log, "s1", 10)).unwrap();
    assert_eq!(s1.state(), ItemState::Pending);

    q.run().unwrap().wait().await.unwrap();

    assert_eq!(q.item("s1").unwrap().state(), ItemState::Committed);
    assert_eq!(s1.outcome().unwrap().unwrap().as_text(), Some("s1"));
}

// =============================================================================
// Properties
// =============================================================================

/// Run a queue of timed items on a paused single-threaded runtime
///
/// `items` is `(latency_ms, is_async)` per item; returns the commit order.
fn run_timed(items: &[(u64, bool)]) -> Vec<String> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap();

    rt.block_on(async {
        let log = log();
        let mut q = queue(QueueConfig::default());
        for (i, (latency, is_async)) in items.iter().enumerate() {
            q.enqueue(timed(&log, &format!("i{i}"), *latency).asynchronous(*is_async))
                .unwrap();
        }
        q.run().unwrap().wait().await.unwrap();
        q.document().commit_order().await
    })
}

proptest! {
    #[test]
    fn prop_sync_only_commit_order(latencies in prop::collection::vec(0u64..50, 1..8)) {
        let items: Vec<_> = latencies.iter().map(|l| (*l, false)).collect();
        let expected: Vec<_> = (0..items.len()).map(|i| format!("i{i}")).collect();

        prop_assert_eq!(run_timed(&items), expected);
    }

    #[test]
    fn prop_mixed_queue_sync_order(items in prop::collection::vec((0u64..50, any::<bool>()), 1..8)) {
        let order = run_timed(&items);
        let sync_ids: Vec<_> = items
            .iter()
            .enumerate()
            .filter(|(_, (_, is_async))| !is_async)
            .map(|(i, _)| format!("i{i}"))
            .collect();
        let committed_sync: Vec<_> = order.into_iter().filter(|id| sync_ids.contains(id)).collect();

        prop_assert_eq!(committed_sync, sync_ids);
    }
}
