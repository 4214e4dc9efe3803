use crate::review_harness::{FakeFlattener, FakeReviewer, Harness, plan_request};
use software_architect::review::Timeouts;
use std::time::Duration;

#[tokio::test]
async fn stalled_flattener_times_out_without_persisting() {
    let harness = Harness::with_timeouts(
        FakeFlattener {
            delay: Some(Duration::from_secs(30)),
            ..FakeFlattener::default()
        },
        FakeReviewer::default(),
        Timeouts {
            flatten: Duration::from_millis(50),
            review: Duration::from_secs(5),
        },
    );

    let err = harness
        .orchestrator
        .review_plan(plan_request("slow"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "TIMEOUT_ERROR");
    assert_eq!(harness.snapshot_count(), 0);
    assert!(harness.storage.contexts().load("slow").unwrap().is_none());
}

#[tokio::test]
async fn stalled_reviewer_times_out_and_context_is_not_saved() {
    let harness = Harness::with_timeouts(
        FakeFlattener::default(),
        FakeReviewer {
            delay: Some(Duration::from_secs(30)),
            ..FakeReviewer::default()
        },
        Timeouts {
            flatten: Duration::from_secs(5),
            review: Duration::from_millis(50),
        },
    );

    let err = harness
        .orchestrator
        .review_plan(plan_request("slow-review"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "TIMEOUT_ERROR");
    assert!(harness.storage.contexts().load("slow-review").unwrap().is_none());
}

#[tokio::test]
async fn lock_is_released_after_a_failed_workflow() {
    let harness = Harness::with_timeouts(
        FakeFlattener::default(),
        FakeReviewer {
            delay: Some(Duration::from_secs(30)),
            ..FakeReviewer::default()
        },
        Timeouts {
            flatten: Duration::from_secs(5),
            review: Duration::from_millis(20),
        },
    );

    for _ in 0..2 {
        let outcome = tokio::time::timeout(
            Duration::from_secs(2),
            harness.orchestrator.review_plan(plan_request("retry")),
        )
        .await
        .expect("second attempt must not block on a stale lock");
        assert!(outcome.is_err());
    }
}
