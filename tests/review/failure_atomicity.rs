use crate::review_harness::{
    FakeFlattener, FakeReviewer, Harness, implementation_request, plan_request,
};
use software_architect::ArchitectError;
use software_architect::review::PlanReviewRequest;
use std::sync::atomic::Ordering;

#[tokio::test]
async fn blank_inputs_are_rejected_before_any_work() {
    let harness = Harness::healthy();
    let request = PlanReviewRequest {
        implementation_plan: "   ".into(),
        ..plan_request("task-1")
    };

    let err = harness.orchestrator.review_plan(request).await.unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
    assert!(err.root().to_string().contains("implementationPlan"));
    assert_eq!(harness.flattener.flatten_calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.snapshot_count(), 0);
}

#[tokio::test]
async fn flatten_failure_is_codebase_error_and_persists_nothing() {
    let harness = Harness::new(
        FakeFlattener {
            fail_flatten: true,
            ..FakeFlattener::default()
        },
        FakeReviewer::default(),
    );

    let err = harness
        .orchestrator
        .review_plan(plan_request("task-1"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "CODEBASE_ERROR");
    match &err {
        ArchitectError::Workflow {
            workflow,
            subject,
            step,
            ..
        } => {
            assert_eq!(*workflow, "review_plan");
            assert_eq!(subject, "task-1");
            assert_eq!(*step, "flatten");
        }
        other => panic!("expected workflow context, got {other:?}"),
    }
    assert_eq!(harness.reviewer.calls.load(Ordering::SeqCst), 0);
    assert!(harness.storage.contexts().load("task-1").unwrap().is_none());
}

#[tokio::test]
async fn review_failure_leaves_previous_context_untouched() {
    let healthy = Harness::healthy();
    healthy
        .orchestrator
        .review_plan(plan_request("task-2"))
        .await
        .unwrap();
    let before = healthy.storage.contexts().load("task-2").unwrap().unwrap();

    // Same storage root, failing reviewer.
    let failing = software_architect::review::ReviewOrchestrator::new(
        std::sync::Arc::clone(&healthy.storage),
        std::sync::Arc::new(FakeFlattener::default()),
        std::sync::Arc::new(FakeReviewer {
            fail: true,
            ..FakeReviewer::default()
        }),
        software_architect::review::Timeouts::default(),
    );
    let err = failing
        .review_implementation(implementation_request("task-2"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "REVIEW_SERVICE_ERROR");

    let after = healthy.storage.contexts().load("task-2").unwrap().unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn diff_failure_is_diff_error_without_post_snapshot() {
    let harness = Harness::new(
        FakeFlattener {
            fail_diff: true,
            ..FakeFlattener::default()
        },
        FakeReviewer::default(),
    );

    let err = harness
        .orchestrator
        .review_implementation(implementation_request("task-3"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "DIFF_ERROR");
    assert_eq!(harness.snapshot_count(), 0);
    assert!(harness.storage.contexts().load("task-3").unwrap().is_none());
}

#[tokio::test]
async fn oversized_codebase_aborts_with_size_limit() {
    let tmp = tempfile::TempDir::new().unwrap();
    let storage = std::sync::Arc::new(
        software_architect::storage::Storage::open(software_architect::storage::StorageOptions {
            base_path: tmp.path().to_path_buf(),
            codec: software_architect::security::AtRest::Plaintext,
            max_size_mb: 0,
        })
        .unwrap(),
    );
    let reviewer = std::sync::Arc::new(FakeReviewer::default());
    let orchestrator = software_architect::review::ReviewOrchestrator::new(
        std::sync::Arc::clone(&storage),
        std::sync::Arc::new(FakeFlattener::default()),
        reviewer.clone(),
        software_architect::review::Timeouts::default(),
    );

    let err = orchestrator
        .review_plan(plan_request("task-big"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "SIZE_LIMIT_EXCEEDED");
    assert_eq!(reviewer.calls.load(Ordering::SeqCst), 0);
    assert!(storage.snapshots().list().unwrap().is_empty());
}
