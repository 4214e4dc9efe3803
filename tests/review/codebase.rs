use crate::review_harness::{FakeFlattener, FakeReviewer, Harness};
use software_architect::ArchitectError;
use software_architect::review::{
    CodebaseReviewKind, CodebaseReviewRequest, ReviewType, Timeouts,
};
use std::sync::atomic::Ordering;
use std::time::Duration;

#[tokio::test]
async fn code_review_flattens_and_reviews_without_touching_storage() {
    let harness = Harness::healthy();

    let review = harness
        .orchestrator
        .review_codebase(CodebaseReviewRequest::new(CodebaseReviewKind::Code, "/repo"))
        .await
        .unwrap();

    assert!(review.approved);
    assert_eq!(review.review_type, ReviewType::Code);
    assert_eq!(review.metadata.task_id, "/repo");
    // "flattened:/repo" is 15 bytes.
    assert_eq!(review.feedback.summary, "code reviewed with 15 bytes of context");
    assert_eq!(harness.snapshot_count(), 0);
    assert_eq!(harness.storage.stats().unwrap().task_files, 0);
}

#[tokio::test]
async fn security_review_forwards_its_focus() {
    let harness = Harness::healthy();
    let request = CodebaseReviewRequest {
        focus: Some("authentication".into()),
        ..CodebaseReviewRequest::new(CodebaseReviewKind::Security, "/repo")
    };

    let review = harness.orchestrator.review_codebase(request).await.unwrap();
    assert_eq!(review.review_type, ReviewType::Security);
    assert_eq!(review.feedback.issues, vec!["focus: authentication".to_string()]);
}

#[tokio::test]
async fn best_practices_review_forwards_language_and_focus() {
    let harness = Harness::healthy();
    let request = CodebaseReviewRequest {
        focus: Some("testing".into()),
        language: Some("TypeScript".into()),
        ..CodebaseReviewRequest::new(CodebaseReviewKind::BestPractices, "/repo")
    };

    let review = harness.orchestrator.review_codebase(request).await.unwrap();
    assert_eq!(review.review_type, ReviewType::BestPractices);
    assert_eq!(
        review.feedback.issues,
        vec!["focus: testing".to_string(), "language: TypeScript".to_string()]
    );
}

#[tokio::test]
async fn blank_codebase_path_is_rejected_before_flattening() {
    let harness = Harness::healthy();

    let err = harness
        .orchestrator
        .review_codebase(CodebaseReviewRequest::new(CodebaseReviewKind::Code, "  "))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
    assert!(err.root().to_string().contains("codebasePath"));
    assert_eq!(harness.flattener.flatten_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn flatten_failure_carries_workflow_context() {
    let harness = Harness::new(
        FakeFlattener {
            fail_flatten: true,
            ..FakeFlattener::default()
        },
        FakeReviewer::default(),
    );

    let err = harness
        .orchestrator
        .review_codebase(CodebaseReviewRequest::new(
            CodebaseReviewKind::Security,
            "/repo",
        ))
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
            assert_eq!(*workflow, "security_review");
            assert_eq!(subject, "/repo");
            assert_eq!(*step, "flatten");
        }
        other => panic!("expected workflow context, got {other:?}"),
    }
    assert_eq!(harness.reviewer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_flattened_output_is_a_codebase_error() {
    let harness = Harness::new(
        FakeFlattener {
            empty: true,
            ..FakeFlattener::default()
        },
        FakeReviewer::default(),
    );

    let err = harness
        .orchestrator
        .review_codebase(CodebaseReviewRequest::new(
            CodebaseReviewKind::BestPractices,
            "/empty",
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "CODEBASE_ERROR");
    assert!(err.to_string().contains("flattened output is empty"));
    assert_eq!(harness.reviewer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn stalled_codebase_review_times_out() {
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
        .review_codebase(CodebaseReviewRequest::new(CodebaseReviewKind::Code, "/repo"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "TIMEOUT_ERROR");
}
