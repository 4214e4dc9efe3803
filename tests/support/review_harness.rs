use async_trait::async_trait;
use chrono::Utc;
use software_architect::error::{CollaboratorError, Result};
use software_architect::review::{
    CodebaseReviewRequest, Flattener, ImplementationReviewRequest, PlanReviewRequest,
    ReviewFeedback, ReviewMetadata, ReviewOrchestrator, ReviewResponse, ReviewType, Reviewer,
    Timeouts,
};
use software_architect::security::AtRest;
use software_architect::storage::{Storage, StorageOptions};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// In-process flattener: the "codebase" text is derived from the path.
#[derive(Default)]
pub struct FakeFlattener {
    pub fail_flatten: bool,
    /// Succeed with empty output, as a tool that found no files would.
    pub empty: bool,
    pub fail_diff: bool,
    pub delay: Option<Duration>,
    pub flatten_calls: AtomicUsize,
}

#[async_trait]
impl Flattener for FakeFlattener {
    async fn flatten(&self, path: &str) -> Result<String> {
        self.flatten_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_flatten {
            return Err(CollaboratorError::Codebase {
                path: path.to_string(),
                message: "path is not accessible".into(),
            }
            .into());
        }
        if self.empty {
            return Ok(String::new());
        }
        Ok(format!("flattened:{path}"))
    }

    async fn diff(&self, before: &str, after: &str) -> Result<String> {
        if self.fail_diff {
            return Err(CollaboratorError::Diff {
                before: before.to_string(),
                after: after.to_string(),
                message: "path is not accessible".into(),
            }
            .into());
        }
        Ok(format!("--- {before}\n+++ {after}\n+change\n"))
    }
}

/// Reviewer returning canned approvals, optionally failing or stalling.
#[derive(Default)]
pub struct FakeReviewer {
    pub fail: bool,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl FakeReviewer {
    async fn respond(&self, task_id: &str, review_type: ReviewType, context: &str) -> Result<ReviewResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(CollaboratorError::ReviewService {
                model: "fake".into(),
                message: "upstream unavailable".into(),
            }
            .into());
        }
        Ok(ReviewResponse {
            approved: true,
            review_type,
            feedback: ReviewFeedback {
                summary: format!("{review_type} reviewed with {} bytes of context", context.len()),
                issues: Vec::new(),
                suggestions: vec!["Add tests".into()],
                strengths: vec!["Clear structure".into()],
            },
            metadata: ReviewMetadata {
                task_id: task_id.to_string(),
                reviewed_at: Utc::now(),
                model_used: "fake".into(),
                confidence: 0.9,
            },
        })
    }
}

#[async_trait]
impl Reviewer for FakeReviewer {
    async fn review_plan(
        &self,
        task_id: &str,
        _task_description: &str,
        _plan: &str,
        context: &str,
    ) -> Result<ReviewResponse> {
        self.respond(task_id, ReviewType::Plan, context).await
    }

    async fn review_implementation(
        &self,
        task_id: &str,
        _task_description: &str,
        _original_plan: &str,
        _summary: &str,
        diff: &str,
    ) -> Result<ReviewResponse> {
        self.respond(task_id, ReviewType::Implementation, diff).await
    }

    async fn review_codebase(
        &self,
        request: &CodebaseReviewRequest,
        context: &str,
    ) -> Result<ReviewResponse> {
        let mut review = self
            .respond(&request.codebase_path, request.kind.review_type(), context)
            .await?;
        if let Some(focus) = &request.focus {
            review.feedback.issues.push(format!("focus: {focus}"));
        }
        if let Some(language) = &request.language {
            review.feedback.issues.push(format!("language: {language}"));
        }
        Ok(review)
    }
}

pub struct Harness {
    pub tmp: TempDir,
    pub storage: Arc<Storage>,
    pub flattener: Arc<FakeFlattener>,
    pub reviewer: Arc<FakeReviewer>,
    pub orchestrator: ReviewOrchestrator,
}

impl Harness {
    pub fn new(flattener: FakeFlattener, reviewer: FakeReviewer) -> Self {
        Self::with_timeouts(flattener, reviewer, Timeouts::default())
    }

    pub fn with_timeouts(flattener: FakeFlattener, reviewer: FakeReviewer, timeouts: Timeouts) -> Self {
        let tmp = TempDir::new().unwrap();
        let storage = Arc::new(
            Storage::open(StorageOptions {
                base_path: tmp.path().to_path_buf(),
                codec: AtRest::Plaintext,
                max_size_mb: 100,
            })
            .unwrap(),
        );
        let flattener = Arc::new(flattener);
        let reviewer = Arc::new(reviewer);
        let orchestrator = ReviewOrchestrator::new(
            Arc::clone(&storage),
            Arc::clone(&flattener) as Arc<dyn Flattener>,
            Arc::clone(&reviewer) as Arc<dyn Reviewer>,
            timeouts,
        );
        Self {
            tmp,
            storage,
            flattener,
            reviewer,
            orchestrator,
        }
    }

    pub fn healthy() -> Self {
        Self::new(FakeFlattener::default(), FakeReviewer::default())
    }

    /// Another orchestrator over the same storage root, as a separate CLI
    /// process would build it: its own `Storage` and its own lock table.
    pub fn second_process(&self, reviewer: FakeReviewer) -> ReviewOrchestrator {
        let storage = Storage::open(StorageOptions {
            base_path: self.tmp.path().to_path_buf(),
            codec: AtRest::Plaintext,
            max_size_mb: 100,
        })
        .unwrap();
        ReviewOrchestrator::new(
            Arc::new(storage),
            Arc::new(FakeFlattener::default()),
            Arc::new(reviewer),
            Timeouts::default(),
        )
    }

    /// Snapshot files currently on disk.
    pub fn snapshot_count(&self) -> usize {
        self.storage.snapshots().list().unwrap().len()
    }
}

pub fn plan_request(task_id: &str) -> PlanReviewRequest {
    PlanReviewRequest {
        task_id: task_id.to_string(),
        task_description: "Implement user authentication".into(),
        implementation_plan: "Use JWT tokens with refresh token rotation".into(),
        codebase_path: "/repo".into(),
    }
}

pub fn implementation_request(task_id: &str) -> ImplementationReviewRequest {
    ImplementationReviewRequest {
        task_id: task_id.to_string(),
        task_description: "Implement user authentication".into(),
        original_plan: "Use JWT tokens with refresh token rotation".into(),
        implementation_summary: "Added JWT issuing and refresh endpoints".into(),
        before_path: "/repo-before".into(),
        after_path: "/repo-after".into(),
    }
}
