use super::flattener::Flattener;
use super::locks::TaskLocks;
use super::reviewer::Reviewer;
use super::types::{
    CodebaseReviewRequest, ImplementationReviewRequest, PlanReviewRequest, ReviewResponse,
};
use crate::config::Config;
use crate::error::{ArchitectError, CollaboratorError, Result};
use crate::storage::{NewTask, SnapshotKind, Storage, TaskContext};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

const PLAN_WORKFLOW: &str = "review_plan";
const IMPLEMENTATION_WORKFLOW: &str = "review_implementation";

/// Upper bounds for collaborator calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// One flatten or diff call.
    pub flatten: Duration,
    /// One reviewer call.
    pub review: Duration,
}

impl Timeouts {
    pub fn from_config(config: &Config) -> Self {
        Self {
            flatten: Duration::from_secs(config.flattener.timeout_secs),
            review: Duration::from_secs(config.review.timeout_secs),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Sequences capture, review and persistence for plan and implementation reviews,
/// and runs the standalone codebase reviews.
///
/// Task workflows hold the task's lock from their first read to their final
/// save, and write the task context exactly once, as the last step. The lock
/// covers other processes sharing the storage root through a lock file.
pub struct ReviewOrchestrator {
    storage: Arc<Storage>,
    flattener: Arc<dyn Flattener>,
    reviewer: Arc<dyn Reviewer>,
    locks: TaskLocks,
    timeouts: Timeouts,
}

/// Identifies one workflow invocation in errors and logs.
struct Run<'a> {
    workflow: &'static str,
    subject: &'a str,
    started: Instant,
}

impl Run<'_> {
    fn fail(&self, step: &'static str) -> impl FnOnce(ArchitectError) -> ArchitectError + '_ {
        move |source| ArchitectError::Workflow {
            workflow: self.workflow,
            subject: self.subject.to_string(),
            step,
            source: Box::new(source),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn finish(&self, result: &Result<ReviewResponse>) {
        match result {
            Ok(review) => tracing::info!(
                workflow = self.workflow,
                subject = self.subject,
                approved = review.approved,
                duration_ms = self.elapsed_ms(),
                "workflow completed"
            ),
            Err(error) => tracing::error!(
                workflow = self.workflow,
                subject = self.subject,
                code = error.code(),
                error = %error,
                duration_ms = self.elapsed_ms(),
                "workflow failed"
            ),
        }
    }
}

impl ReviewOrchestrator {
    pub fn new(
        storage: Arc<Storage>,
        flattener: Arc<dyn Flattener>,
        reviewer: Arc<dyn Reviewer>,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            locks: TaskLocks::with_lock_dir(storage.locks_dir()),
            storage,
            flattener,
            reviewer,
            timeouts,
        }
    }

    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    /// Flatten the codebase, store it as a `pre` snapshot, review the plan and
    /// start a fresh task record holding that single review.
    pub async fn review_plan(&self, request: PlanReviewRequest) -> Result<ReviewResponse> {
        let run = Run {
            workflow: PLAN_WORKFLOW,
            subject: &request.task_id,
            started: Instant::now(),
        };
        tracing::info!(
            workflow = run.workflow,
            task_id = run.subject,
            codebase_path = %request.codebase_path,
            "workflow started"
        );

        let result = self.run_plan(&run, &request).await;
        run.finish(&result);
        result
    }

    async fn run_plan(&self, run: &Run<'_>, request: &PlanReviewRequest) -> Result<ReviewResponse> {
        require(&[
            ("taskId", &request.task_id),
            ("taskDescription", &request.task_description),
            ("implementationPlan", &request.implementation_plan),
            ("codebasePath", &request.codebase_path),
        ])
        .map_err(run.fail("validate"))?;

        let _guard = self
            .locks
            .acquire(&request.task_id)
            .await
            .map_err(run.fail("lock"))?;

        tracing::debug!(task_id = run.subject, "flattening codebase");
        let flattened = bounded(
            "flatten",
            self.timeouts.flatten,
            self.flattener.flatten(&request.codebase_path),
        )
        .await
        .map_err(run.fail("flatten"))?;

        // The store hands the content back so the reviewer sees exactly what was persisted.
        let (snapshot_id, flattened) = {
            let task_id = request.task_id.clone();
            self.blocking(move |storage| {
                storage
                    .snapshots()
                    .store(&task_id, &flattened, SnapshotKind::Pre)
                    .map(|id| (id, flattened))
            })
            .await
            .map_err(run.fail("store_snapshot"))?
        };
        tracing::debug!(task_id = run.subject, snapshot_id = %snapshot_id, "stored pre snapshot");

        let review = bounded(
            "review",
            self.timeouts.review,
            self.reviewer.review_plan(
                &request.task_id,
                &request.task_description,
                &request.implementation_plan,
                &flattened,
            ),
        )
        .await
        .map_err(run.fail("review"))?;

        let mut context = TaskContext::new(
            &request.task_id,
            &request.task_description,
            &request.implementation_plan,
        );
        context.pre_snapshot_id = Some(snapshot_id);
        context.push_review(review.clone());
        self.blocking(move |storage| storage.contexts().save(&mut context))
            .await
            .map_err(run.fail("save_context"))?;

        Ok(review)
    }

    /// Diff the two trees, store the after-tree as a `post` snapshot, review
    /// the changes and append the review to the task record.
    pub async fn review_implementation(
        &self,
        request: ImplementationReviewRequest,
    ) -> Result<ReviewResponse> {
        let run = Run {
            workflow: IMPLEMENTATION_WORKFLOW,
            subject: &request.task_id,
            started: Instant::now(),
        };
        tracing::info!(
            workflow = run.workflow,
            task_id = run.subject,
            before_path = %request.before_path,
            after_path = %request.after_path,
            "workflow started"
        );

        let result = self.run_implementation(&run, &request).await;
        run.finish(&result);
        result
    }

    async fn run_implementation(
        &self,
        run: &Run<'_>,
        request: &ImplementationReviewRequest,
    ) -> Result<ReviewResponse> {
        require(&[
            ("taskId", &request.task_id),
            ("taskDescription", &request.task_description),
            ("originalPlan", &request.original_plan),
            ("implementationSummary", &request.implementation_summary),
            ("beforePath", &request.before_path),
            ("afterPath", &request.after_path),
        ])
        .map_err(run.fail("validate"))?;

        let _guard = self
            .locks
            .acquire(&request.task_id)
            .await
            .map_err(run.fail("lock"))?;

        let mut context = {
            let task_id = request.task_id.clone();
            let task_description = request.task_description.clone();
            let plan = request.original_plan.clone();
            self.blocking(move |storage| {
                storage.contexts().create_or_load(
                    &task_id,
                    NewTask {
                        task_description: &task_description,
                        plan: &plan,
                    },
                )
            })
            .await
            .map_err(run.fail("load_context"))?
        };
        tracing::debug!(
            task_id = run.subject,
            prior_reviews = context.reviews().len(),
            "loaded task context"
        );

        let diff = bounded(
            "diff",
            self.timeouts.flatten,
            self.flattener
                .diff(&request.before_path, &request.after_path),
        )
        .await
        .map_err(run.fail("diff"))?;

        let flattened = bounded(
            "flatten",
            self.timeouts.flatten,
            self.flattener.flatten(&request.after_path),
        )
        .await
        .map_err(run.fail("flatten"))?;

        let snapshot_id = {
            let task_id = request.task_id.clone();
            self.blocking(move |storage| {
                storage
                    .snapshots()
                    .store(&task_id, &flattened, SnapshotKind::Post)
            })
            .await
            .map_err(run.fail("store_snapshot"))?
        };
        tracing::debug!(task_id = run.subject, snapshot_id = %snapshot_id, "stored post snapshot");

        let review = bounded(
            "review",
            self.timeouts.review,
            self.reviewer.review_implementation(
                &request.task_id,
                &request.task_description,
                &request.original_plan,
                &request.implementation_summary,
                &diff,
            ),
        )
        .await
        .map_err(run.fail("review"))?;

        context.implementation = Some(request.implementation_summary.clone());
        context.post_snapshot_id = Some(snapshot_id);
        context.push_review(review.clone());
        self.blocking(move |storage| storage.contexts().save(&mut context))
            .await
            .map_err(run.fail("save_context"))?;

        Ok(review)
    }

    /// Flatten a codebase and run a code, security or best-practices review on it.
    ///
    /// Touches neither the task lock nor storage.
    pub async fn review_codebase(&self, request: CodebaseReviewRequest) -> Result<ReviewResponse> {
        let run = Run {
            workflow: request.kind.workflow(),
            subject: &request.codebase_path,
            started: Instant::now(),
        };
        tracing::info!(
            workflow = run.workflow,
            codebase_path = %request.codebase_path,
            focus = ?request.focus,
            language = ?request.language,
            "workflow started"
        );

        let result = self.run_codebase(&run, &request).await;
        run.finish(&result);
        result
    }

    async fn run_codebase(
        &self,
        run: &Run<'_>,
        request: &CodebaseReviewRequest,
    ) -> Result<ReviewResponse> {
        require(&[("codebasePath", &request.codebase_path)]).map_err(run.fail("validate"))?;

        tracing::debug!(codebase_path = run.subject, "flattening codebase");
        let flattened = bounded(
            "flatten",
            self.timeouts.flatten,
            self.flattener.flatten(&request.codebase_path),
        )
        .await
        .map_err(run.fail("flatten"))?;
        if flattened.trim().is_empty() {
            return Err(run.fail("flatten")(
                CollaboratorError::Codebase {
                    path: request.codebase_path.clone(),
                    message: "flattened output is empty".into(),
                }
                .into(),
            ));
        }

        bounded(
            "review",
            self.timeouts.review,
            self.reviewer.review_codebase(request, &flattened),
        )
        .await
        .map_err(run.fail("review"))
    }

    /// Run a synchronous store call on the blocking pool.
    async fn blocking<T, F>(&self, call: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Storage) -> Result<T> + Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        tokio::task::spawn_blocking(move || call(&storage))
            .await
            .map_err(|e| ArchitectError::Other(anyhow::anyhow!("storage task failed: {e}")))?
    }
}

/// Fail on the first blank input.
fn require(fields: &[(&str, &String)]) -> Result<()> {
    match fields.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((name, _)) => Err(ArchitectError::Validation(format!(
            "{name} cannot be empty"
        ))),
        None => Ok(()),
    }
}

/// Await a collaborator call, mapping expiry to [`ArchitectError::Timeout`].
async fn bounded<T>(
    operation: &'static str,
    limit: Duration,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| ArchitectError::Timeout {
            operation,
            secs: limit.as_secs(),
        })?
}
