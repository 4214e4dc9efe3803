use crate::cli::commands::{Cli, Commands};
use anyhow::{Context, Result};
use serde::Serialize;
use software_architect::config::Config;
use software_architect::error::ArchitectError;
use software_architect::providers::GeminiProvider;
use software_architect::review::{
    CodebaseReviewKind, CodebaseReviewRequest, CommandFlattener, ImplementationReviewRequest,
    ModelReviewer, PlanReviewRequest, ReviewOrchestrator, Timeouts,
};
use software_architect::storage::{Storage, StorageOptions};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Attach the stable error code so it leads the printed chain.
fn coded(error: ArchitectError) -> anyhow::Error {
    let code = error.code();
    anyhow::Error::new(error).context(code)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

fn open_storage(config: &Config) -> Result<Arc<Storage>> {
    Storage::open(StorageOptions::from_config(&config.storage))
        .map(Arc::new)
        .map_err(coded)
}

fn build_orchestrator(config: &Config) -> Result<ReviewOrchestrator> {
    let provider = GeminiProvider::new(&config.review);
    if !provider.has_api_key() {
        anyhow::bail!("No Gemini API key configured. Set GEMINI_API_KEY or review.api_key");
    }
    let reviewer = ModelReviewer::new(provider).context("Failed to build review prompts")?;

    Ok(ReviewOrchestrator::new(
        open_storage(config)?,
        Arc::new(CommandFlattener::new(config.flattener.clone())),
        Arc::new(reviewer),
        Timeouts::from_config(config),
    ))
}

async fn review_codebase(config: &Config, request: CodebaseReviewRequest) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;
    let review = orchestrator
        .review_codebase(request)
        .await
        .map_err(coded)?;
    print_json(&review)
}

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::ReviewPlan {
            task_id,
            description,
            plan,
            codebase,
        } => {
            let orchestrator = build_orchestrator(&config)?;
            let review = orchestrator
                .review_plan(PlanReviewRequest {
                    task_id,
                    task_description: description,
                    implementation_plan: plan,
                    codebase_path: codebase,
                })
                .await
                .map_err(coded)?;
            print_json(&review)
        }

        Commands::ReviewImplementation {
            task_id,
            description,
            plan,
            summary,
            before,
            after,
        } => {
            let orchestrator = build_orchestrator(&config)?;
            let review = orchestrator
                .review_implementation(ImplementationReviewRequest {
                    task_id,
                    task_description: description,
                    original_plan: plan,
                    implementation_summary: summary,
                    before_path: before,
                    after_path: after,
                })
                .await
                .map_err(coded)?;
            print_json(&review)
        }

        Commands::CodeReview { codebase, focus } => {
            let request = CodebaseReviewRequest {
                focus,
                ..CodebaseReviewRequest::new(CodebaseReviewKind::Code, codebase)
            };
            review_codebase(&config, request).await
        }

        Commands::SecurityReview { codebase, focus } => {
            let request = CodebaseReviewRequest {
                focus,
                ..CodebaseReviewRequest::new(CodebaseReviewKind::Security, codebase)
            };
            review_codebase(&config, request).await
        }

        Commands::BestPracticesReview {
            codebase,
            focus,
            language,
        } => {
            let request = CodebaseReviewRequest {
                focus,
                language,
                ..CodebaseReviewRequest::new(CodebaseReviewKind::BestPractices, codebase)
            };
            review_codebase(&config, request).await
        }

        Commands::ShowTask { task_id } => {
            let storage = open_storage(&config)?;
            match storage.contexts().load(&task_id).map_err(coded)? {
                Some(context) => print_json(&context),
                None => anyhow::bail!("No context stored for task {task_id}"),
            }
        }

        Commands::Snapshot { snapshot_id } => {
            let storage = open_storage(&config)?;
            let content = storage
                .snapshots()
                .retrieve(&snapshot_id)
                .map_err(coded)?;
            print!("{content}");
            Ok(())
        }

        Commands::Cleanup { max_age_hours } => {
            let storage = open_storage(&config)?;
            let hours = max_age_hours.unwrap_or(config.storage.cleanup_max_age_hours);
            let report = storage
                .snapshots()
                .cleanup(Duration::from_secs(hours.saturating_mul(3600)));
            info!(max_age_hours = hours, removed = report.removed, "cleanup finished");
            print_json(&report)
        }

        Commands::Purge { task_id } => {
            let storage = open_storage(&config)?;
            let report = storage.purge_task(&task_id).map_err(coded)?;
            print_json(&report)
        }

        Commands::Stats => {
            let storage = open_storage(&config)?;
            print_json(&storage.stats().map_err(coded)?)
        }
    }
}
