use super::prompt::{PromptRenderer, SYSTEM_PROMPT};
use super::types::{
    CodebaseReviewRequest, ReviewFeedback, ReviewMetadata, ReviewResponse, ReviewType,
};
use crate::error::{CollaboratorError, Result};
use crate::providers::ReviewModel;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Turns a codebase or diff context into structured review feedback.
#[async_trait]
pub trait Reviewer: Send + Sync {
    async fn review_plan(
        &self,
        task_id: &str,
        task_description: &str,
        plan: &str,
        context: &str,
    ) -> Result<ReviewResponse>;

    async fn review_implementation(
        &self,
        task_id: &str,
        task_description: &str,
        original_plan: &str,
        summary: &str,
        diff: &str,
    ) -> Result<ReviewResponse>;

    /// Code, security or best-practices review of a flattened codebase.
    ///
    /// The codebase path stands in for the task id in the response metadata.
    async fn review_codebase(
        &self,
        request: &CodebaseReviewRequest,
        context: &str,
    ) -> Result<ReviewResponse>;
}

/// [`Reviewer`] backed by a text-generation model returning JSON.
pub struct ModelReviewer<M> {
    model: M,
    prompts: PromptRenderer,
}

impl<M: ReviewModel> ModelReviewer<M> {
    pub fn new(model: M) -> anyhow::Result<Self> {
        Ok(Self {
            model,
            prompts: PromptRenderer::new()?,
        })
    }

    fn service_error(&self, error: &anyhow::Error) -> CollaboratorError {
        CollaboratorError::ReviewService {
            model: self.model.name().to_string(),
            message: format!("{error:#}"),
        }
    }

    async fn run(
        &self,
        review_type: ReviewType,
        task_id: &str,
        prompt: anyhow::Result<String>,
    ) -> Result<ReviewResponse> {
        let prompt = prompt.map_err(|e| self.service_error(&e))?;
        let raw = self
            .model
            .generate(SYSTEM_PROMPT, &prompt)
            .await
            .map_err(|e| self.service_error(&e))?;

        let review = parse_review(&raw, review_type, task_id, self.model.name());
        tracing::debug!(
            task_id,
            review_type = %review_type,
            approved = review.approved,
            confidence = review.metadata.confidence,
            "model review parsed"
        );
        Ok(review)
    }
}

#[async_trait]
impl<M: ReviewModel> Reviewer for ModelReviewer<M> {
    async fn review_plan(
        &self,
        task_id: &str,
        task_description: &str,
        plan: &str,
        context: &str,
    ) -> Result<ReviewResponse> {
        let prompt = self
            .prompts
            .plan(task_id, task_description, plan, context);
        self.run(ReviewType::Plan, task_id, prompt).await
    }

    async fn review_implementation(
        &self,
        task_id: &str,
        task_description: &str,
        original_plan: &str,
        summary: &str,
        diff: &str,
    ) -> Result<ReviewResponse> {
        let prompt =
            self.prompts
                .implementation(task_id, task_description, original_plan, summary, diff);
        self.run(ReviewType::Implementation, task_id, prompt).await
    }

    async fn review_codebase(
        &self,
        request: &CodebaseReviewRequest,
        context: &str,
    ) -> Result<ReviewResponse> {
        let prompt = self.prompts.codebase(request, context);
        self.run(request.kind.review_type(), &request.codebase_path, prompt)
            .await
    }
}

/// Locate the JSON object inside model output that may be fenced or wrapped in prose.
fn extract_json(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let rest = &text[start + "```json".len()..];
        if let Some(end) = rest.find("```") {
            let candidate = rest[..end].trim();
            if !candidate.is_empty() {
                return Some(candidate);
            }
        }
    }

    let open = text.find('{')?;
    let close = text.rfind('}')?;
    (close > open).then(|| &text[open..=close])
}

/// Interpret raw model output as a review, filling every missing field.
///
/// Never fails: output that is not a JSON object becomes a rejected review
/// carrying a diagnostic issue.
pub(crate) fn parse_review(
    raw: &str,
    review_type: ReviewType,
    task_id: &str,
    model_used: &str,
) -> ReviewResponse {
    let parsed = extract_json(raw)
        .ok_or_else(|| "no JSON object in model output".to_string())
        .and_then(|json| serde_json::from_str::<Value>(json).map_err(|e| e.to_string()));

    let (approved, feedback, confidence) = match parsed {
        Ok(Value::Object(object)) => {
            let object = Value::Object(object);
            // Feedback fields may be nested under `feedback` or sit at the top level.
            let feedback = object
                .get("feedback")
                .filter(|f| f.is_object())
                .unwrap_or(&object);
            let confidence = object
                .pointer("/metadata/confidence")
                .or_else(|| object.get("confidence"))
                .and_then(Value::as_f64)
                .filter(|c| c.is_finite())
                .map_or(DEFAULT_CONFIDENCE, |c| c.clamp(0.0, 1.0));

            (
                object
                    .get("approved")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                ReviewFeedback {
                    summary: feedback
                        .get("summary")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    issues: string_list(feedback.get("issues")),
                    suggestions: string_list(feedback.get("suggestions")),
                    strengths: string_list(feedback.get("strengths")),
                },
                confidence,
            )
        }
        Ok(other) => malformed(&format!("expected a JSON object, got {}", kind_of(&other))),
        Err(error) => malformed(&error),
    };

    ReviewResponse {
        approved,
        review_type,
        feedback,
        metadata: ReviewMetadata {
            task_id: task_id.to_string(),
            reviewed_at: Utc::now(),
            model_used: model_used.to_string(),
            confidence,
        },
    }
}

fn malformed(reason: &str) -> (bool, ReviewFeedback, f64) {
    tracing::warn!(reason, "model returned malformed review output");
    (
        false,
        ReviewFeedback {
            summary: "Review response could not be parsed".into(),
            issues: vec![format!("Malformed review output from model: {reason}")],
            suggestions: Vec::new(),
            strengths: Vec::new(),
        },
        0.0,
    )
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
                Value::String(_) | Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[path = "reviewer_tests.rs"]
mod tests;
