use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which workflow produced a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewType {
    Plan,
    Implementation,
    Code,
    Security,
    BestPractices,
}

impl ReviewType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Implementation => "implementation",
            Self::Code => "code",
            Self::Security => "security",
            Self::BestPractices => "best_practices",
        }
    }
}

impl fmt::Display for ReviewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewFeedback {
    pub summary: String,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewMetadata {
    pub task_id: String,
    pub reviewed_at: DateTime<Utc>,
    pub model_used: String,
    /// Model confidence, clamped to `[0, 1]`.
    pub confidence: f64,
}

/// Structured feedback for one plan or implementation review.
///
/// Opaque to the stores: contexts only ever append these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub approved: bool,
    pub review_type: ReviewType,
    pub feedback: ReviewFeedback,
    pub metadata: ReviewMetadata,
}

/// Inputs of a plan review.
#[derive(Debug, Clone)]
pub struct PlanReviewRequest {
    pub task_id: String,
    pub task_description: String,
    pub implementation_plan: String,
    pub codebase_path: String,
}

/// Inputs of an implementation review.
#[derive(Debug, Clone)]
pub struct ImplementationReviewRequest {
    pub task_id: String,
    pub task_description: String,
    pub original_plan: String,
    pub implementation_summary: String,
    pub before_path: String,
    pub after_path: String,
}

/// Standalone reviews of one codebase, outside any task lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodebaseReviewKind {
    Code,
    Security,
    BestPractices,
}

impl CodebaseReviewKind {
    pub fn review_type(self) -> ReviewType {
        match self {
            Self::Code => ReviewType::Code,
            Self::Security => ReviewType::Security,
            Self::BestPractices => ReviewType::BestPractices,
        }
    }

    /// Workflow name used in logs and error context.
    pub fn workflow(self) -> &'static str {
        match self {
            Self::Code => "code_review",
            Self::Security => "security_review",
            Self::BestPractices => "best_practices_review",
        }
    }
}

/// Inputs of a code, security or best-practices review.
#[derive(Debug, Clone)]
pub struct CodebaseReviewRequest {
    pub kind: CodebaseReviewKind,
    pub codebase_path: String,
    /// Area to concentrate on, e.g. `performance` or `authentication`.
    pub focus: Option<String>,
    /// Primary language; only best-practices reviews use it.
    pub language: Option<String>,
}

impl CodebaseReviewRequest {
    pub fn new(kind: CodebaseReviewKind, codebase_path: impl Into<String>) -> Self {
        Self {
            kind,
            codebase_path: codebase_path.into(),
            focus: None,
            language: None,
        }
    }
}
