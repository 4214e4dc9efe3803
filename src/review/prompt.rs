use super::types::{CodebaseReviewKind, CodebaseReviewRequest};
use tera::{Context, Tera};

pub(crate) const SYSTEM_PROMPT: &str = "\
You are a senior software architect reviewing work for a development team.
Judge architecture, correctness, maintainability, security and test coverage.
Respond with a single JSON object and nothing else, shaped exactly as:
{\"approved\": boolean, \"feedback\": {\"summary\": string, \"issues\": [string], \
\"suggestions\": [string], \"strengths\": [string]}, \"metadata\": {\"confidence\": number between 0 and 1}}";

const PLAN_TEMPLATE: &str = "\
Review the following implementation plan before any code is written.

## Task ID
{{ task_id }}

## Task Description
{{ task_description }}

## Implementation Plan
{{ plan }}

## Current Codebase
{{ context }}

Approve only if the plan is sound and fits the existing codebase.";

const IMPLEMENTATION_TEMPLATE: &str = "\
Review the following implementation against the plan it was meant to follow.

## Task ID
{{ task_id }}

## Task Description
{{ task_description }}

## Original Plan
{{ original_plan }}

## Implementation Summary
{{ summary }}

## Changes (unified diff of the flattened codebase)
{{ diff }}

Approve only if the changes deliver the plan without introducing regressions.";

const CODE_TEMPLATE: &str = "\
Review the following codebase as a whole: architecture, correctness, maintainability and performance.
{% if focus %}
## Review Focus
{{ focus }}
{% endif %}
## Codebase
{{ context }}

Approve only if the codebase is in a healthy state to build on.";

const SECURITY_TEMPLATE: &str = "\
Review the following codebase for security vulnerabilities such as injection, broken \
authentication, unsafe cryptography and leaked secrets. Report each vulnerability as an \
issue naming its location and severity.
{% if focus %}
## Security Focus
{{ focus }}
{% endif %}
## Codebase
{{ context }}

Approve only if no exploitable vulnerability was found.";

const BEST_PRACTICES_TEMPLATE: &str = "\
Review the following codebase against established best practices for naming, structure, \
testing and documentation.
{% if language %}
## Primary Language
{{ language }}
Apply the idioms and conventions of this language.
{% endif %}{% if focus %}
## Practices Focus
{{ focus }}
{% endif %}
## Codebase
{{ context }}

Approve only if the codebase follows the practices expected of production code.";

const PLAN_NAME: &str = "plan_review";
const IMPLEMENTATION_NAME: &str = "implementation_review";

/// Renders review prompts from inline templates.
pub struct PromptRenderer {
    tera: Tera,
}

impl PromptRenderer {
    pub fn new() -> anyhow::Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates([
            (PLAN_NAME, PLAN_TEMPLATE),
            (IMPLEMENTATION_NAME, IMPLEMENTATION_TEMPLATE),
            (CodebaseReviewKind::Code.workflow(), CODE_TEMPLATE),
            (CodebaseReviewKind::Security.workflow(), SECURITY_TEMPLATE),
            (CodebaseReviewKind::BestPractices.workflow(), BEST_PRACTICES_TEMPLATE),
        ])?;
        Ok(Self { tera })
    }

    pub fn plan(
        &self,
        task_id: &str,
        task_description: &str,
        plan: &str,
        context: &str,
    ) -> anyhow::Result<String> {
        let mut ctx = Context::new();
        ctx.insert("task_id", task_id);
        ctx.insert("task_description", task_description);
        ctx.insert("plan", plan);
        ctx.insert("context", context);
        Ok(self.tera.render(PLAN_NAME, &ctx)?)
    }

    pub fn implementation(
        &self,
        task_id: &str,
        task_description: &str,
        original_plan: &str,
        summary: &str,
        diff: &str,
    ) -> anyhow::Result<String> {
        let mut ctx = Context::new();
        ctx.insert("task_id", task_id);
        ctx.insert("task_description", task_description);
        ctx.insert("original_plan", original_plan);
        ctx.insert("summary", summary);
        ctx.insert("diff", diff);
        Ok(self.tera.render(IMPLEMENTATION_NAME, &ctx)?)
    }

    /// Blank focus or language values are left out of the prompt.
    pub fn codebase(&self, request: &CodebaseReviewRequest, context: &str) -> anyhow::Result<String> {
        let mut ctx = Context::new();
        ctx.insert("focus", &non_blank(request.focus.as_deref()));
        ctx.insert("language", &non_blank(request.language.as_deref()));
        ctx.insert("context", context);
        Ok(self.tera.render(request.kind.workflow(), &ctx)?)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
