use async_trait::async_trait;

/// A text-generation backend able to answer one system + user prompt.
///
/// Implementations return the raw model text; interpreting it as a review
/// is the caller's job.
#[async_trait]
pub trait ReviewModel: Send + Sync {
    /// Model identifier recorded in review metadata.
    fn name(&self) -> &str;

    async fn generate(&self, system_prompt: &str, prompt: &str) -> anyhow::Result<String>;
}
