//! Google Gemini `generateContent` client used for architectural reviews.
//!
//! Authentication is a plain API key (config, `GEMINI_API_KEY` or
//! `GOOGLE_API_KEY`), sent in the `x-goog-api-key` header so it never lands in
//! request URLs or logs.

use super::gemini_types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
};
use super::http_client::build_provider_client_with_timeout;
use super::scrub::sanitize_api_error;
use super::traits::ReviewModel;
use crate::config::ReviewConfig;
use async_trait::async_trait;
use reqwest::Client;

const MAX_OUTPUT_TOKENS: u32 = 8192;

pub struct GeminiProvider {
    api_key: Option<String>,
    api_base: String,
    model: String,
    temperature: f64,
    client: Client,
}

impl GeminiProvider {
    pub fn new(config: &ReviewConfig) -> Self {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .filter(|k| !k.is_empty());

        Self {
            api_key,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            client: build_provider_client_with_timeout(config.timeout_secs),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn model_path(&self) -> String {
        if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        }
    }

    fn build_request(&self, system_prompt: &str, prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            system_instruction: (!system_prompt.is_empty()).then(|| Content {
                role: None,
                parts: vec![Part {
                    text: system_prompt.to_string(),
                }],
            }),
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: MAX_OUTPUT_TOKENS,
                response_mime_type: "application/json",
            },
        }
    }

    fn api_key(&self) -> anyhow::Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "Gemini API key not found. Set GEMINI_API_KEY or review.api_key in config.toml"
            )
        })
    }

    async fn ensure_success_status(
        response: reqwest::Response,
    ) -> anyhow::Result<reqwest::Response> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            let sanitized_error = sanitize_api_error(&error_text);
            anyhow::bail!("Gemini API error ({status}): {sanitized_error}");
        }

        Ok(response)
    }

    fn extract_text(result: &GenerateContentResponse) -> anyhow::Result<String> {
        if let Some(error) = &result.error {
            anyhow::bail!("Gemini API error: {}", sanitize_api_error(&error.message));
        }

        let candidate = result.candidates.as_ref().and_then(|c| c.first());
        let text = candidate
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = candidate
                .and_then(|c| c.finish_reason.as_deref())
                .unwrap_or("no candidates");
            anyhow::bail!("No response from Gemini ({reason})");
        }

        Ok(text)
    }
}

#[async_trait]
impl ReviewModel for GeminiProvider {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, system_prompt: &str, prompt: &str) -> anyhow::Result<String> {
        let api_key = self.api_key()?;
        let url = format!(
            "{}/v1beta/{}:generateContent",
            self.api_base,
            self.model_path()
        );
        let request = self.build_request(system_prompt, prompt);

        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "sending review request");

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;
        let response = Self::ensure_success_status(response).await?;
        let result: GenerateContentResponse = response.json().await?;
        Self::extract_text(&result)
    }
}
