use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Gemini model used for both review kinds
    #[serde(default = "default_model")]
    pub model: String,
    /// API key; falls back to `GEMINI_API_KEY` / `GOOGLE_API_KEY`
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Upper bound for one review call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gemini-1.5-pro".into()
}
fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com".into()
}
fn default_temperature() -> f64 {
    0.2
}
fn default_timeout_secs() -> u64 {
    180
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            api_base: default_api_base(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}
