use super::Config;
use std::path::PathBuf;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("ARCHITECT_STORAGE_PATH")
            && !path.is_empty()
        {
            self.storage.base_path = PathBuf::from(path);
        }

        if let Ok(flag) = std::env::var("ARCHITECT_ENCRYPT") {
            match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.storage.encrypt = true,
                "0" | "false" | "no" | "off" => self.storage.encrypt = false,
                _ => {}
            }
        }

        if let Ok(size_str) = std::env::var("ARCHITECT_MAX_SIZE_MB")
            && let Ok(size) = size_str.parse::<u64>()
            && size > 0
        {
            self.storage.max_size_mb = size;
        }

        if let Ok(model) = std::env::var("ARCHITECT_MODEL")
            && !model.is_empty()
        {
            self.review.model = model;
        }

        if let Ok(key) = std::env::var("GEMINI_API_KEY").or_else(|_| std::env::var("GOOGLE_API_KEY"))
            && !key.is_empty()
        {
            self.review.api_key = Some(key);
        }

        if let Ok(secs_str) = std::env::var("ARCHITECT_REVIEW_TIMEOUT_SECS")
            && let Ok(secs) = secs_str.parse::<u64>()
        {
            self.review.timeout_secs = secs;
        }

        if let Ok(secs_str) = std::env::var("ARCHITECT_FLATTEN_TIMEOUT_SECS")
            && let Ok(secs) = secs_str.parse::<u64>()
        {
            self.flattener.timeout_secs = secs;
        }
    }
}
