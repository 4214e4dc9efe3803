use super::Config;
use crate::error::ConfigError;
use std::fs;
use std::path::Path;

const MAX_TIMEOUT_SECS: u64 = 600;

impl Config {
    /// Load `~/.software-architect/config.toml`, writing defaults on first run,
    /// then apply environment overrides and validate.
    pub fn load_or_init() -> Result<Self, ConfigError> {
        let config_path = Self::home_dir()
            .join(".software-architect")
            .join("config.toml");

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            let config = Self {
                config_path,
                ..Self::default()
            };
            config.save()?;
            config
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without touching the environment.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
        config.config_path = path.to_path_buf();
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Load(format!("failed to serialize config: {e}")))?;
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.config_path, toml_str)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.max_size_mb == 0 {
            return Err(ConfigError::Validation(
                "storage.max_size_mb must be greater than 0".into(),
            ));
        }
        if self.storage.base_path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "storage.base_path must not be empty".into(),
            ));
        }
        for (name, secs) in [
            ("review.timeout_secs", self.review.timeout_secs),
            ("flattener.timeout_secs", self.flattener.timeout_secs),
        ] {
            if !(1..=MAX_TIMEOUT_SECS).contains(&secs) {
                return Err(ConfigError::Validation(format!(
                    "{name} must be between 1 and {MAX_TIMEOUT_SECS}, got {secs}"
                )));
            }
        }
        if !(0.0..=2.0).contains(&self.review.temperature) {
            return Err(ConfigError::Validation(format!(
                "review.temperature must be between 0.0 and 2.0, got {}",
                self.review.temperature
            )));
        }
        if self.review.model.trim().is_empty() {
            return Err(ConfigError::Validation("review.model must not be empty".into()));
        }
        if self.flattener.command.trim().is_empty() || self.flattener.diff_command.trim().is_empty()
        {
            return Err(ConfigError::Validation(
                "flattener commands must not be empty".into(),
            ));
        }
        Ok(())
    }
}
