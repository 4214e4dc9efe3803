use super::super::{FlattenerConfig, ReviewConfig, StorageConfig};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub review: ReviewConfig,

    #[serde(default)]
    pub flattener: FlattenerConfig,
}

impl Config {
    pub(super) fn home_dir() -> PathBuf {
        UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: Self::home_dir()
                .join(".software-architect")
                .join("config.toml"),
            storage: StorageConfig::default(),
            review: ReviewConfig::default(),
            flattener: FlattenerConfig::default(),
        }
    }
}
