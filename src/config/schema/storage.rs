use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root holding `snapshots/` and `tasks/`
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,
    /// Encrypt snapshots and task contexts at rest
    #[serde(default)]
    pub encrypt: bool,
    /// Largest snapshot accepted, in MiB
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,
    /// Snapshots older than this are removed by `cleanup`
    #[serde(default = "default_cleanup_max_age_hours")]
    pub cleanup_max_age_hours: u64,
}

fn default_base_path() -> PathBuf {
    UserDirs::new()
        .map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf())
        .join(".tmp")
        .join("software-architect")
}
fn default_max_size_mb() -> u64 {
    100
}
fn default_cleanup_max_age_hours() -> u64 {
    24
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            encrypt: false,
            max_size_mb: default_max_size_mb(),
            cleanup_max_age_hours: default_cleanup_max_age_hours(),
        }
    }
}
