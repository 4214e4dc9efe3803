use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenerConfig {
    /// Program that flattens a directory tree (`npx` runs repomix)
    #[serde(default = "default_command")]
    pub command: String,
    /// Leading arguments; `--style plain --output <file> <path>` are appended
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Program producing a unified diff of two files
    #[serde(default = "default_diff_command")]
    pub diff_command: String,
    /// Upper bound for one flatten or diff call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_command() -> String {
    "npx".into()
}
fn default_args() -> Vec<String> {
    vec!["repomix".into()]
}
fn default_diff_command() -> String {
    "diff".into()
}
fn default_timeout_secs() -> u64 {
    300
}

impl Default for FlattenerConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: default_args(),
            diff_command: default_diff_command(),
            timeout_secs: default_timeout_secs(),
        }
    }
}
