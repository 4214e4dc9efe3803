use crate::config::FlattenerConfig;
use crate::error::{CollaboratorError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;

const MAX_STDERR_CHARS: usize = 500;

/// Converts directory trees into reviewable text.
#[async_trait]
pub trait Flattener: Send + Sync {
    /// Flatten one tree into a single text document.
    async fn flatten(&self, path: &str) -> Result<String>;

    /// Unified diff between the flattened forms of two trees.
    async fn diff(&self, before: &str, after: &str) -> Result<String>;
}

/// [`Flattener`] that shells out to a flattening tool (repomix by default)
/// and to `diff -u`.
///
/// Children are spawned with `kill_on_drop`, so dropping the future on a
/// timeout terminates them.
pub struct CommandFlattener {
    config: FlattenerConfig,
}

impl CommandFlattener {
    pub fn new(config: FlattenerConfig) -> Self {
        Self { config }
    }

    fn codebase_error(path: &str, message: impl Into<String>) -> CollaboratorError {
        CollaboratorError::Codebase {
            path: path.to_string(),
            message: message.into(),
        }
    }

    async fn resolve_dir(path: &str) -> std::result::Result<PathBuf, String> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| format!("path is not accessible: {e}"))?;
        if !meta.is_dir() {
            return Err("path is not a directory".into());
        }
        tokio::fs::canonicalize(path)
            .await
            .map_err(|e| format!("failed to resolve path: {e}"))
    }

    async fn flatten_into(&self, path: &str, output: &Path) -> std::result::Result<String, String> {
        let dir = Self::resolve_dir(path).await?;

        let result = Command::new(&self.config.command)
            .args(&self.config.args)
            .arg("--style")
            .arg("plain")
            .arg("--output")
            .arg(output)
            .arg(&dir)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| format!("failed to run {}: {e}", self.config.command))?;

        if !result.status.success() {
            return Err(format!(
                "{} exited with {}: {}",
                self.config.command,
                result.status,
                stderr_excerpt(&result)
            ));
        }

        tokio::fs::read_to_string(output)
            .await
            .map_err(|e| format!("flattened output unreadable: {e}"))
    }
}

#[async_trait]
impl Flattener for CommandFlattener {
    async fn flatten(&self, path: &str) -> Result<String> {
        let scratch = scratch_dir().map_err(|e| Self::codebase_error(path, e))?;
        let content = self
            .flatten_into(path, &scratch.path().join("flattened.txt"))
            .await
            .map_err(|e| Self::codebase_error(path, e))?;

        tracing::debug!(path, bytes = content.len(), "flattened codebase");
        Ok(content)
    }

    async fn diff(&self, before: &str, after: &str) -> Result<String> {
        let diff_error = |message: String| CollaboratorError::Diff {
            before: before.to_string(),
            after: after.to_string(),
            message,
        };

        let scratch = scratch_dir().map_err(diff_error)?;
        let before_file = scratch.path().join("before.txt");
        let after_file = scratch.path().join("after.txt");

        self.flatten_into(before, &before_file)
            .await
            .map_err(|e| diff_error(format!("{before}: {e}")))?;
        self.flatten_into(after, &after_file)
            .await
            .map_err(|e| diff_error(format!("{after}: {e}")))?;

        let result = Command::new(&self.config.diff_command)
            .arg("-u")
            .arg("--label")
            .arg(before)
            .arg("--label")
            .arg(after)
            .arg(&before_file)
            .arg(&after_file)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| diff_error(format!("failed to run {}: {e}", self.config.diff_command)))?;

        // diff exits 0 when identical and 1 when the inputs differ.
        match result.status.code() {
            Some(0 | 1) => {
                let diff = String::from_utf8_lossy(&result.stdout).into_owned();
                tracing::debug!(before, after, bytes = diff.len(), "computed diff");
                Ok(diff)
            }
            _ => Err(diff_error(format!(
                "{} exited with {}: {}",
                self.config.diff_command,
                result.status,
                stderr_excerpt(&result)
            ))
            .into()),
        }
    }
}

fn scratch_dir() -> std::result::Result<tempfile::TempDir, String> {
    tempfile::Builder::new()
        .prefix("software-architect-")
        .tempdir()
        .map_err(|e| format!("failed to create scratch directory: {e}"))
}

fn stderr_excerpt(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let trimmed = stderr.trim();
    if trimmed.chars().count() <= MAX_STDERR_CHARS {
        return trimmed.to_string();
    }
    let excerpt: String = trimmed.chars().take(MAX_STDERR_CHARS).collect();
    format!("{excerpt}...")
}
