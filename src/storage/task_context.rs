use super::atomic::write_atomic;
use super::sanitize::sanitize_task_id;
use crate::error::{Result, StorageError};
use crate::review::ReviewResponse;
use crate::security::AtRest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONTEXT_EXT: &str = "json";

/// Durable record of one task's plan/implementation lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskContext {
    pub task_id: String,
    pub task_description: String,
    pub plan: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<String>,
    #[serde(default)]
    pub pre_snapshot_id: Option<String>,
    #[serde(default)]
    pub post_snapshot_id: Option<String>,
    #[serde(default)]
    reviews: Vec<ReviewResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskContext {
    pub fn new(task_id: &str, task_description: &str, plan: &str) -> Self {
        let now = Utc::now();
        Self {
            task_id: task_id.to_string(),
            task_description: task_description.to_string(),
            plan: plan.to_string(),
            implementation: None,
            pre_snapshot_id: None,
            post_snapshot_id: None,
            reviews: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Reviews in the order they were appended.
    pub fn reviews(&self) -> &[ReviewResponse] {
        &self.reviews
    }

    pub fn push_review(&mut self, review: ReviewResponse) {
        self.reviews.push(review);
    }
}

/// Fields used to seed a context that does not exist yet.
#[derive(Debug, Clone)]
pub struct NewTask<'a> {
    pub task_description: &'a str,
    pub plan: &'a str,
}

/// One JSON record per task under `<base>/tasks/`.
///
/// Each `save`/`load` is atomic on its own; a load-then-save pair is not.
pub struct TaskContextStore {
    dir: PathBuf,
    codec: AtRest,
}

impl TaskContextStore {
    pub fn new(dir: PathBuf, codec: AtRest) -> Self {
        Self { dir, codec }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load(&self, task_id: &str) -> Result<Option<TaskContext>> {
        let path = self.path_for(task_id);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(StorageError::io(&path, error).into()),
        };

        let json = self.codec.open(raw)?;
        let context: TaskContext =
            serde_json::from_str(&json).map_err(|e| StorageError::CorruptContext {
                task_id: task_id.to_string(),
                message: e.to_string(),
            })?;

        if context.task_id != task_id {
            return Err(StorageError::CorruptContext {
                task_id: task_id.to_string(),
                message: format!("file belongs to task {}", context.task_id),
            }
            .into());
        }
        Ok(Some(context))
    }

    /// Stamp `updated_at` and persist the whole record.
    pub fn save(&self, context: &mut TaskContext) -> Result<()> {
        context.updated_at = Utc::now().max(context.created_at);

        let json = serde_json::to_string_pretty(context).map_err(|e| {
            StorageError::CorruptContext {
                task_id: context.task_id.clone(),
                message: e.to_string(),
            }
        })?;
        let sealed = self.codec.seal(&json)?;
        write_atomic(&self.path_for(&context.task_id), &sealed)?;

        tracing::debug!(
            task_id = %context.task_id,
            reviews = context.reviews.len(),
            "saved task context"
        );
        Ok(())
    }

    /// The stored context, or a fresh unsaved one seeded from `defaults`.
    pub fn create_or_load(&self, task_id: &str, defaults: NewTask<'_>) -> Result<TaskContext> {
        if let Some(existing) = self.load(task_id)? {
            return Ok(existing);
        }
        Ok(TaskContext::new(
            task_id,
            defaults.task_description,
            defaults.plan,
        ))
    }

    /// Remove the task's record. Returns whether a file existed.
    pub fn delete(&self, task_id: &str) -> Result<bool> {
        let path = self.path_for(task_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(error) => Err(StorageError::io(&path, error).into()),
        }
    }

    fn path_for(&self, task_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{CONTEXT_EXT}", sanitize_task_id(task_id)))
    }
}

#[cfg(test)]
#[path = "task_context_tests.rs"]
mod tests;
