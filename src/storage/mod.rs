pub mod atomic;
pub mod sanitize;
pub mod snapshot;
pub mod task_context;

pub use sanitize::sanitize_task_id;
pub use snapshot::{CleanupReport, SnapshotKind, SnapshotRef, SnapshotStore};
pub use task_context::{NewTask, TaskContext, TaskContextStore};

use crate::config::StorageConfig;
use crate::error::{Result, StorageError};
use crate::security::{AtRest, ContentCipher};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const SNAPSHOTS_DIR: &str = "snapshots";
const TASKS_DIR: &str = "tasks";
const LOCKS_DIR: &str = "locks";

/// Immutable storage settings, fixed for the lifetime of a [`Storage`].
#[derive(Debug, Clone)]
pub struct StorageOptions {
    pub base_path: PathBuf,
    pub codec: AtRest,
    pub max_size_mb: u64,
}

impl StorageOptions {
    /// Build options from config, deriving the installation key when encryption is on.
    pub fn from_config(config: &StorageConfig) -> Self {
        let codec = if config.encrypt {
            AtRest::Encrypted(Arc::new(ContentCipher::from_installation()))
        } else {
            AtRest::Plaintext
        };
        Self {
            base_path: config.base_path.clone(),
            codec,
            max_size_mb: config.max_size_mb,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StorageStats {
    pub snapshot_files: usize,
    pub task_files: usize,
    pub total_size_bytes: u64,
    pub total_size_mb: f64,
}

/// Counts removed by [`Storage::purge_task`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub snapshots_removed: usize,
    pub context_removed: bool,
}

/// The storage root: a snapshot store and a task context store sharing one codec.
pub struct Storage {
    base_path: PathBuf,
    snapshots: SnapshotStore,
    contexts: TaskContextStore,
}

impl Storage {
    pub fn open(options: StorageOptions) -> Result<Self> {
        let snapshots_dir = options.base_path.join(SNAPSHOTS_DIR);
        let tasks_dir = options.base_path.join(TASKS_DIR);
        let locks_dir = options.base_path.join(LOCKS_DIR);
        for dir in [&snapshots_dir, &tasks_dir, &locks_dir] {
            fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
        }

        tracing::info!(
            base_path = %options.base_path.display(),
            encrypted = options.codec.is_encrypted(),
            max_size_mb = options.max_size_mb,
            "storage initialized"
        );

        Ok(Self {
            snapshots: SnapshotStore::new(
                snapshots_dir,
                options.codec.clone(),
                options.max_size_mb,
            ),
            contexts: TaskContextStore::new(tasks_dir, options.codec),
            base_path: options.base_path,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Where per-task advisory lock files live.
    pub fn locks_dir(&self) -> PathBuf {
        self.base_path.join(LOCKS_DIR)
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    pub fn contexts(&self) -> &TaskContextStore {
        &self.contexts
    }

    /// Remove every snapshot of the task plus its context record.
    pub fn purge_task(&self, task_id: &str) -> Result<PurgeReport> {
        let report = PurgeReport {
            snapshots_removed: self.snapshots.purge_task(task_id)?,
            context_removed: self.contexts.delete(task_id)?,
        };
        tracing::info!(
            task_id,
            snapshots_removed = report.snapshots_removed,
            context_removed = report.context_removed,
            "purged task files"
        );
        Ok(report)
    }

    pub fn stats(&self) -> Result<StorageStats> {
        let (snapshot_files, snapshot_bytes) = dir_usage(self.snapshots.dir())?;
        let (task_files, task_bytes) = dir_usage(self.contexts.dir())?;
        let total_size_bytes = snapshot_bytes + task_bytes;

        #[allow(clippy::cast_precision_loss)]
        let total_size_mb = total_size_bytes as f64 / (1024.0 * 1024.0);

        Ok(StorageStats {
            snapshot_files,
            task_files,
            total_size_bytes,
            total_size_mb,
        })
    }
}

fn dir_usage(dir: &Path) -> Result<(usize, u64)> {
    let read_dir = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok((0, 0)),
        Err(error) => return Err(StorageError::io(dir, error).into()),
    };

    let mut files = 0;
    let mut bytes = 0;
    for entry in read_dir {
        let path = entry.map_err(|e| StorageError::io(dir, e))?.path();
        if atomic::is_temp_file(&path) {
            continue;
        }
        let meta = match fs::metadata(&path) {
            Ok(meta) => meta,
            // Removed by a concurrent cleanup between listing and stat.
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => continue,
            Err(error) => return Err(StorageError::io(&path, error).into()),
        };
        if meta.is_file() {
            files += 1;
            bytes += meta.len();
        }
    }
    Ok((files, bytes))
}
