use crate::error::{ArchitectError, Result, StorageError};
use crate::storage::sanitize_task_id;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

const LOCK_EXT: &str = "lock";

type Slot = Arc<AsyncMutex<()>>;
type Slots = Arc<Mutex<HashMap<String, Slot>>>;

/// Per-task mutual exclusion keyed by the sanitized task token.
///
/// Inside a process, callers queue on a lazily created async mutex. Its map
/// entry goes away once no holder or waiter references it, cancelled waiters
/// included. With a lock directory the holder also takes an exclusive
/// advisory lock on `<dir>/<token>.lock`, so separate processes sharing one
/// storage root are serialized as well.
#[derive(Default)]
pub struct TaskLocks {
    slots: Slots,
    lock_dir: Option<PathBuf>,
}

impl TaskLocks {
    /// In-process locking only.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lock_dir(dir: PathBuf) -> Self {
        Self {
            slots: Slots::default(),
            lock_dir: Some(dir),
        }
    }

    /// Wait for exclusive access to `task_id`.
    pub async fn acquire(&self, task_id: &str) -> Result<TaskLockGuard> {
        let lease = SlotLease::take(&self.slots, sanitize_task_id(task_id));
        let guard = Arc::clone(&lease.slot).lock_owned().await;

        let file = match &self.lock_dir {
            Some(dir) => Some(lock_file(dir, &lease.token).await?),
            None => None,
        };

        Ok(TaskLockGuard {
            _file: file,
            _guard: guard,
            _lease: lease,
        })
    }

    /// Number of tasks currently holding or awaiting a lock.
    pub fn active(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// One reference to a slot; the last lease out removes the map entry.
struct SlotLease {
    slot: Slot,
    token: String,
    slots: Slots,
}

impl SlotLease {
    fn take(slots: &Slots, token: String) -> Self {
        let slot = {
            let mut map = slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(map.entry(token.clone()).or_default())
        };
        Self {
            slot,
            token,
            slots: Arc::clone(slots),
        }
    }
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // Map entry plus this lease: nobody else holds or awaits the slot.
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.token);
        }
    }
}

/// Releases the task lock on drop.
///
/// Fields drop in declaration order: the file lock, then the in-process
/// mutex, then the slot lease.
pub struct TaskLockGuard {
    _file: Option<File>,
    _guard: OwnedMutexGuard<()>,
    _lease: SlotLease,
}

/// Open `<dir>/<token>.lock` and block on an exclusive advisory lock.
///
/// Closing the returned file releases the lock.
async fn lock_file(dir: &Path, token: &str) -> Result<File> {
    let dir = dir.to_path_buf();
    let path = dir.join(format!("{token}.{LOCK_EXT}"));
    tokio::task::spawn_blocking(move || -> Result<File> {
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| StorageError::io(&path, e))?;
        file.lock().map_err(|e| StorageError::io(&path, e))?;
        Ok(file)
    })
    .await
    .map_err(|e| ArchitectError::Other(anyhow::anyhow!("lock task failed: {e}")))?
}
