use super::atomic::{is_temp_file, write_atomic};
use super::sanitize::sanitize_task_id;
use crate::error::{Result, StorageError};
use crate::security::AtRest;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, SystemTime};

const SNAPSHOT_EXT: &str = "txt";
const SUFFIX_LEN: usize = 12;
const BYTES_PER_MB: u64 = 1024 * 1024;
/// In-flight writes younger than this are never swept, whatever the cleanup age.
const TEMP_GRACE: Duration = Duration::from_secs(3600);

/// Which side of a change a snapshot captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotKind {
    Pre,
    Post,
}

impl SnapshotKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pre => "pre",
            Self::Post => "post",
        }
    }
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SnapshotKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pre" => Ok(Self::Pre),
            "post" => Ok(Self::Post),
            other => Err(format!("unknown snapshot kind: {other}")),
        }
    }
}

/// The components encoded in a snapshot id: `{token}-{kind}-{millis}-{suffix}`.
///
/// Parsing works from the right, so a token that itself contains `-` is recovered
/// exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRef {
    pub token: String,
    pub kind: SnapshotKind,
    pub created_at_ms: i64,
}

impl SnapshotRef {
    pub fn parse(snapshot_id: &str) -> Option<Self> {
        let mut parts = snapshot_id.rsplitn(4, '-');
        let suffix = parts.next()?;
        let millis = parts.next()?;
        let kind = parts.next()?;
        let token = parts.next()?;

        let suffix_ok = suffix.len() == SUFFIX_LEN
            && suffix
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        let token_ok = !token.is_empty()
            && token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !suffix_ok || !token_ok || millis.is_empty() {
            return None;
        }

        Some(Self {
            token: token.to_string(),
            kind: kind.parse().ok()?,
            created_at_ms: millis.parse().ok()?,
        })
    }
}

fn new_snapshot_id(token: &str, kind: SnapshotKind) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{token}-{kind}-{millis}-{}", &random[..SUFFIX_LEN])
}

/// Outcome of an age-based cleanup pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub scanned: usize,
    pub removed: usize,
    pub failed: usize,
}

/// Immutable codebase snapshots under `<base>/snapshots/`.
pub struct SnapshotStore {
    dir: PathBuf,
    codec: AtRest,
    max_size_mb: u64,
}

impl SnapshotStore {
    pub fn new(dir: PathBuf, codec: AtRest, max_size_mb: u64) -> Self {
        Self {
            dir,
            codec,
            max_size_mb,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn store(&self, task_id: &str, content: &str, kind: SnapshotKind) -> Result<String> {
        let size_bytes = content.len();
        if size_bytes as u64 > self.max_size_mb.saturating_mul(BYTES_PER_MB) {
            return Err(StorageError::SizeLimitExceeded {
                size_bytes,
                max_mb: self.max_size_mb,
            }
            .into());
        }

        let snapshot_id = new_snapshot_id(&sanitize_task_id(task_id), kind);
        let sealed = self.codec.seal(content)?;
        write_atomic(&self.path_for(&snapshot_id), &sealed)?;

        tracing::debug!(
            snapshot_id = %snapshot_id,
            kind = %kind,
            size_bytes,
            encrypted = self.codec.is_encrypted(),
            "stored snapshot"
        );
        Ok(snapshot_id)
    }

    pub fn retrieve(&self, snapshot_id: &str) -> Result<String> {
        if SnapshotRef::parse(snapshot_id).is_none() {
            return Err(StorageError::InvalidSnapshotId(snapshot_id.to_string()).into());
        }

        let path = self.path_for(snapshot_id);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::SnapshotNotFound(snapshot_id.to_string()).into());
            }
            Err(error) => return Err(StorageError::io(&path, error).into()),
        };

        Ok(self.codec.open(raw)?)
    }

    /// Delete every snapshot last modified more than `max_age` ago.
    ///
    /// Best-effort: per-file failures are logged and counted, never returned.
    pub fn cleanup(&self, max_age: Duration) -> CleanupReport {
        let mut report = CleanupReport::default();
        let now = SystemTime::now();
        let cutoff = now.checked_sub(max_age).unwrap_or(SystemTime::UNIX_EPOCH);
        let temp_cutoff = now
            .checked_sub(max_age.max(TEMP_GRACE))
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return report,
            Err(error) => {
                tracing::error!(dir = %self.dir.display(), %error, "snapshot cleanup could not list directory");
                return report;
            }
        };

        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(error) => {
                    tracing::warn!(%error, "skipping unreadable snapshot entry");
                    report.failed += 1;
                    continue;
                }
            };
            report.scanned += 1;

            let modified = match fs::metadata(&path).and_then(|meta| {
                if meta.is_dir() {
                    Ok(None)
                } else {
                    meta.modified().map(Some)
                }
            }) {
                Ok(Some(modified)) => modified,
                Ok(None) => continue,
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "failed to stat snapshot");
                    report.failed += 1;
                    continue;
                }
            };

            let limit = if is_temp_file(&path) { temp_cutoff } else { cutoff };
            if modified >= limit {
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => {
                    report.removed += 1;
                    tracing::info!(path = %path.display(), "removed expired snapshot");
                }
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
                Err(error) => {
                    report.failed += 1;
                    tracing::warn!(path = %path.display(), %error, "failed to remove expired snapshot");
                }
            }
        }

        report
    }

    /// Delete every snapshot belonging to `task_id`. Returns the number removed.
    pub fn purge_task(&self, task_id: &str) -> Result<usize> {
        let token = sanitize_task_id(task_id);
        let mut removed = 0;
        for (snapshot_id, path) in self.entries()? {
            let belongs = SnapshotRef::parse(&snapshot_id).is_some_and(|r| r.token == token);
            if !belongs {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
                Err(error) => return Err(StorageError::io(&path, error).into()),
            }
        }
        Ok(removed)
    }

    /// Ids of all committed snapshots, oldest first.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut ids: Vec<(i64, String)> = self
            .entries()?
            .into_iter()
            .filter_map(|(id, _)| SnapshotRef::parse(&id).map(|r| (r.created_at_ms, id)))
            .collect();
        ids.sort();
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }

    fn entries(&self) -> Result<Vec<(String, PathBuf)>> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(StorageError::io(&self.dir, error).into()),
        };

        let mut entries = Vec::new();
        for entry in read_dir {
            let path = entry.map_err(|e| StorageError::io(&self.dir, e))?.path();
            if is_temp_file(&path) {
                continue;
            }
            let is_snapshot = path
                .extension()
                .is_some_and(|ext| ext == SNAPSHOT_EXT);
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if is_snapshot {
                entries.push((stem.to_string(), path.clone()));
            }
        }
        Ok(entries)
    }

    fn path_for(&self, snapshot_id: &str) -> PathBuf {
        self.dir.join(format!("{snapshot_id}.{SNAPSHOT_EXT}"))
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
