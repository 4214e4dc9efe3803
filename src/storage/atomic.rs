use crate::error::StorageError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Suffix of in-flight writes; readers and listings skip these files.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Write `content` to `path` so that readers see either the old file or the new one.
///
/// The bytes land in a uniquely named sibling temp file, are synced, and are then
/// renamed over the target.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<(), StorageError> {
    let parent = path
        .parent()
        .ok_or_else(|| StorageError::io(path, std::io::ErrorKind::InvalidInput.into()))?;
    fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;

    let temp_path = temp_path_for(path);
    let written = fs::File::create(&temp_path).and_then(|mut file| {
        file.write_all(content)?;
        file.sync_all()
    });
    if let Err(error) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(StorageError::io(&temp_path, error));
    }

    if let Err(rename_error) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(StorageError::io(path, rename_error));
    }

    Ok(())
}

pub fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(TEMP_SUFFIX))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let unique = uuid::Uuid::new_v4().simple().to_string();
    path.with_file_name(format!(".{file_name}.{unique}{TEMP_SUFFIX}"))
}
