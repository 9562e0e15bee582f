use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::StorageError;

/// Writes `payload` as pretty-printed JSON to `dir/file_name`.
pub fn write_export<T: Serialize + ?Sized>(
    dir: &Path,
    file_name: &str,
    payload: &T,
) -> Result<PathBuf, StorageError> {
    let path = dir.join(file_name);
    let raw = serde_json::to_string_pretty(payload).map_err(|source| StorageError::Serialize {
        key: file_name.to_string(),
        source,
    })?;
    fs::write(&path, raw).map_err(|source| StorageError::Write {
        path: path.display().to_string(),
        source,
    })?;
    Ok(path)
}

pub fn read_import(path: &Path) -> Result<String, StorageError> {
    let bytes = fs::read(path).map_err(|source| StorageError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
