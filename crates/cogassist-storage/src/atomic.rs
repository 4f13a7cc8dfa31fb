//! Atomic JSON file persistence: every mutation writes to `<path>.tmp` then
//! renames over the target, so a crash mid-write never corrupts it. Mirrors
//! the reference agent's patch-file write path.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{StorageError, StorageResult};

/// Serialize `value` to pretty JSON and write it atomically to `path`.
/// Creates the parent directory if it doesn't exist yet.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| StorageError::Io(format!("create_dir_all '{}': {e}", parent.display())))?;
    }

    let tmp_path = path.with_extension(append_tmp_extension(path));
    let body = serde_json::to_vec_pretty(value)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;

    if let Err(e) = std::fs::write(&tmp_path, &body) {
        return Err(StorageError::Io(format!(
            "write temp file '{}': {e}",
            tmp_path.display()
        )));
    }
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(StorageError::Io(format!(
            "rename '{}' to '{}': {e}",
            tmp_path.display(),
            path.display()
        )));
    }
    Ok(())
}

fn append_tmp_extension(path: &Path) -> String {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{ext}.tmp"),
        None => "tmp".to_string(),
    }
}

/// Read and deserialize `path`. `Ok(None)` if the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> StorageResult<Option<T>> {
    match std::fs::read(path) {
        Ok(bytes) => {
            let value = serde_json::from_slice(&bytes)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::Io(format!("read '{}': {e}", path.display()))),
    }
}

/// Remove `path` if it exists; missing is not an error.
pub fn remove_if_exists(path: &Path) -> StorageResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StorageError::Io(format!("remove '{}': {e}", path.display()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        let value = Sample {
            name: "x".into(),
            count: 3,
        };
        write_json_atomic(&path, &value).unwrap();
        let restored: Sample = read_json(&path).unwrap().unwrap();
        assert_eq!(restored, value);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn read_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let restored: Option<Sample> = read_json(&path).unwrap();
        assert!(restored.is_none());
    }

    #[test]
    fn write_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        write_json_atomic(&path, &Sample { name: "a".into(), count: 1 }).unwrap();
        write_json_atomic(&path, &Sample { name: "b".into(), count: 2 }).unwrap();
        let restored: Sample = read_json(&path).unwrap().unwrap();
        assert_eq!(restored.name, "b");
    }
}
