//! Whole-file JSON persistence.
//!
//! Writers serialize into a sibling temp file, sync it, then rename it over
//! the target, so readers see either the old or the new document.

use crate::{GalleryError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Distinguishes concurrent writers within one process.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Load a JSON document.
///
/// A missing file, or one holding only whitespace, reads as `None`.
pub fn atomic_read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(GalleryError::io_with_path(e, path)),
    };
    if contents.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| GalleryError::Json {
            message: format!("{} is not valid JSON: {}", path.display(), e),
            source: Some(e),
        })
}

/// Replace `path` with the pretty-printed JSON of `data`.
///
/// With `keep_backup`, the previous document is copied to `<name>.json.bak`
/// first; a failed backup is only logged.
pub fn atomic_write_json<T: Serialize>(path: &Path, data: &T, keep_backup: bool) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| GalleryError::io_with_path(e, parent))?;
    }

    let body = serde_json::to_vec_pretty(data)?;
    let staging = staging_path(path);
    if let Err(e) = write_synced(&staging, &body) {
        let _ = fs::remove_file(&staging);
        return Err(GalleryError::io_with_path(e, &staging));
    }

    if keep_backup && path.is_file() {
        let backup = path.with_extension("json.bak");
        match fs::copy(path, &backup) {
            Ok(_) => debug!("Backed up {} to {}", path.display(), backup.display()),
            Err(e) => warn!("Could not back up {}: {}", path.display(), e),
        }
    }

    fs::rename(&staging, path).map_err(|e| {
        let _ = fs::remove_file(&staging);
        GalleryError::io_with_path(e, path)
    })?;
    debug!("Wrote {} ({} bytes)", path.display(), body.len());
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
    path.with_extension(format!("json.{}-{}.tmp", std::process::id(), seq))
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Entry {
        tags: Vec<String>,
        trigger_words: String,
    }

    #[test]
    fn test_write_then_read_map() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("meta.json");

        let mut data = HashMap::new();
        data.insert(
            "anime.safetensors".to_string(),
            Entry {
                tags: vec!["Anime".into()],
                trigger_words: "anime style".into(),
            },
        );

        atomic_write_json(&path, &data, false).unwrap();
        let read: Option<HashMap<String, Entry>> = atomic_read_json(&path).unwrap();
        assert_eq!(read, Some(data));
    }

    #[test]
    fn test_backup_holds_previous_contents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");

        atomic_write_json(&path, &vec!["first"], true).unwrap();
        atomic_write_json(&path, &vec!["second"], true).unwrap();

        let backup: Option<Vec<String>> =
            atomic_read_json(&path.with_extension("json.bak")).unwrap();
        assert_eq!(backup, Some(vec!["first".to_string()]));
    }

    #[test]
    fn test_no_staging_files_left_behind() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");
        atomic_write_json(&path, &vec![1, 2, 3], false).unwrap();

        let names: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("state.json")]);
    }

    #[test]
    fn test_missing_and_empty_files_read_as_none() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.json");
        let read: Option<Vec<String>> = atomic_read_json(&missing).unwrap();
        assert!(read.is_none());

        let empty = temp_dir.path().join("empty.json");
        fs::write(&empty, "  \n").unwrap();
        let read: Option<Vec<String>> = atomic_read_json(&empty).unwrap();
        assert!(read.is_none());
    }

    #[test]
    fn test_corrupt_file_is_json_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        let result: Result<Option<Vec<String>>> = atomic_read_json(&path);
        assert!(matches!(result, Err(GalleryError::Json { .. })));
    }

    #[test]
    fn test_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dir").join("x.json");
        atomic_write_json(&path, &42, false).unwrap();
        assert!(path.exists());
    }
}
