//! Discovery of LoRA files under the catalog root.

use crate::config::GalleryConfig;
use crate::{GalleryError, Result};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Folder name used for files directly under the catalog root.
pub const ROOT_FOLDER: &str = ".";

/// One LoRA file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Path relative to the catalog root, `/`-separated. Unique per scan.
    pub name: String,
    /// Absolute path of the file.
    pub path: PathBuf,
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Folder of this entry relative to the catalog root.
    pub fn folder(&self) -> String {
        folder_of(&self.name)
    }
}

/// Folder of a catalog name: everything before the last `/`, or `"."`.
pub fn folder_of(name: &str) -> String {
    match name.rsplit_once('/') {
        Some((dir, _)) if !dir.is_empty() => dir.to_string(),
        _ => ROOT_FOLDER.to_string(),
    }
}

/// Walks the catalog root for files with a LoRA extension.
#[derive(Debug, Clone)]
pub struct CatalogScanner {
    root: PathBuf,
}

impl CatalogScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan the root recursively. Hidden files and directories are skipped.
    ///
    /// Entries are sorted by name. A missing root is an empty catalog.
    pub fn scan(&self) -> Vec<CatalogEntry> {
        if !self.root.is_dir() {
            warn!("LoRA root {} is not a directory", self.root.display());
            return Vec::new();
        }

        let mut entries: Vec<CatalogEntry> = WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!("Skipping unreadable catalog entry: {}", err);
                    None
                }
            })
            .filter(|e| e.file_type().is_file() && has_lora_extension(e.path()))
            .filter_map(|e| {
                let name = relative_name(&self.root, e.path())?;
                Some(CatalogEntry::new(name, e.into_path()))
            })
            .collect();

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        debug!("Scanned {} LoRA files under {}", entries.len(), self.root.display());
        entries
    }

    /// Absolute path of a catalog name.
    ///
    /// Names that are absolute or climb out of the root are rejected.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        if name.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(GalleryError::invalid(
                "lora_name",
                format!("not a catalog-relative name: {}", name),
            ));
        }

        let path = self.root.join(relative);
        if !path.is_file() {
            return Err(GalleryError::AssetNotFound {
                name: name.to_string(),
            });
        }
        Ok(path)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

fn has_lora_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_lowercase();
            GalleryConfig::LORA_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"weights").unwrap();
    }

    #[test]
    fn test_folder_of() {
        assert_eq!(folder_of("a.safetensors"), ".");
        assert_eq!(folder_of("sub/a.safetensors"), "sub");
        assert_eq!(folder_of("sub/deeper/a.safetensors"), "sub/deeper");
    }

    #[test]
    fn test_scan_filters_extensions_and_hidden() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, "b.safetensors");
        touch(root, "A.CKPT");
        touch(root, "sub/c.pt");
        touch(root, "sub/c.png");
        touch(root, "notes.txt");
        touch(root, ".hidden/d.safetensors");
        touch(root, ".e.safetensors");

        let entries = CatalogScanner::new(root).scan();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["A.CKPT", "b.safetensors", "sub/c.pt"]);
        assert_eq!(entries[2].folder(), "sub");
        assert!(entries[2].path.ends_with("sub/c.pt"));
    }

    #[test]
    fn test_scan_missing_root_is_empty() {
        let scanner = CatalogScanner::new("/definitely/not/a/lora/root");
        assert!(scanner.scan().is_empty());
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "sub/a.safetensors");
        let scanner = CatalogScanner::new(temp_dir.path());

        assert!(scanner.resolve("sub/a.safetensors").is_ok());
        assert!(matches!(
            scanner.resolve("../secret.safetensors"),
            Err(GalleryError::InvalidArgument { .. })
        ));
        assert!(matches!(
            scanner.resolve("/etc/passwd"),
            Err(GalleryError::InvalidArgument { .. })
        ));
        assert!(matches!(
            scanner.resolve("missing.safetensors"),
            Err(GalleryError::AssetNotFound { .. })
        ));
    }
}
