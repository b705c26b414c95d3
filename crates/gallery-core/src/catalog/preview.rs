//! Preview image/video lookup for catalog entries.

use crate::catalog::scanner::CatalogScanner;
use crate::config::{GalleryConfig, PreviewConfig};
use crate::{GalleryError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Kind of preview attached to a LoRA.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewKind {
    Image,
    Video,
    #[default]
    None,
}

impl PreviewKind {
    /// Classify a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.to_lowercase();
        if PreviewConfig::IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            PreviewKind::Image
        } else if PreviewConfig::VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            PreviewKind::Video
        } else {
            PreviewKind::None
        }
    }
}

/// Preview descriptor returned alongside each catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    pub url: String,
    pub kind: PreviewKind,
}

impl Preview {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Resolves the preview for a catalog name.
pub trait PreviewResolver {
    fn resolve(&self, lora_name: &str) -> Preview;
}

impl<F> PreviewResolver for F
where
    F: Fn(&str) -> Preview,
{
    fn resolve(&self, lora_name: &str) -> Preview {
        self(lora_name)
    }
}

/// Finds `<stem>.<ext>` files next to each LoRA on disk.
#[derive(Debug, Clone)]
pub struct FilePreviewResolver {
    scanner: CatalogScanner,
}

impl FilePreviewResolver {
    pub fn new(scanner: CatalogScanner) -> Self {
        Self { scanner }
    }

    /// First existing preview file for the LoRA at `lora_path`, images before
    /// videos.
    pub fn find_preview_file(lora_path: &Path) -> Option<PathBuf> {
        PreviewConfig::IMAGE_EXTENSIONS
            .iter()
            .chain(PreviewConfig::VIDEO_EXTENSIONS.iter())
            .map(|ext| lora_path.with_extension(ext))
            .find(|candidate| candidate.is_file())
    }

    /// Path of `filename` inside the LoRA's directory.
    ///
    /// `filename` must be a bare file name.
    pub fn preview_file(&self, lora_name: &str, filename: &str) -> Result<PathBuf> {
        if filename.is_empty()
            || filename.contains("..")
            || filename.contains('/')
            || filename.contains('\\')
        {
            return Err(GalleryError::Forbidden(format!(
                "invalid preview filename: {}",
                filename
            )));
        }

        let lora_path = self.scanner.resolve(lora_name).map_err(|e| match e {
            GalleryError::InvalidArgument { message, .. } => GalleryError::Forbidden(message),
            other => other,
        })?;
        let dir = lora_path.parent().unwrap_or(self.scanner.root());
        let path = dir.join(filename);
        if !path.is_file() {
            return Err(GalleryError::AssetNotFound {
                name: format!("{} (preview {})", lora_name, filename),
            });
        }
        Ok(path)
    }
}

impl PreviewResolver for FilePreviewResolver {
    fn resolve(&self, lora_name: &str) -> Preview {
        let Ok(lora_path) = self.scanner.resolve(lora_name) else {
            return Preview::none();
        };
        let Some(preview_path) = Self::find_preview_file(&lora_path) else {
            return Preview::none();
        };
        let (Some(filename), Some(ext)) = (
            preview_path.file_name().and_then(|f| f.to_str()),
            preview_path.extension().and_then(|e| e.to_str()),
        ) else {
            return Preview::none();
        };

        Preview {
            url: preview_url(lora_name, filename),
            kind: PreviewKind::from_extension(ext),
        }
    }
}

/// URL under which the server exposes a preview file.
pub fn preview_url(lora_name: &str, filename: &str) -> String {
    format!(
        "{}/preview?filename={}&lora_name={}",
        GalleryConfig::ROUTE_PREFIX,
        urlencoding::encode(filename),
        urlencoding::encode(lora_name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup(files: &[&str]) -> (TempDir, FilePreviewResolver) {
        let temp_dir = TempDir::new().unwrap();
        for rel in files {
            let path = temp_dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, b"x").unwrap();
        }
        let resolver = FilePreviewResolver::new(CatalogScanner::new(temp_dir.path()));
        (temp_dir, resolver)
    }

    #[test]
    fn test_images_win_over_videos() {
        let (_dir, resolver) = setup(&[
            "sub/My Lora.safetensors",
            "sub/My Lora.mp4",
            "sub/My Lora.webp",
        ]);
        let preview = resolver.resolve("sub/My Lora.safetensors");
        assert_eq!(preview.kind, PreviewKind::Image);
        assert_eq!(
            preview.url,
            "/localloragallery/preview?filename=My%20Lora.webp&lora_name=sub%2FMy%20Lora.safetensors"
        );
    }

    #[test]
    fn test_video_preview() {
        let (_dir, resolver) = setup(&["a.safetensors", "a.webm"]);
        assert_eq!(resolver.resolve("a.safetensors").kind, PreviewKind::Video);
    }

    #[test]
    fn test_no_preview() {
        let (_dir, resolver) = setup(&["a.safetensors"]);
        assert_eq!(resolver.resolve("a.safetensors"), Preview::none());
        assert_eq!(resolver.resolve("missing.safetensors"), Preview::none());
    }

    #[test]
    fn test_preview_file_guards() {
        let (_dir, resolver) = setup(&["sub/a.safetensors", "sub/a.png"]);
        assert!(resolver.preview_file("sub/a.safetensors", "a.png").is_ok());
        assert!(matches!(
            resolver.preview_file("sub/a.safetensors", "../a.png"),
            Err(GalleryError::Forbidden(_))
        ));
        assert!(matches!(
            resolver.preview_file("sub/a.safetensors", "x\\a.png"),
            Err(GalleryError::Forbidden(_))
        ));
        assert!(matches!(
            resolver.preview_file("../sub/a.safetensors", "a.png"),
            Err(GalleryError::Forbidden(_))
        ));
        assert!(matches!(
            resolver.preview_file("sub/a.safetensors", "b.png"),
            Err(GalleryError::AssetNotFound { .. })
        ));
    }
}
