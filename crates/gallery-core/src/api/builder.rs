//! Builder for configuring GalleryApi initialization.

use crate::catalog::{CatalogScanner, FilePreviewResolver};
use crate::civitai::{CivitaiClient, MetadataSync};
use crate::config::Capabilities;
use crate::error::{GalleryError, Result};
use crate::metadata::MetadataManager;
use crate::GalleryApi;
use std::path::PathBuf;
use tracing::info;

/// Directory under the LoRA root used when no data directory is given.
/// Hidden, so the scanner never descends into it.
const DEFAULT_DATA_SUBDIR: &str = ".lora-gallery";

/// Builder for [`GalleryApi`].
///
/// # Example
///
/// ```rust,ignore
/// let api = GalleryApi::builder("/models/loras")
///     .data_dir("/var/lib/lora-gallery")
///     .with_civitai(false)
///     .build()?;
/// ```
pub struct GalleryApiBuilder {
    lora_root: PathBuf,
    data_dir: Option<PathBuf>,
    auto_create_dirs: bool,
    enable_civitai: bool,
    civitai_base_url: Option<String>,
    capabilities: Capabilities,
}

impl GalleryApiBuilder {
    pub fn new(lora_root: impl Into<PathBuf>) -> Self {
        Self {
            lora_root: lora_root.into(),
            data_dir: None,
            auto_create_dirs: false,
            enable_civitai: true,
            civitai_base_url: None,
            capabilities: Capabilities::default(),
        }
    }

    /// Where the JSON side-files live.
    ///
    /// Default: `<lora_root>/.lora-gallery`
    pub fn data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    /// Create the LoRA root and data directory if missing.
    ///
    /// Default: `false` (the LoRA root must exist)
    pub fn auto_create_dirs(mut self, enable: bool) -> Self {
        self.auto_create_dirs = enable;
        self
    }

    /// Enable or disable the Civitai metadata sync.
    ///
    /// Default: `true`
    pub fn with_civitai(mut self, enable: bool) -> Self {
        self.enable_civitai = enable;
        self
    }

    /// Point the Civitai client at another API root.
    pub fn civitai_base_url(mut self, url: impl Into<String>) -> Self {
        self.civitai_base_url = Some(url.into());
        self
    }

    /// Declare the accelerated LoRA loader as installed.
    ///
    /// Default: `false`
    pub fn accelerated_loader(mut self, available: bool) -> Self {
        self.capabilities.accelerated_loader = available;
        self
    }

    pub fn build(self) -> Result<GalleryApi> {
        if !self.lora_root.exists() {
            if !self.auto_create_dirs {
                return Err(GalleryError::Config {
                    message: format!("LoRA root does not exist: {}", self.lora_root.display()),
                });
            }
            std::fs::create_dir_all(&self.lora_root)
                .map_err(|e| GalleryError::io_with_path(e, &self.lora_root))?;
        } else if !self.lora_root.is_dir() {
            return Err(GalleryError::Config {
                message: format!("LoRA root is not a directory: {}", self.lora_root.display()),
            });
        }

        let data_dir = self
            .data_dir
            .unwrap_or_else(|| self.lora_root.join(DEFAULT_DATA_SUBDIR));
        if self.auto_create_dirs && !data_dir.exists() {
            std::fs::create_dir_all(&data_dir).map_err(|e| GalleryError::io_with_path(e, &data_dir))?;
        }

        let sync = if self.enable_civitai {
            let client = match self.civitai_base_url {
                Some(url) => CivitaiClient::with_base_url(url)?,
                None => CivitaiClient::new()?,
            };
            Some(MetadataSync::new(client))
        } else {
            None
        };

        info!(
            "Gallery ready: root={}, data={}, civitai={}, accelerated_loader={}",
            self.lora_root.display(),
            data_dir.display(),
            sync.is_some(),
            self.capabilities.accelerated_loader
        );

        let scanner = CatalogScanner::new(self.lora_root);
        Ok(GalleryApi {
            previews: FilePreviewResolver::new(scanner.clone()),
            scanner,
            metadata: MetadataManager::new(data_dir),
            sync,
            capabilities: self.capabilities,
        })
    }
}
