//! Refresh a LoRA's metadata from Civitai by content hash.

use super::client::{original_media_url, CivitaiClient};
use super::types::{ModelVersion, VersionImage};
use crate::catalog::{CatalogScanner, FilePreviewResolver, PreviewKind};
use crate::config::NetworkConfig;
use crate::error::Result;
use crate::hashing::ensure_content_hash;
use crate::metadata::{AssetMetadata, MetadataManager};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Options for a metadata refresh.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SyncOptions {
    /// Replace a download URL the user already set.
    #[serde(default)]
    pub overwrite: bool,
    /// Skip fetching a preview image.
    #[serde(default)]
    pub skip_preview: bool,
}

/// What a refresh changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub name: String,
    pub content_hash: String,
    /// Civitai knows this hash.
    pub found: bool,
    pub trigger_words: String,
    pub download_url: String,
    /// File name of a newly downloaded preview.
    pub preview_saved: Option<String>,
}

/// Merge a Civitai model version into stored metadata.
///
/// Trigger words are replaced only when Civitai has some. The download URL
/// is filled when empty, or always with `overwrite`.
pub fn apply_version(meta: &mut AssetMetadata, version: &ModelVersion, overwrite: bool) {
    let words = version.trigger_words();
    if !words.is_empty() {
        meta.trigger_words = words;
    }
    if overwrite || meta.download_url.trim().is_empty() {
        meta.download_url = version.page_url(NetworkConfig::CIVITAI_SITE_BASE);
    }
    meta.civitai_model_id = Some(version.model_id);
    meta.civitai_version_id = Some(version.id);
    meta.synced_at = Some(chrono::Utc::now().to_rfc3339());
}

/// File extension for a downloaded preview: the URL's own extension when it
/// is a known media type, else by media kind.
pub fn preview_extension(image: &VersionImage) -> String {
    let from_url = url::Url::parse(&image.url).ok().and_then(|u| {
        let last = u.path_segments()?.next_back()?.to_string();
        let (_, ext) = last.rsplit_once('.')?;
        Some(ext.to_lowercase())
    });

    match from_url {
        Some(ext) if PreviewKind::from_extension(&ext) != PreviewKind::None => ext,
        _ if image.is_video() => "mp4".to_string(),
        _ => "png".to_string(),
    }
}

/// Runs refreshes against one Civitai client.
#[derive(Debug, Clone)]
pub struct MetadataSync {
    client: CivitaiClient,
}

impl MetadataSync {
    pub fn new(client: CivitaiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &CivitaiClient {
        &self.client
    }

    /// Hash the LoRA (or reuse the cached hash), look it up and write the
    /// result through the metadata store.
    pub async fn refresh(
        &self,
        scanner: &CatalogScanner,
        metadata: &MetadataManager,
        lora_name: &str,
        options: SyncOptions,
    ) -> Result<SyncOutcome> {
        let lora_path = scanner.resolve(lora_name)?;
        let content_hash = ensure_content_hash(metadata.metadata_store(), lora_name, &lora_path).await?;

        let Some(version) = self.client.model_version_by_hash(&content_hash).await? else {
            info!("Civitai has no model version for {} ({})", lora_name, content_hash);
            let meta = metadata.metadata_for(lora_name)?;
            return Ok(SyncOutcome {
                name: lora_name.to_string(),
                content_hash,
                found: false,
                trigger_words: meta.trigger_words,
                download_url: meta.download_url,
                preview_saved: None,
            });
        };

        let meta = metadata.metadata_store().update(lora_name, |meta| {
            apply_version(meta, &version, options.overwrite);
            meta.clone()
        })?;

        let preview_saved = if options.skip_preview {
            None
        } else {
            self.save_preview(&lora_path, &version).await
        };

        info!("Refreshed {} from Civitai model {}", lora_name, version.model_id);
        Ok(SyncOutcome {
            name: lora_name.to_string(),
            content_hash,
            found: true,
            trigger_words: meta.trigger_words,
            download_url: meta.download_url,
            preview_saved,
        })
    }

    /// Download the first preview unless one already exists. Failures are
    /// logged; the metadata refresh still counts.
    async fn save_preview(&self, lora_path: &Path, version: &ModelVersion) -> Option<String> {
        if FilePreviewResolver::find_preview_file(lora_path).is_some() {
            return None;
        }
        let image = version.images.first()?;
        let dest: PathBuf = lora_path.with_extension(preview_extension(image));

        match self.client.download_to(&original_media_url(&image.url), &dest).await {
            Ok(_) => dest.file_name().and_then(|f| f.to_str()).map(String::from),
            Err(e) => {
                warn!("Failed to download preview for {}: {}", lora_path.display(), e);
                None
            }
        }
    }
}
