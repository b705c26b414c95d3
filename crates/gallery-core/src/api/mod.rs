//! The `GalleryApi` facade: one handle over the catalog, the stores and the
//! optional Civitai sync.

mod builder;

pub use builder::GalleryApiBuilder;

use crate::catalog::{
    folder_of, run_query, CatalogEntry, CatalogPage, CatalogQuery, CatalogScanner,
    FilePreviewResolver,
};
use crate::civitai::{MetadataSync, SyncOptions, SyncOutcome};
use crate::config::Capabilities;
use crate::error::{GalleryError, Result};
use crate::metadata::{AssetMetadata, MetadataManager, MetadataUpdate, TagPreset, UiState};
use crate::stack::{plan_stack, select_loader, NodeSelection, StackMode, StackPlan};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Main entry point for gallery operations.
///
/// Store handles live here rather than in process-wide state; wrap the API in
/// an `Arc` to share it between request handlers.
pub struct GalleryApi {
    pub(crate) scanner: CatalogScanner,
    pub(crate) previews: FilePreviewResolver,
    pub(crate) metadata: MetadataManager,
    pub(crate) sync: Option<MetadataSync>,
    pub(crate) capabilities: Capabilities,
}

impl GalleryApi {
    pub fn builder(lora_root: impl Into<PathBuf>) -> GalleryApiBuilder {
        GalleryApiBuilder::new(lora_root)
    }

    /// API with default options over an existing LoRA root.
    pub fn new(lora_root: impl Into<PathBuf>) -> Result<Self> {
        Self::builder(lora_root).build()
    }

    pub fn lora_root(&self) -> &Path {
        self.scanner.root()
    }

    pub fn data_dir(&self) -> &Path {
        self.metadata.data_dir()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn civitai_enabled(&self) -> bool {
        self.sync.is_some()
    }

    pub fn metadata(&self) -> &MetadataManager {
        &self.metadata
    }

    // ========================================
    // Catalog
    // ========================================

    /// Current LoRA files on disk.
    pub fn scan(&self) -> Vec<CatalogEntry> {
        self.scanner.scan()
    }

    /// Scan, filter and paginate the catalog.
    ///
    /// Runs on the blocking pool since scanning and preview lookups hit the
    /// filesystem.
    pub async fn list_loras(&self, query: CatalogQuery) -> Result<CatalogPage> {
        let scanner = self.scanner.clone();
        let previews = self.previews.clone();
        let metadata = self.metadata.all_metadata()?;

        tokio::task::spawn_blocking(move || {
            let assets = scanner.scan();
            let page = run_query(&assets, &metadata, |a| folder_of(&a.name), &query, &previews);
            debug!(
                "Catalog query matched {} of {} LoRAs (page {}/{})",
                page.total_count,
                assets.len(),
                page.current_page,
                page.total_pages
            );
            page
        })
        .await
        .map_err(|e| GalleryError::Other(format!("Catalog query task failed: {}", e)))
    }

    /// Location of a preview file served for `lora_name`.
    pub fn preview_file(&self, lora_name: &str, filename: &str) -> Result<PathBuf> {
        self.previews.preview_file(lora_name, filename)
    }

    // ========================================
    // Metadata
    // ========================================

    pub fn update_metadata(&self, lora_name: &str, update: MetadataUpdate) -> Result<AssetMetadata> {
        self.metadata.update_metadata(lora_name, update)
    }

    pub fn all_tags(&self) -> Result<Vec<String>> {
        self.metadata.all_tags()
    }

    /// Pull trigger words, link and preview from Civitai.
    pub async fn refresh_metadata(&self, lora_name: &str, options: SyncOptions) -> Result<SyncOutcome> {
        let sync = self
            .sync
            .as_ref()
            .ok_or_else(|| GalleryError::FeatureDisabled("Civitai sync".to_string()))?;
        sync.refresh(&self.scanner, &self.metadata, lora_name, options).await
    }

    // ========================================
    // Per-node state
    // ========================================

    pub fn ui_state(&self, node_id: &str) -> Result<UiState> {
        self.metadata.ui_state(node_id)
    }

    pub fn merge_ui_state(&self, node_id: &str, patch: Map<String, Value>) -> Result<UiState> {
        self.metadata.merge_ui_state(node_id, patch)
    }

    pub fn selection(&self, node_id: &str) -> Result<NodeSelection> {
        self.metadata.selection(node_id)
    }

    pub fn set_selection(&self, node_id: &str, selection: NodeSelection) -> Result<()> {
        self.metadata.set_selection(node_id, selection)
    }

    pub fn selections_changed_at(&self) -> Option<SystemTime> {
        self.metadata.selections_changed_at()
    }

    pub fn presets(&self) -> Result<Vec<TagPreset>> {
        self.metadata.presets()
    }

    pub fn save_preset(&self, preset: TagPreset) -> Result<()> {
        self.metadata.save_preset(preset)
    }

    pub fn delete_preset(&self, name: &str) -> Result<bool> {
        self.metadata.delete_preset(name)
    }

    // ========================================
    // Execution
    // ========================================

    /// Loads and trigger words for a node, with the loader chosen from the
    /// startup capabilities.
    pub fn plan_stack(&self, node_id: &str, mode: StackMode, model_is_accelerated: bool) -> Result<StackPlan> {
        let selection = self.metadata.selection(node_id)?;
        let metadata = self.metadata.all_metadata()?;
        let loader = select_loader(self.capabilities, model_is_accelerated);
        Ok(plan_stack(&selection, &metadata, mode, loader))
    }
}
