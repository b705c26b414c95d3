//! Metadata manager for the gallery's JSON side-files.
//!
//! Owns one store per file under the data directory:
//! - `lora_gallery_metadata.json` (per-LoRA tags, trigger words, links)
//! - `lora_gallery_selections.json` (per-node LoRA stacks)
//! - `lora_gallery_ui_state.json` (per-node widget state)
//! - `lora_gallery_presets.json` (named tag filters)

use crate::catalog::collect_tags;
use crate::config::GalleryConfig;
use crate::metadata::records::{AssetMetadata, MetadataUpdate, TagPreset, UiState};
use crate::metadata::store::JsonStore;
use crate::stack::NodeSelection;
use crate::{GalleryError, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Manager for all gallery metadata files.
#[derive(Debug)]
pub struct MetadataManager {
    data_dir: PathBuf,
    metadata: JsonStore<AssetMetadata>,
    selections: JsonStore<NodeSelection>,
    ui_states: JsonStore<UiState>,
    presets: JsonStore<TagPreset>,
}

impl MetadataManager {
    /// Open (or lazily create) the stores under `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            metadata: JsonStore::open(data_dir.join(GalleryConfig::METADATA_FILE)),
            selections: JsonStore::open(data_dir.join(GalleryConfig::SELECTIONS_FILE)),
            ui_states: JsonStore::open(data_dir.join(GalleryConfig::UI_STATE_FILE)),
            presets: JsonStore::open(data_dir.join(GalleryConfig::PRESETS_FILE)),
            data_dir,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    // ========================================
    // LoRA metadata
    // ========================================

    pub fn metadata_store(&self) -> &JsonStore<AssetMetadata> {
        &self.metadata
    }

    /// Snapshot of every LoRA's metadata, keyed by name.
    pub fn all_metadata(&self) -> Result<HashMap<String, AssetMetadata>> {
        self.metadata.snapshot()
    }

    /// Metadata for one LoRA; absent entries read as empty.
    pub fn metadata_for(&self, lora_name: &str) -> Result<AssetMetadata> {
        Ok(self.metadata.get(lora_name)?.unwrap_or_default())
    }

    /// Apply a partial edit and return the stored result.
    pub fn update_metadata(&self, lora_name: &str, update: MetadataUpdate) -> Result<AssetMetadata> {
        require_key("lora_name", lora_name)?;
        debug!("Updating metadata for {}", lora_name);
        self.metadata.update(lora_name, |meta| {
            update.apply_to(meta);
            meta.clone()
        })
    }

    /// Every distinct tag, sorted case-insensitively.
    pub fn all_tags(&self) -> Result<Vec<String>> {
        let snapshot = self.metadata.snapshot()?;
        Ok(collect_tags(snapshot.values()))
    }

    // ========================================
    // UI state
    // ========================================

    pub fn ui_state(&self, node_id: &str) -> Result<UiState> {
        require_key("node_id", node_id)?;
        Ok(self.ui_states.get(node_id)?.unwrap_or_else(UiState::initial))
    }

    /// Merge `patch` into the node's stored state.
    pub fn merge_ui_state(&self, node_id: &str, patch: Map<String, Value>) -> Result<UiState> {
        require_key("node_id", node_id)?;
        self.ui_states.update(node_id, |state| {
            state.merge(patch);
            state.clone()
        })
    }

    // ========================================
    // Selections
    // ========================================

    pub fn selection(&self, node_id: &str) -> Result<NodeSelection> {
        require_key("node_id", node_id)?;
        Ok(self.selections.get(node_id)?.unwrap_or_default())
    }

    pub fn set_selection(&self, node_id: &str, selection: NodeSelection) -> Result<()> {
        require_key("node_id", node_id)?;
        debug!(
            "Saving selection for node {} ({} entries)",
            node_id,
            selection.stack.len()
        );
        self.selections.upsert(node_id, selection)
    }

    /// Modification time of the selections file; the host re-runs a node
    /// when this changes.
    pub fn selections_changed_at(&self) -> Option<SystemTime> {
        self.selections.modified_at()
    }

    // ========================================
    // Tag filter presets
    // ========================================

    pub fn presets(&self) -> Result<Vec<TagPreset>> {
        let mut presets: Vec<TagPreset> = self.presets.snapshot()?.into_values().collect();
        presets.sort_by_key(|p| p.name.to_lowercase());
        Ok(presets)
    }

    pub fn save_preset(&self, preset: TagPreset) -> Result<()> {
        let name = preset.name.trim().to_string();
        require_key("name", &name)?;
        let preset = TagPreset {
            name: name.clone(),
            tags: preset
                .tags
                .into_iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            mode: preset.mode,
        };
        self.presets.upsert(name, preset)
    }

    /// Returns whether a preset with that name existed.
    pub fn delete_preset(&self, name: &str) -> Result<bool> {
        Ok(self.presets.remove(name.trim())?.is_some())
    }
}

fn require_key(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(GalleryError::invalid(field, format!("{} is required", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FilterMode;
    use crate::stack::StackEntry;
    use serde_json::json;
    use tempfile::TempDir;

    fn manager() -> (TempDir, MetadataManager) {
        let temp_dir = TempDir::new().unwrap();
        let manager = MetadataManager::new(temp_dir.path());
        (temp_dir, manager)
    }

    #[test]
    fn test_all_tags_sorted_case_insensitively() {
        let (_dir, manager) = manager();
        manager
            .update_metadata(
                "a.safetensors",
                MetadataUpdate {
                    tags: Some(vec!["style".into(), "Anime".into()]),
                    ..Default::default()
                },
            )
            .unwrap();
        manager
            .update_metadata(
                "b.safetensors",
                MetadataUpdate {
                    tags: Some(vec!["anime".into(), "Character".into()]),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(
            manager.all_tags().unwrap(),
            vec!["Anime", "anime", "Character", "style"]
        );
    }

    #[test]
    fn test_missing_ui_state_reports_expanded() {
        let (_dir, manager) = manager();
        let state = manager.ui_state("7").unwrap();
        assert_eq!(serde_json::to_value(state).unwrap(), json!({"is_collapsed": false}));
    }

    #[test]
    fn test_ui_state_requires_node_id() {
        let (_dir, manager) = manager();
        assert!(matches!(
            manager.ui_state(" "),
            Err(GalleryError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_selection_round_trips_through_disk() {
        let (dir, manager) = manager();
        let selection = NodeSelection::new(vec![StackEntry::new("a.safetensors", 0.8)]);
        manager.set_selection("12", selection.clone()).unwrap();
        assert!(manager.selections_changed_at().is_some());

        let reopened = MetadataManager::new(dir.path());
        assert_eq!(reopened.selection("12").unwrap(), selection);
        assert!(reopened.selection("13").unwrap().stack.is_empty());
    }

    #[test]
    fn test_presets_normalized_and_sorted() {
        let (_dir, manager) = manager();
        manager
            .save_preset(TagPreset {
                name: " zeta ".into(),
                tags: vec!["Anime".into(), " ".into()],
                mode: FilterMode::All,
            })
            .unwrap();
        manager
            .save_preset(TagPreset {
                name: "Alpha".into(),
                tags: vec![],
                mode: FilterMode::Any,
            })
            .unwrap();

        let presets = manager.presets().unwrap();
        let names: Vec<&str> = presets.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "zeta"]);
        assert_eq!(presets[1].tags, vec!["anime"]);

        assert!(manager.delete_preset("zeta").unwrap());
        assert!(!manager.delete_preset("zeta").unwrap());
    }
}
