//! Record types persisted in the gallery's JSON side-files.

use crate::catalog::FilterMode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User and remote metadata for one LoRA, keyed by its catalog name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetMetadata {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub trigger_words: String,
    #[serde(default)]
    pub download_url: String,
    /// Lowercase SHA-256 of the file contents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub civitai_model_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub civitai_version_id: Option<u64>,
    /// RFC 3339 timestamp of the last successful remote sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<String>,
}

impl AssetMetadata {
    /// Tags lowercased for case-insensitive comparison.
    pub fn normalized_tags(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.to_lowercase()).collect()
    }
}

/// Partial edit of an [`AssetMetadata`]. Present fields replace stored ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataUpdate {
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub trigger_words: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

impl MetadataUpdate {
    /// Apply the edit. Tags are trimmed and blank tags dropped.
    pub fn apply_to(self, meta: &mut AssetMetadata) {
        if let Some(tags) = self.tags {
            meta.tags = tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
        }
        if let Some(trigger_words) = self.trigger_words {
            meta.trigger_words = trigger_words;
        }
        if let Some(download_url) = self.download_url {
            meta.download_url = download_url;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_none() && self.trigger_words.is_none() && self.download_url.is_none()
    }
}

/// Free-form per-node UI state (collapsed flag, filter text, page, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UiState(pub Map<String, Value>);

impl UiState {
    /// State reported for nodes that never saved anything.
    pub fn initial() -> Self {
        let mut map = Map::new();
        map.insert("is_collapsed".to_string(), Value::Bool(false));
        UiState(map)
    }

    /// Shallow merge: keys in `patch` overwrite existing keys.
    pub fn merge(&mut self, patch: Map<String, Value>) {
        for (key, value) in patch {
            self.0.insert(key, value);
        }
    }
}

/// A saved tag filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagPreset {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub mode: FilterMode,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_replaces_only_present_fields() {
        let mut meta = AssetMetadata {
            tags: vec!["old".into()],
            trigger_words: "keep me".into(),
            download_url: "https://example.com".into(),
            ..Default::default()
        };

        MetadataUpdate {
            tags: Some(vec![" Anime ".into(), "".into(), "  ".into(), "style".into()]),
            ..Default::default()
        }
        .apply_to(&mut meta);

        assert_eq!(meta.tags, vec!["Anime", "style"]);
        assert_eq!(meta.trigger_words, "keep me");
        assert_eq!(meta.download_url, "https://example.com");
    }

    #[test]
    fn test_metadata_tolerates_legacy_entries() {
        let meta: AssetMetadata = serde_json::from_value(json!({
            "tags": ["Anime"],
            "unknown_field": 3
        }))
        .unwrap();
        assert_eq!(meta.tags, vec!["Anime"]);
        assert!(meta.trigger_words.is_empty());
        assert!(meta.content_hash.is_none());
        assert_eq!(meta.normalized_tags(), vec!["anime"]);
    }

    #[test]
    fn test_ui_state_merge_is_shallow() {
        let mut state = UiState::initial();
        let patch = json!({"is_collapsed": true, "filter": "anime"});
        state.merge(patch.as_object().unwrap().clone());
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({"is_collapsed": true, "filter": "anime"})
        );
    }
}
