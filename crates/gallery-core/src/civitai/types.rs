//! Civitai API response types (only the fields the gallery reads).

use serde::{Deserialize, Serialize};

/// `GET /model-versions/by-hash/{hash}` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelVersion {
    pub id: u64,
    pub model_id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub base_model: Option<String>,
    #[serde(default)]
    pub trained_words: Vec<String>,
    #[serde(default)]
    pub images: Vec<VersionImage>,
}

/// Preview media attached to a model version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionImage {
    pub url: String,
    /// `"image"` or `"video"`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl VersionImage {
    pub fn is_video(&self) -> bool {
        self.kind.as_deref() == Some("video")
    }
}

impl ModelVersion {
    /// Trimmed, non-empty trained words joined for a prompt.
    pub fn trigger_words(&self) -> String {
        self.trained_words
            .iter()
            .map(|w| w.trim())
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Public page of this version.
    pub fn page_url(&self, site_base: &str) -> String {
        format!(
            "{}/models/{}?modelVersionId={}",
            site_base.trim_end_matches('/'),
            self.model_id,
            self.id
        )
    }
}
