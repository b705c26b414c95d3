//! Centralized configuration for the LoRA gallery.
//!
//! Constants for file names, recognized extensions and network behavior,
//! plus the [`Capabilities`] resolved once at startup.

use std::time::Duration;

/// Application-level configuration.
pub struct GalleryConfig;

impl GalleryConfig {
    pub const APP_NAME: &'static str = "Local Lora Gallery";
    pub const DATA_DIR_NAME: &'static str = "lora-gallery";
    pub const METADATA_FILE: &'static str = "lora_gallery_metadata.json";
    pub const SELECTIONS_FILE: &'static str = "lora_gallery_selections.json";
    pub const UI_STATE_FILE: &'static str = "lora_gallery_ui_state.json";
    pub const PRESETS_FILE: &'static str = "lora_gallery_presets.json";

    /// Extensions the host accepts as LoRA weights.
    pub const LORA_EXTENSIONS: &'static [&'static str] =
        &["safetensors", "ckpt", "pt", "pt2", "pth", "bin", "pkl", "sft"];

    pub const DEFAULT_PAGE_SIZE: usize = 50;

    /// Route prefix shared by every endpoint.
    pub const ROUTE_PREFIX: &'static str = "/localloragallery";
}

/// Preview asset lookup.
pub struct PreviewConfig;

impl PreviewConfig {
    /// Checked in order before any video extension.
    pub const IMAGE_EXTENSIONS: &'static [&'static str] = &["png", "jpg", "jpeg", "webp", "gif"];
    pub const VIDEO_EXTENSIONS: &'static [&'static str] = &["mp4", "webm", "mov", "avi"];
}

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
    pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);
    pub const CIVITAI_API_BASE: &'static str = "https://civitai.com/api/v1";
    pub const CIVITAI_SITE_BASE: &'static str = "https://civitai.com";
    pub const USER_AGENT: &'static str = "lora-gallery/0.3";
}

/// Host capabilities resolved once at startup.
///
/// Replaces querying the host's node registry at execution time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// The accelerated (quantized Flux) LoRA loader is installed.
    pub accelerated_loader: bool,
}
