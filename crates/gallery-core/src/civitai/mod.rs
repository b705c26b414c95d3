//! Optional metadata sync with Civitai.
//!
//! Looks a LoRA up by SHA-256, then stores its trigger words and page link
//! and saves a preview next to the file.

mod client;
mod sync;
mod types;

pub use client::{original_media_url, CivitaiClient};
pub use sync::{apply_version, preview_extension, MetadataSync, SyncOptions, SyncOutcome};
pub use types::{ModelVersion, VersionImage};
