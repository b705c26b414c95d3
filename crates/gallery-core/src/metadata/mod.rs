//! JSON persistence for LoRA metadata, selections, UI state and presets.

mod atomic;
mod manager;
mod records;
mod store;

pub use atomic::{atomic_read_json, atomic_write_json};
pub use manager::MetadataManager;
pub use records::{AssetMetadata, MetadataUpdate, TagPreset, UiState};
pub use store::JsonStore;
