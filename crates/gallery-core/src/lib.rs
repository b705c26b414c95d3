//! Local Lora Gallery - headless catalog, metadata and stack planning for a
//! folder of LoRA files.
//!
//! This crate holds everything the gallery node needs apart from the HTTP
//! surface: the catalog scan and query engine, the JSON side-file stores,
//! the optional Civitai sync and the per-node stack planner. The
//! `lora-gallery-server` crate exposes it over HTTP.
//!
//! # Example
//!
//! ```rust,ignore
//! use lora_gallery::{CatalogQuery, GalleryApi, PageRequest};
//!
//! #[tokio::main]
//! async fn main() -> lora_gallery::Result<()> {
//!     let api = GalleryApi::builder("/models/loras")
//!         .with_civitai(false)
//!         .build()?;
//!
//!     let page = api
//!         .list_loras(CatalogQuery::new(PageRequest::new(1, 50)?))
//!         .await?;
//!     println!("{} LoRAs in {} folders", page.total_count, page.folders.len());
//!
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod civitai;
pub mod config;
pub mod error;
pub mod hashing;
pub mod metadata;
pub mod stack;

mod api;

// Re-export commonly used types
pub use api::{GalleryApi, GalleryApiBuilder};
pub use catalog::{
    CatalogEntry, CatalogItem, CatalogPage, CatalogQuery, CatalogScanner, FilterMode,
    PageRequest, Preview, PreviewKind, TagFilter,
};
pub use civitai::{CivitaiClient, SyncOptions, SyncOutcome};
pub use config::{Capabilities, GalleryConfig};
pub use error::{GalleryError, Result};
pub use metadata::{AssetMetadata, MetadataManager, MetadataUpdate, TagPreset, UiState};
pub use stack::{LoaderKind, NodeSelection, StackEntry, StackMode, StackPlan};
