//! LoRA catalog: discovery, preview lookup and the query engine.

mod preview;
mod query;
mod scanner;

pub use preview::{preview_url, FilePreviewResolver, Preview, PreviewKind, PreviewResolver};
pub use query::{
    collect_tags, run_query, CatalogItem, CatalogPage, CatalogQuery, FilterMode, PageRequest,
    TagFilter,
};
pub use scanner::{folder_of, CatalogEntry, CatalogScanner, ROOT_FOLDER};
