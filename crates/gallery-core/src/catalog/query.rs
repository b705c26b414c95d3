//! Catalog query engine: filter, pin, sort and paginate LoRA entries.
//!
//! The engine is a pure function of its inputs. It never touches the disk or
//! the network itself; the preview resolver it is handed is only consulted
//! for entries on the returned page.

use crate::catalog::preview::{PreviewKind, PreviewResolver};
use crate::catalog::scanner::CatalogEntry;
use crate::metadata::AssetMetadata;
use crate::{GalleryError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// How multiple filter tags combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilterMode {
    /// At least one filter tag must be present.
    #[default]
    #[serde(alias = "OR", alias = "any", alias = "or")]
    Any,
    /// Every filter tag must be present.
    #[serde(alias = "AND", alias = "all", alias = "and")]
    All,
}

impl FromStr for FilterMode {
    type Err = GalleryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "" | "ANY" | "OR" => Ok(FilterMode::Any),
            "ALL" | "AND" => Ok(FilterMode::All),
            other => Err(GalleryError::invalid(
                "mode",
                format!("unknown filter mode {:?}, expected ANY/OR or ALL/AND", other),
            )),
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterMode::Any => write!(f, "ANY"),
            FilterMode::All => write!(f, "ALL"),
        }
    }
}

/// Lowercased filter tags plus their combination mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFilter {
    tags: Vec<String>,
    mode: FilterMode,
}

impl TagFilter {
    /// Build a filter from raw tags. Returns `None` when no non-blank tag
    /// remains, meaning "no tag filtering".
    pub fn new<I, S>(tags: I, mode: FilterMode) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let tags: Vec<String> = tags
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty() && seen.insert(t.clone()))
            .collect();

        if tags.is_empty() {
            None
        } else {
            Some(Self { tags, mode })
        }
    }

    /// Parse a comma-separated tag list.
    pub fn parse(raw: &str, mode: FilterMode) -> Option<Self> {
        Self::new(raw.split(','), mode)
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// `asset_tags` must already be lowercased.
    pub fn matches(&self, asset_tags: &[String]) -> bool {
        let has = |t: &String| asset_tags.iter().any(|a| a == t);
        match self.mode {
            FilterMode::All => self.tags.iter().all(has),
            FilterMode::Any => self.tags.iter().any(has),
        }
    }
}

/// 1-based page number and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    page_size: usize,
}

impl PageRequest {
    /// Page numbers start at 1 and sizes must be positive. There is no upper
    /// bound: pages past the end are simply empty.
    pub fn new(page: usize, page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(GalleryError::invalid(
                "page_size",
                "must be greater than zero",
            ));
        }
        if page == 0 {
            return Err(GalleryError::invalid("page", "pages are numbered from 1"));
        }
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of pages needed for `total` items.
    pub fn total_pages(&self, total: usize) -> usize {
        total.div_ceil(self.page_size)
    }

    /// Index range of this page within `total` items; empty when out of range.
    pub fn range(&self, total: usize) -> std::ops::Range<usize> {
        let start = (self.page - 1).saturating_mul(self.page_size).min(total);
        let end = start.saturating_add(self.page_size).min(total);
        start..end
    }
}

/// Parameters of one catalog query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub tag_filter: Option<TagFilter>,
    /// Exact folder match; `"."` is the catalog root.
    pub folder: Option<String>,
    /// Names surfaced first, in this order.
    pub pinned: Vec<String>,
    pub page: PageRequest,
}

impl CatalogQuery {
    pub fn new(page: PageRequest) -> Self {
        Self {
            tag_filter: None,
            folder: None,
            pinned: Vec::new(),
            page,
        }
    }

    pub fn with_tag_filter(mut self, filter: Option<TagFilter>) -> Self {
        self.tag_filter = filter;
        self
    }

    pub fn in_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn with_pins<I, S>(mut self, pins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pinned = pins.into_iter().map(Into::into).collect();
        self
    }
}

/// One entry of a result page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub name: String,
    pub tags: Vec<String>,
    pub trigger_words: String,
    pub download_url: String,
    pub preview_url: String,
    pub preview_type: PreviewKind,
}

/// A page of query results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPage {
    pub loras: Vec<CatalogItem>,
    /// Every folder in the catalog, independent of the filters.
    pub folders: Vec<String>,
    pub total_count: usize,
    pub total_pages: usize,
    pub current_page: usize,
}

/// Run `query` over `assets`.
///
/// `folder_of` maps an entry to its folder; `metadata` supplies tags and
/// links (absent names read as empty). Pins only reorder entries that
/// survive the filters.
pub fn run_query<'a, F, P>(
    assets: &'a [CatalogEntry],
    metadata: &HashMap<String, AssetMetadata>,
    folder_of: F,
    query: &CatalogQuery,
    previews: &P,
) -> CatalogPage
where
    F: Fn(&CatalogEntry) -> String,
    P: PreviewResolver + ?Sized,
{
    let mut folders = BTreeSet::new();
    let mut survivors: Vec<&'a CatalogEntry> = Vec::new();

    for asset in assets {
        let folder = folder_of(asset);
        let in_folder = query.folder.as_deref().map_or(true, |f| f == folder);
        folders.insert(folder);
        if !in_folder {
            continue;
        }

        if let Some(filter) = &query.tag_filter {
            let tags = metadata
                .get(&asset.name)
                .map(AssetMetadata::normalized_tags)
                .unwrap_or_default();
            if !filter.matches(&tags) {
                continue;
            }
        }
        survivors.push(asset);
    }

    let ordered = order_with_pins(survivors, &query.pinned);

    let total_count = ordered.len();
    let range = query.page.range(total_count);
    let empty = AssetMetadata::default();
    let loras = ordered[range]
        .iter()
        .map(|asset| {
            let meta = metadata.get(&asset.name).unwrap_or(&empty);
            let preview = previews.resolve(&asset.name);
            CatalogItem {
                name: asset.name.clone(),
                tags: meta.tags.clone(),
                trigger_words: meta.trigger_words.clone(),
                download_url: meta.download_url.clone(),
                preview_url: preview.url,
                preview_type: preview.kind,
            }
        })
        .collect();

    CatalogPage {
        loras,
        folders: folders.into_iter().collect(),
        total_count,
        total_pages: query.page.total_pages(total_count),
        current_page: query.page.page(),
    }
}

/// Pinned survivors in pin order, then the rest by case-insensitive name.
fn order_with_pins<'a>(survivors: Vec<&'a CatalogEntry>, pinned: &[String]) -> Vec<&'a CatalogEntry> {
    let pin_set: HashSet<&str> = pinned.iter().map(String::as_str).collect();
    let by_name: HashMap<&'a str, &'a CatalogEntry> =
        survivors.iter().map(|&a| (a.name.as_str(), a)).collect();

    let mut emitted: HashSet<&str> = HashSet::new();
    let mut ordered: Vec<&'a CatalogEntry> = Vec::with_capacity(survivors.len());
    for name in pinned {
        if let Some(&asset) = by_name.get(name.as_str()) {
            if emitted.insert(name.as_str()) {
                ordered.push(asset);
            }
        }
    }

    let mut remaining: Vec<&'a CatalogEntry> = survivors
        .into_iter()
        .filter(|a| !pin_set.contains(a.name.as_str()))
        .collect();
    remaining.sort_by_cached_key(|a| a.name.to_lowercase());

    ordered.extend(remaining);
    ordered
}

/// Every distinct tag across `metadata`, sorted case-insensitively.
pub fn collect_tags<'a, I>(metadata: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a AssetMetadata>,
{
    let distinct: BTreeSet<&str> = metadata
        .into_iter()
        .flat_map(|m| m.tags.iter().map(String::as_str))
        .collect();
    let mut tags: Vec<String> = distinct.into_iter().map(String::from).collect();
    tags.sort_by_key(|t| t.to_lowercase());
    tags
}
