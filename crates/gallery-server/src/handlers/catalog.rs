//! Catalog listing, previews and metadata edits.

use super::{blocking, ok, require_param, split_list};
use crate::error::ApiResult;
use crate::server::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use lora_gallery::config::GalleryConfig;
use lora_gallery::{
    CatalogPage, CatalogQuery, FilterMode, GalleryError, MetadataUpdate, PageRequest,
    SyncOptions, TagFilter,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Query string of `get_loras`. Numbers are parsed by hand so bad input
/// yields the usual error body.
#[derive(Debug, Default, Deserialize)]
pub struct LorasParams {
    pub filter_tag: Option<String>,
    pub mode: Option<String>,
    pub folder: Option<String>,
    pub pinned: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl LorasParams {
    fn into_query(self) -> lora_gallery::Result<CatalogQuery> {
        let page = parse_number(self.page.as_deref(), "page", 1)?;
        let page_size = parse_number(
            self.page_size.as_deref(),
            "page_size",
            GalleryConfig::DEFAULT_PAGE_SIZE,
        )?;
        let mode: FilterMode = self.mode.as_deref().unwrap_or_default().parse()?;

        let mut query = CatalogQuery::new(PageRequest::new(page, page_size)?)
            .with_tag_filter(TagFilter::parse(self.filter_tag.as_deref().unwrap_or_default(), mode))
            .with_pins(split_list(self.pinned.as_deref()));
        if let Some(folder) = self.folder.filter(|f| !f.is_empty()) {
            query = query.in_folder(folder);
        }
        Ok(query)
    }
}

fn parse_number(raw: Option<&str>, field: &str, default: usize) -> lora_gallery::Result<usize> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(default),
        Some(s) => s
            .parse()
            .map_err(|_| GalleryError::invalid(field, format!("not a page number: {}", s))),
    }
}

pub async fn get_loras(
    State(state): State<Arc<AppState>>,
    params: Result<Query<LorasParams>, QueryRejection>,
) -> ApiResult<Json<CatalogPage>> {
    let Query(params) = params?;
    let query = params.into_query()?;
    Ok(Json(state.api.list_loras(query).await?))
}

#[derive(Debug, Deserialize)]
pub struct PreviewParams {
    pub filename: Option<String>,
    pub lora_name: Option<String>,
}

/// Serve a preview file that sits next to a LoRA.
pub async fn get_preview(
    State(state): State<Arc<AppState>>,
    params: Result<Query<PreviewParams>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(params) = params?;
    let (Some(filename), Some(lora_name)) = (params.filename, params.lora_name) else {
        return Err(GalleryError::Forbidden("filename and lora_name are required".into()).into());
    };

    let path = state.api.preview_file(&lora_name, &filename)?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| GalleryError::io_with_path(e, &path))?;
    debug!("Serving preview {} ({} bytes)", path.display(), bytes.len());

    Ok(([(header::CONTENT_TYPE, content_type(&path))], bytes))
}

fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

pub async fn get_all_tags(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let tags = state.api.all_tags()?;
    Ok(Json(json!({ "tags": tags })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateMetadataRequest {
    pub lora_name: Option<String>,
    #[serde(flatten)]
    pub update: MetadataUpdate,
}

pub async fn update_metadata(
    State(state): State<Arc<AppState>>,
    body: Result<Json<UpdateMetadataRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = body?;
    let lora_name = require_param(request.lora_name, "lora_name")?;
    let update = request.update;
    blocking(&state, move |api| api.update_metadata(&lora_name, update)).await?;
    Ok(ok())
}

#[derive(Debug, Deserialize)]
pub struct RefreshMetadataRequest {
    pub lora_name: Option<String>,
    #[serde(flatten)]
    pub options: SyncOptions,
}

pub async fn refresh_metadata(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RefreshMetadataRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = body?;
    let lora_name = require_param(request.lora_name, "lora_name")?;
    let outcome = state.api.refresh_metadata(&lora_name, request.options).await?;
    Ok(Json(json!({ "status": "ok", "outcome": outcome })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> LorasParams {
        let mut p = LorasParams::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "filter_tag" => p.filter_tag = v,
                "mode" => p.mode = v,
                "folder" => p.folder = v,
                "pinned" => p.pinned = v,
                "page" => p.page = v,
                "page_size" => p.page_size = v,
                _ => unreachable!(),
            }
        }
        p
    }

    #[test]
    fn test_defaults() {
        let query = LorasParams::default().into_query().unwrap();
        assert_eq!(query.page, PageRequest::new(1, 50).unwrap());
        assert!(query.tag_filter.is_none());
        assert!(query.folder.is_none());
        assert!(query.pinned.is_empty());
    }

    #[test]
    fn test_full_params() {
        let query = params(&[
            ("filter_tag", "Style, anime"),
            ("mode", "and"),
            ("folder", "styles"),
            ("pinned", "a.safetensors,b.safetensors"),
            ("page", "2"),
            ("page_size", "10"),
        ])
        .into_query()
        .unwrap();

        let filter = query.tag_filter.unwrap();
        assert_eq!(filter.mode(), FilterMode::All);
        assert_eq!(filter.tags(), ["style", "anime"]);
        assert_eq!(query.folder.as_deref(), Some("styles"));
        assert_eq!(query.pinned, vec!["a.safetensors", "b.safetensors"]);
        assert_eq!(query.page, PageRequest::new(2, 10).unwrap());
    }

    #[test]
    fn test_invalid_params() {
        assert!(params(&[("page", "0")]).into_query().is_err());
        assert!(params(&[("page_size", "0")]).into_query().is_err());
        assert!(params(&[("page", "two")]).into_query().is_err());
        assert!(params(&[("mode", "XOR")]).into_query().is_err());
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type(Path::new("a/b.PNG")), "image/png");
        assert_eq!(content_type(Path::new("clip.webm")), "video/webm");
        assert_eq!(content_type(Path::new("noext")), "application/octet-stream");
    }
}
