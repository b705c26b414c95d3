//! HTTP request handlers, split by domain.

mod catalog;
mod stack;
mod state;

pub use catalog::{get_all_tags, get_loras, get_preview, refresh_metadata, update_metadata};
pub use stack::plan_stack;
pub use state::{
    delete_preset, get_presets, get_selection, get_ui_state, save_preset, set_selection,
    set_ui_state,
};

use crate::server::AppState;
use axum::{response::IntoResponse, Json};
use lora_gallery::{GalleryApi, GalleryError, Result};
use serde_json::{json, Value};
use std::sync::Arc;

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Body returned by successful mutations.
pub(crate) fn ok() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// Run a store call on the blocking pool.
///
/// Every store mutation serializes and fsyncs its whole file.
pub(crate) async fn blocking<T, F>(state: &Arc<AppState>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&GalleryApi) -> Result<T> + Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || f(&state.api))
        .await
        .map_err(|e| GalleryError::Other(format!("Store task failed: {}", e)))?
}

/// Node ids arrive as strings in query params and as strings or numbers in
/// JSON bodies.
pub(crate) fn node_key(value: Option<&Value>) -> Result<String> {
    let key = match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    if key.is_empty() {
        return Err(GalleryError::invalid("node_id", "node_id is required"));
    }
    Ok(key)
}

/// Required, non-blank string parameter.
pub(crate) fn require_param(value: Option<String>, field: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| GalleryError::invalid(field, format!("{} is required", field)))
}

/// Split a comma-separated list, dropping blanks.
pub(crate) fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_key_accepts_numbers_and_strings() {
        assert_eq!(node_key(Some(&json!(12))).unwrap(), "12");
        assert_eq!(node_key(Some(&json!(" 7 "))).unwrap(), "7");
        assert!(node_key(Some(&json!(""))).is_err());
        assert!(node_key(Some(&json!(null))).is_err());
        assert!(node_key(None).is_err());
    }

    fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
        let root = temp_dir.path().join("loras");
        std::fs::create_dir_all(&root).unwrap();
        let api = GalleryApi::builder(&root)
            .data_dir(temp_dir.path().join("data"))
            .with_civitai(false)
            .build()
            .unwrap();
        Arc::new(AppState { api })
    }

    #[tokio::test]
    async fn test_blocking_returns_value_and_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let state = test_state(&temp_dir);

        let presets = blocking(&state, |api| api.presets()).await.unwrap();
        assert!(presets.is_empty());

        let err = blocking(&state, |_| {
            Err::<(), _>(GalleryError::invalid("name", "name is required"))
        })
        .await
        .unwrap_err();
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(Some("a, b,,c ")), vec!["a", "b", "c"]);
        assert!(split_list(None).is_empty());
    }
}
