//! Per-node UI state, selections and tag filter presets.

use super::{blocking, node_key, ok, require_param};
use crate::error::ApiResult;
use crate::server::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use lora_gallery::{NodeSelection, TagPreset, UiState};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct NodeParams {
    pub node_id: Option<String>,
}

impl NodeParams {
    fn key(self) -> lora_gallery::Result<String> {
        require_param(self.node_id, "node_id")
    }
}

pub async fn get_ui_state(
    State(state): State<Arc<AppState>>,
    params: Result<Query<NodeParams>, QueryRejection>,
) -> ApiResult<Json<UiState>> {
    let Query(params) = params?;
    Ok(Json(state.api.ui_state(&params.key()?)?))
}

#[derive(Debug, Deserialize)]
pub struct SetUiStateRequest {
    pub node_id: Option<Value>,
    #[serde(default)]
    pub state: Map<String, Value>,
}

pub async fn set_ui_state(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SetUiStateRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = body?;
    let node_id = node_key(request.node_id.as_ref())?;
    let patch = request.state;
    blocking(&state, move |api| api.merge_ui_state(&node_id, patch)).await?;
    Ok(ok())
}

/// The stack as the front end reads it: `{"lora_stack": [...]}`.
pub async fn get_selection(
    State(state): State<Arc<AppState>>,
    params: Result<Query<NodeParams>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(params) = params?;
    let selection = state.api.selection(&params.key()?)?;
    Ok(Json(json!({
        "version": selection.version,
        "lora_stack": selection.stack,
    })))
}

#[derive(Debug, Deserialize)]
pub struct SetSelectionRequest {
    pub node_id: Option<Value>,
    /// Current or legacy layout; migrated on the way in.
    #[serde(default)]
    pub lora_stack: Value,
}

pub async fn set_selection(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SetSelectionRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = body?;
    let node_id = node_key(request.node_id.as_ref())?;
    let selection = NodeSelection::from_value(request.lora_stack)?;
    blocking(&state, move |api| api.set_selection(&node_id, selection)).await?;
    Ok(ok())
}

pub async fn get_presets(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let presets = state.api.presets()?;
    Ok(Json(json!({ "presets": presets })))
}

pub async fn save_preset(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TagPreset>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(preset) = body?;
    blocking(&state, move |api| api.save_preset(preset)).await?;
    Ok(ok())
}

#[derive(Debug, Deserialize)]
pub struct DeletePresetRequest {
    pub name: Option<String>,
}

pub async fn delete_preset(
    State(state): State<Arc<AppState>>,
    body: Result<Json<DeletePresetRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = body?;
    let name = require_param(request.name, "name")?;
    let deleted = blocking(&state, move |api| api.delete_preset(&name)).await?;
    Ok(Json(json!({ "status": "ok", "deleted": deleted })))
}
