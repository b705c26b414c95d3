//! Execution-time stack planning.

use super::require_param;
use crate::error::ApiResult;
use crate::server::AppState;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use lora_gallery::{StackMode, StackPlan};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct PlanParams {
    pub node_id: Option<String>,
    pub mode: Option<String>,
    /// The model to patch is one the accelerated loader handles.
    #[serde(default)]
    pub accelerated_model: bool,
}

pub async fn plan_stack(
    State(state): State<Arc<AppState>>,
    params: Result<Query<PlanParams>, QueryRejection>,
) -> ApiResult<Json<StackPlan>> {
    let Query(params) = params?;
    let node_id = require_param(params.node_id, "node_id")?;
    let mode: StackMode = params.mode.as_deref().unwrap_or_default().parse()?;
    let plan = state.api.plan_stack(&node_id, mode, params.accelerated_model)?;
    Ok(Json(plan))
}
