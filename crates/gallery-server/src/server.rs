//! HTTP server implementation using Axum.

use crate::handlers::{
    delete_preset, get_all_tags, get_loras, get_presets, get_preview, get_selection,
    get_ui_state, handle_health, plan_stack, refresh_metadata, save_preset, set_selection,
    set_ui_state, update_metadata,
};
use axum::{
    routing::{get, post},
    Router,
};
use lora_gallery::config::GalleryConfig;
use lora_gallery::GalleryApi;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers.
pub struct AppState {
    pub api: GalleryApi,
}

/// Build the router with every gallery endpoint under the route prefix.
pub fn router(state: Arc<AppState>) -> Router {
    // The gallery UI is served by the host on another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let gallery = Router::new()
        .route("/get_loras", get(get_loras))
        .route("/preview", get(get_preview))
        .route("/get_all_tags", get(get_all_tags))
        .route("/update_metadata", post(update_metadata))
        .route("/refresh_metadata", post(refresh_metadata))
        .route("/get_ui_state", get(get_ui_state))
        .route("/set_ui_state", post(set_ui_state))
        .route("/get_selection", get(get_selection))
        .route("/set_selection", post(set_selection))
        .route("/get_presets", get(get_presets))
        .route("/save_preset", post(save_preset))
        .route("/delete_preset", post(delete_preset))
        .route("/plan_stack", get(plan_stack));

    Router::new()
        .route("/health", get(handle_health))
        .nest(GalleryConfig::ROUTE_PREFIX, gallery)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(api: GalleryApi, host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    let app = router(Arc::new(AppState { api }));

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}
