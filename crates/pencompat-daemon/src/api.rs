//! REST API handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use pencompat_core::{FormatOptions, ViewMode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::render::{render, ViewRequest};
use crate::state::AppState;

/// API error response
#[derive(Serialize)]
struct ApiError {
    error: String,
}

impl ApiError {
    fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

/// Query parameters shared by the row and copy endpoints.
/// Anything omitted falls back to the `[display]` configuration.
#[derive(Debug, Default, Deserialize)]
pub struct ViewParams {
    view: Option<ViewMode>,
    #[serde(default)]
    q: String,
    names: Option<bool>,
    per_line: Option<bool>,
    families: Option<bool>,
}

impl ViewParams {
    fn into_request(self, state: &AppState) -> ViewRequest {
        let display = &state.config.display;
        ViewRequest {
            view: self.view.unwrap_or(display.view),
            query: self.q,
            options: FormatOptions {
                show_names: self.names.unwrap_or(display.show_names),
                one_per_line: self.per_line.unwrap_or(display.one_per_line),
                organize_by_family: self.families.unwrap_or(display.organize_by_family),
            },
        }
    }
}

/// Filtered, formatted rows with statistics
pub async fn get_rows(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ViewParams>,
) -> impl IntoResponse {
    let request = params.into_request(&state);
    let snapshot = state.snapshot().await;
    debug!(view = %request.view, query = %request.query, "Rendering rows");

    match render(&snapshot.dataset, &request) {
        Ok(view) => Json(view).into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, Json(ApiError::new(e.to_string()))).into_response(),
    }
}

/// Plain-text copy of the filtered rows
pub async fn get_copy(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ViewParams>,
) -> impl IntoResponse {
    let request = params.into_request(&state);
    let snapshot = state.snapshot().await;

    match render(&snapshot.dataset, &request) {
        Ok(view) => (
            StatusCode::OK,
            [("content-type", "text/plain; charset=utf-8")],
            view.to_plain_text(),
        )
            .into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, Json(ApiError::new(e.to_string()))).into_response(),
    }
}

/// Per-source diagnostics of the current dataset
pub async fn get_diagnostics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot().await;
    Json(serde_json::json!({
        "loaded_at": snapshot.loaded_at,
        "sources": snapshot.reports,
        "definitions": snapshot.definitions,
    }))
}

/// The merged dataset
pub async fn get_dataset(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot().await;
    Json(snapshot.dataset.clone())
}

/// Re-fetch every source; the previous dataset stays on failure
pub async fn reload(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    info!("Dataset reload requested");

    match state.reload().await {
        Ok(snapshot) => Json(serde_json::json!({
            "status": "reloaded",
            "rows": snapshot.dataset.rows.len(),
            "loaded_at": snapshot.loaded_at,
        }))
        .into_response(),
        Err(e) => {
            let status = if e.is_fetch() {
                StatusCode::BAD_GATEWAY
            } else {
                StatusCode::UNPROCESSABLE_ENTITY
            };
            (status, Json(ApiError::new(format!("Reload failed: {}", e)))).into_response()
        }
    }
}
