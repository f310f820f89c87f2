//! Web server setup and routing

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::api;
use crate::state::AppState;

/// Build the router for the given state
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/rows", get(api::get_rows))
        .route("/api/copy", get(api::get_copy))
        .route("/api/diagnostics", get(api::get_diagnostics))
        .route("/api/dataset", get(api::get_dataset))
        .route("/api/reload", post(api::reload))
        // Static files (browser page) as fallback
        .fallback_service(ServeDir::new(&state.config.daemon.static_dir))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run plain HTTP server
pub async fn run(state: Arc<AppState>, bind: &str) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(address = %bind, protocol = "HTTP", "Starting web server");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::source::SourceLoader;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    const XML: &str = r#"<c>
        <tabletdef id="T1" name="Pro"/>
        <pendef id="P1" name="Pen"/>
        <compatrow><tablet>T1 T2</tablet><pen>P1</pen></compatrow>
    </c>"#;

    async fn state_for(dir: &TempDir, xml: &str) -> Arc<AppState> {
        let path = dir.path().join("compat.xml");
        std::fs::write(&path, xml).unwrap();

        let mut config = Config::default();
        config.dataset.sources = vec![path.display().to_string()];
        config.daemon.static_dir = dir.path().display().to_string();

        let loader = SourceLoader::new(&config.dataset.sources, 5).unwrap();
        let snapshot = loader.load().await.unwrap();
        AppState::with_snapshot(config, loader, snapshot)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_rows_endpoint() {
        let dir = TempDir::new().unwrap();
        let app = router(state_for(&dir, XML).await);

        let response = app
            .oneshot(
                Request::get("/api/rows?view=by-tablet&q=pro&names=true")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["view"], "by-tablet");
        assert_eq!(json["stats"]["visible_rows"], 1);
        assert_eq!(json["stats"]["total_tablets"], 2);
        assert_eq!(json["rows"][0]["tablets"]["items"][0], "Pro (T1)");
    }

    #[tokio::test]
    async fn test_copy_endpoint() {
        let dir = TempDir::new().unwrap();
        let app = router(state_for(&dir, XML).await);

        let response = app
            .oneshot(
                Request::get("/api/copy?view=ungrouped&names=false")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"T1\tP1\nT2\tP1");
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_dataset() {
        let dir = TempDir::new().unwrap();
        let state = state_for(&dir, XML).await;

        std::fs::write(dir.path().join("compat.xml"), "<c><compatrow></c>").unwrap();
        let response = router(state.clone())
            .oneshot(Request::post("/api/reload").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(state.snapshot().await.dataset.rows.len(), 1);

        std::fs::remove_file(dir.path().join("compat.xml")).unwrap();
        let response = router(state.clone())
            .oneshot(Request::post("/api/reload").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(state.snapshot().await.dataset.rows.len(), 1);
    }

    #[tokio::test]
    async fn test_diagnostics_endpoint() {
        let dir = TempDir::new().unwrap();
        let app = router(state_for(&dir, XML).await);

        let response = app
            .oneshot(Request::get("/api/diagnostics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["sources"][0]["diagnostics"]["warnings"], serde_json::json!([]));
        let warnings = &json["definitions"]["warnings"];
        assert_eq!(warnings[0]["kind"], "missing_tablet_definition");
        assert_eq!(warnings[0]["id"], "T2");
    }
}
