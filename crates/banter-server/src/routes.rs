//! HTTP routes and static assets

use axum::routing::get;
use axum::Router;
use std::path::Path;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::state::AppState;
use crate::ws;

/// Build the application router.
///
/// `/chat` upgrades to the WebSocket relay; anything unmatched is served
/// from the assets directory.
pub fn router(state: AppState, assets_dir: &Path) -> Router {
    Router::new()
        .route("/chat", get(ws::chat_handler))
        .route("/healthz", get(healthz))
        .with_state(state)
        .fallback_service(ServeDir::new(assets_dir).append_index_html_on_directories(true))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

async fn healthz() -> &'static str {
    "ok"
}
