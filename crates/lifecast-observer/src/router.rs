//! Axum router construction for the observer.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// - `GET /ws` -- one client session per connection
/// - `GET /api/stats` -- simulation and observer counters
/// - anything else -- files under [`AppState::static_dir`]
///
/// CORS allows any origin so the client can be served from elsewhere
/// during development.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let assets = ServeDir::new(&state.static_dir);

    Router::new()
        .route("/ws", get(ws::ws_session))
        .route("/api/stats", get(handlers::get_stats))
        .fallback_service(assets)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
