//! Assembles the full Axum router from the HTTP routes and the WS upgrade
//! endpoint, against the shared [`AppState`].

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws::connection::ws_handler;

pub fn build_router(state: Arc<AppState>) -> Router {
    crate::http::router()
        .route("/ws", get(ws_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
