pub mod client;
pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod session;
pub mod state;
pub mod task;
pub mod user;
pub mod webhook;

pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/hook", post(http::hook::hook_handler))
        .route("/ws", get(http::ws::ws_handler))
        .route("/healthz", get(http::health::healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
