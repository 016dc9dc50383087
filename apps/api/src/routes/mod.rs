pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::communications::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root_handler))
        .route("/api/health", get(health::health_handler))
        .route(
            "/api/generate-communications",
            post(handlers::handle_generate_communications),
        )
        .with_state(state)
}
