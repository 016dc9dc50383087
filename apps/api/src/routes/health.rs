use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

pub const SERVICE_NAME: &str = "Flight Disruption Communications Generator";

/// GET /api/health
/// Reports whether the model handle loaded at startup.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let handle = state.engine.handle();
    let loaded = handle.is_loaded();
    let status = if loaded { "ok" } else { "model_not_loaded" };
    Json(json!({
        "status": status,
        "model_loaded": loaded,
        "model_path": handle.model_path().map(|p| p.display().to_string()),
    }))
}

/// GET /
/// Service identity and load status.
pub async fn root_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
        "model_loaded": state.engine.handle().is_loaded(),
    }))
}
