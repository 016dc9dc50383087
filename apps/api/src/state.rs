use crate::inference::InferenceEngine;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Gate in front of the process-wide model handle.
    pub engine: InferenceEngine,
}
