/// Inference — the single point of entry for all model calls in the service.
///
/// ARCHITECTURAL RULE: No other module may call a completion backend directly.
/// All generation MUST go through `InferenceEngine::complete`, which serializes
/// calls process-wide. The loaded model context is not safe for concurrent use.
///
/// There is no timeout and no cancellation at this layer. A completion that has
/// been issued runs until the backend returns, even if the HTTP client hangs up.
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::config::{BackendKind, Config};
use crate::inference::format::PromptFormat;

pub mod format;
pub mod local;
pub mod server;

#[cfg(test)]
pub mod testing;

/// Sampling settings shared by every channel. Fixed for this service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub repeat_penalty: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            repeat_penalty: 1.1,
        }
    }
}

/// Everything a backend needs besides the prompt.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub sampling: SamplingParams,
    pub stop: &'static [&'static str],
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("model load failed: {0}")]
    Load(String),

    #[error("{0}")]
    Execution(String),
}

#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    /// Permanent until restart. Never retried.
    #[error("Model not loaded: {reason}")]
    ModelUnavailable { reason: String },

    #[error("Generation error: {0}")]
    GenerationFailure(String),

    #[error("Model returned empty output")]
    EmptyOutput,
}

/// Something that can turn a fully formatted prompt into generated text.
#[async_trait]
pub trait CompletionBackend: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn complete(&self, prompt: &str, params: &GenerationParams)
        -> Result<String, BackendError>;
}

/// Outcome of the one and only model initialization attempt.
#[derive(Clone)]
pub enum ModelState {
    Ready(Arc<dyn CompletionBackend>),
    Unavailable { reason: String },
}

/// The process-scoped model resource.
///
/// Created once at startup and shared by reference for the process lifetime.
/// If initialization failed the handle stays unavailable; nothing reloads it.
pub struct ModelHandle {
    state: ModelState,
    model_path: Option<PathBuf>,
}

impl ModelHandle {
    /// Makes exactly one attempt to bring the configured backend up.
    pub async fn load(config: &Config) -> Self {
        info!(
            "Loading model: path={} gpu_layers={} n_ctx={} backend={} format={}",
            config
                .model_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<unset>".to_string()),
            config.n_gpu_layers,
            config.n_ctx,
            config.backend.as_str(),
            config.prompt_format.name
        );

        let result = match config.backend {
            BackendKind::Local => load_local(config).await,
            BackendKind::Server => server::LlamaServerBackend::connect(&config.llama_server_url)
                .await
                .map(|b| Arc::new(b) as Arc<dyn CompletionBackend>),
        };

        let handle = match result {
            Ok(backend) => {
                info!("Model loaded successfully ({} backend)", backend.name());
                Self::ready(backend)
            }
            Err(e) => {
                error!("Model unavailable: {e}");
                Self::unavailable(e.to_string())
            }
        };

        Self {
            model_path: config.model_path.clone(),
            ..handle
        }
    }

    pub fn ready(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            state: ModelState::Ready(backend),
            model_path: None,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: ModelState::Unavailable {
                reason: reason.into(),
            },
            model_path: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, ModelState::Ready(_))
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    pub fn model_path(&self) -> Option<&PathBuf> {
        self.model_path.as_ref()
    }
}

async fn load_local(config: &Config) -> Result<Arc<dyn CompletionBackend>, BackendError> {
    let path = config
        .model_path
        .clone()
        .ok_or_else(|| BackendError::Load("MODEL_PATH is not set".to_string()))?;

    if !path.is_file() {
        return Err(BackendError::Load(format!(
            "model file not found at {}",
            path.display()
        )));
    }

    let (n_gpu_layers, n_ctx) = (config.n_gpu_layers, config.n_ctx);
    // Weight loading takes seconds to minutes and must not stall the runtime.
    let backend = tokio::task::spawn_blocking(move || {
        local::LocalBackend::load(&path, n_gpu_layers, n_ctx)
    })
    .await
    .map_err(|e| BackendError::Load(format!("loader task failed: {e}")))??;

    Ok(Arc::new(backend))
}

/// Exclusive gate in front of the model handle.
///
/// Cloning is cheap; all clones share the same handle and the same gate.
#[derive(Clone)]
pub struct InferenceEngine {
    handle: Arc<ModelHandle>,
    gate: Arc<Mutex<()>>,
    format: PromptFormat,
}

impl InferenceEngine {
    pub fn new(handle: ModelHandle, format: PromptFormat) -> Self {
        Self {
            handle: Arc::new(handle),
            gate: Arc::new(Mutex::new(())),
            format,
        }
    }

    pub fn handle(&self) -> &ModelHandle {
        &self.handle
    }

    pub fn format(&self) -> &PromptFormat {
        &self.format
    }

    /// Fails fast with `ModelUnavailable` when the handle never loaded.
    pub fn ensure_available(&self) -> Result<(), InferenceError> {
        match self.handle.state() {
            ModelState::Ready(_) => Ok(()),
            ModelState::Unavailable { reason } => Err(InferenceError::ModelUnavailable {
                reason: reason.clone(),
            }),
        }
    }

    /// Runs one completion behind the process-wide gate.
    ///
    /// The gated call runs in its own task so dropping the returned future
    /// does not release the gate while the backend is still executing.
    pub async fn complete(&self, prompt: String, max_tokens: u32) -> Result<String, InferenceError> {
        let backend = match self.handle.state() {
            ModelState::Ready(backend) => Arc::clone(backend),
            ModelState::Unavailable { reason } => {
                return Err(InferenceError::ModelUnavailable {
                    reason: reason.clone(),
                })
            }
        };

        let params = GenerationParams {
            max_tokens,
            sampling: SamplingParams::default(),
            stop: self.format.stop_sequences,
        };
        let gate = Arc::clone(&self.gate);

        let raw = tokio::spawn(async move {
            let _slot = gate.lock().await;
            backend.complete(&prompt, &params).await
        })
        .await
        .map_err(|e| InferenceError::GenerationFailure(format!("inference task failed: {e}")))?
        .map_err(|e| InferenceError::GenerationFailure(e.to_string()))?;

        let text = self.format.cut_at_stop(&raw).trim();
        if text.is_empty() {
            return Err(InferenceError::EmptyOutput);
        }

        debug!("Completion produced {} chars", text.chars().count());
        Ok(text.to_string())
    }
}
