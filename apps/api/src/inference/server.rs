//! Backend for a running llama.cpp `llama-server`.
//!
//! The server owns the weights; this process only formats prompts and posts
//! them to `/completion`. Failed calls are surfaced immediately, never retried.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{BackendError, CompletionBackend, GenerationParams};

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    n_predict: u32,
    temperature: f32,
    top_p: f32,
    repeat_penalty: f32,
    stop: &'a [&'a str],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    content: String,
    #[serde(default)]
    tokens_predicted: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ServerError {
    error: ServerErrorBody,
}

#[derive(Debug, Deserialize)]
struct ServerErrorBody {
    message: String,
}

pub struct LlamaServerBackend {
    client: Client,
    base_url: String,
}

impl LlamaServerBackend {
    /// Builds the client and probes `GET /health` once.
    pub async fn connect(base_url: &str) -> Result<Self, BackendError> {
        let client = Client::builder()
            .build()
            .map_err(|e| BackendError::Load(format!("failed to build HTTP client: {e}")))?;

        let backend = Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        };

        let response = backend
            .client
            .get(format!("{}/health", backend.base_url))
            .send()
            .await
            .map_err(|e| {
                BackendError::Load(format!("llama-server unreachable at {}: {e}", backend.base_url))
            })?;

        if !response.status().is_success() {
            return Err(BackendError::Load(format!(
                "llama-server at {} reported status {}",
                backend.base_url,
                response.status()
            )));
        }

        Ok(backend)
    }
}

#[async_trait]
impl CompletionBackend for LlamaServerBackend {
    fn name(&self) -> &'static str {
        "llama-server"
    }

    async fn complete(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, BackendError> {
        let body = CompletionRequest {
            prompt,
            n_predict: params.max_tokens,
            temperature: params.sampling.temperature,
            top_p: params.sampling.top_p,
            repeat_penalty: params.sampling.repeat_penalty,
            stop: params.stop,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/completion", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Execution(format!("HTTP error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = parse_error_message(&text);
            return Err(BackendError::Execution(format!(
                "llama-server error (status {}): {message}",
                status.as_u16()
            )));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Execution(format!("invalid completion response: {e}")))?;

        debug!(
            "llama-server completion: tokens_predicted={:?}",
            completion.tokens_predicted
        );

        Ok(completion.content)
    }
}

fn parse_error_message(body: &str) -> String {
    serde_json::from_str::<ServerError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}
