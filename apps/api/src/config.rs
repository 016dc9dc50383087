use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::inference::format::PromptFormat;

/// llama.cpp clamps the offload count to the model's layer count, so this offloads every layer.
pub const DEFAULT_GPU_LAYERS: u32 = 999;
pub const DEFAULT_CONTEXT_TOKENS: u32 = 4096;
const DEFAULT_LLAMA_SERVER_URL: &str = "http://127.0.0.1:8080";

/// Where completions are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// GGUF weights loaded into this process through llama.cpp.
    Local,
    /// A separately running llama.cpp `llama-server`.
    Server,
}

impl BackendKind {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(BackendKind::Local),
            "server" => Ok(BackendKind::Server),
            other => bail!("MODEL_BACKEND must be 'local' or 'server', got '{other}'"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::Server => "server",
        }
    }
}

/// Application configuration loaded from environment variables.
///
/// Malformed values abort startup. A missing model file does not: the model
/// handle is simply reported as unavailable.
#[derive(Debug, Clone)]
pub struct Config {
    pub model_path: Option<PathBuf>,
    pub n_gpu_layers: u32,
    pub n_ctx: u32,
    pub backend: BackendKind,
    pub llama_server_url: String,
    pub prompt_format: PromptFormat,
    pub host: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            model_path: optional_env("MODEL_PATH").map(PathBuf::from),
            n_gpu_layers: parse_env("N_GPU_LAYERS", DEFAULT_GPU_LAYERS)?,
            n_ctx: parse_env("N_CTX", DEFAULT_CONTEXT_TOKENS)?,
            backend: BackendKind::from_name(
                &optional_env("MODEL_BACKEND").unwrap_or_else(|| "local".to_string()),
            )?,
            llama_server_url: optional_env("LLAMA_SERVER_URL")
                .unwrap_or_else(|| DEFAULT_LLAMA_SERVER_URL.to_string()),
            prompt_format: PromptFormat::from_name(
                &optional_env("PROMPT_FORMAT").unwrap_or_else(|| "chatml".to_string()),
            )
            .context("PROMPT_FORMAT must be one of: chatml, llama3, alpaca")?,
            host: optional_env("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_env("PORT", 8000)?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .ok()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: '{raw}'")),
        None => Ok(default),
    }
}
