//! In-process GGUF inference through llama.cpp.
//!
//! Compiled only with the `llama-cpp` feature. Without it, loading always
//! fails and the model handle reports itself unavailable.

use std::path::Path;

#[cfg(feature = "llama-cpp")]
pub use enabled::LocalBackend;

#[cfg(not(feature = "llama-cpp"))]
pub use disabled::LocalBackend;

#[cfg(not(feature = "llama-cpp"))]
mod disabled {
    use super::*;
    use crate::inference::{BackendError, CompletionBackend, GenerationParams};
    use async_trait::async_trait;

    pub struct LocalBackend {
        _private: (),
    }

    impl LocalBackend {
        pub fn load(path: &Path, _n_gpu_layers: u32, _n_ctx: u32) -> Result<Self, BackendError> {
            Err(BackendError::Load(format!(
                "cannot load {}: built without llama-cpp support (enable the `llama-cpp` feature)",
                path.display()
            )))
        }
    }

    #[async_trait]
    impl CompletionBackend for LocalBackend {
        fn name(&self) -> &'static str {
            "llama-cpp"
        }

        async fn complete(
            &self,
            _prompt: &str,
            _params: &GenerationParams,
        ) -> Result<String, BackendError> {
            Err(BackendError::Execution(
                "built without llama-cpp support".to_string(),
            ))
        }
    }
}

#[cfg(feature = "llama-cpp")]
mod enabled {
    use std::num::NonZeroU32;
    use std::sync::Arc;

    use super::*;
    use crate::inference::{BackendError, CompletionBackend, GenerationParams};
    use async_trait::async_trait;
    use llama_cpp_2::context::params::LlamaContextParams;
    use llama_cpp_2::llama_backend::LlamaBackend;
    use llama_cpp_2::llama_batch::LlamaBatch;
    use llama_cpp_2::model::params::LlamaModelParams;
    use llama_cpp_2::model::{AddBos, LlamaModel, Special};
    use llama_cpp_2::sampling::LlamaSampler;
    use tracing::debug;

    /// Tokens fed to the model per decode call while ingesting the prompt.
    const PROMPT_BATCH: usize = 512;
    /// Window the repeat penalty looks back over.
    const PENALTY_LAST_N: i32 = 64;

    struct Loaded {
        backend: LlamaBackend,
        model: LlamaModel,
        n_ctx: u32,
    }

    pub struct LocalBackend {
        inner: Arc<Loaded>,
    }

    impl LocalBackend {
        pub fn load(path: &Path, n_gpu_layers: u32, n_ctx: u32) -> Result<Self, BackendError> {
            let backend = LlamaBackend::init().map_err(|e| BackendError::Load(e.to_string()))?;
            let params = LlamaModelParams::default().with_n_gpu_layers(n_gpu_layers);
            let model = LlamaModel::load_from_file(&backend, path, &params)
                .map_err(|e| BackendError::Load(format!("{}: {e}", path.display())))?;

            Ok(Self {
                inner: Arc::new(Loaded {
                    backend,
                    model,
                    n_ctx,
                }),
            })
        }
    }

    #[async_trait]
    impl CompletionBackend for LocalBackend {
        fn name(&self) -> &'static str {
            "llama-cpp"
        }

        async fn complete(
            &self,
            prompt: &str,
            params: &GenerationParams,
        ) -> Result<String, BackendError> {
            let inner = Arc::clone(&self.inner);
            let prompt = prompt.to_string();
            let params = params.clone();

            tokio::task::spawn_blocking(move || run_completion(&inner, &prompt, &params))
                .await
                .map_err(|e| BackendError::Execution(format!("completion thread failed: {e}")))?
        }
    }

    fn exec<E: std::fmt::Display>(e: E) -> BackendError {
        BackendError::Execution(e.to_string())
    }

    fn run_completion(
        loaded: &Loaded,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, BackendError> {
        let ctx_params = LlamaContextParams::default().with_n_ctx(NonZeroU32::new(loaded.n_ctx));
        let mut ctx = loaded
            .model
            .new_context(&loaded.backend, ctx_params)
            .map_err(exec)?;

        let tokens = loaded
            .model
            .str_to_token(prompt, AddBos::Always)
            .map_err(exec)?;

        let budget = tokens.len() + params.max_tokens as usize;
        if budget > loaded.n_ctx as usize {
            return Err(BackendError::Execution(format!(
                "prompt of {} tokens plus {} generated tokens exceeds the {}-token context",
                tokens.len(),
                params.max_tokens,
                loaded.n_ctx
            )));
        }

        let mut batch = LlamaBatch::new(PROMPT_BATCH, 1);
        let last = tokens.len().saturating_sub(1);
        for (chunk_start, chunk) in tokens.chunks(PROMPT_BATCH).enumerate() {
            batch.clear();
            for (offset, token) in chunk.iter().enumerate() {
                let pos = chunk_start * PROMPT_BATCH + offset;
                batch
                    .add(*token, pos as i32, &[0], pos == last)
                    .map_err(exec)?;
            }
            ctx.decode(&mut batch).map_err(exec)?;
        }

        let mut sampler = LlamaSampler::chain_simple([
            LlamaSampler::penalties(PENALTY_LAST_N, params.sampling.repeat_penalty, 0.0, 0.0),
            LlamaSampler::top_p(params.sampling.top_p, 1),
            LlamaSampler::temp(params.sampling.temperature),
            LlamaSampler::dist(rand_seed()),
        ]);

        let mut output = String::new();
        let mut pos = tokens.len() as i32;
        for _ in 0..params.max_tokens {
            let token = sampler.sample(&ctx, batch.n_tokens() - 1);
            sampler.accept(token);

            if loaded.model.is_eog_token(token) {
                break;
            }

            let piece = loaded
                .model
                .token_to_str(token, Special::Tokenize)
                .map_err(exec)?;
            output.push_str(&piece);

            if params.stop.iter().any(|stop| output.contains(stop)) {
                break;
            }

            batch.clear();
            batch.add(token, pos, &[0], true).map_err(exec)?;
            ctx.decode(&mut batch).map_err(exec)?;
            pos += 1;
        }

        debug!("llama.cpp generated {} tokens", pos as usize - tokens.len());
        Ok(output)
    }

    fn rand_seed() -> u32 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0)
    }
}
