//! Communications generation — runs the four channel generations for one disruption.
//!
//! Flow per channel, in fixed order (email → sms → gate → social):
//!   task instructions → PromptFormat::build → InferenceEngine::complete → enforce
//!
//! Channels run one after another. The engine's gate already serializes model
//! access process-wide, so issuing them concurrently would buy nothing.
//! The first failing channel aborts the request; partial results are dropped.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::communications::channels::{Channel, CHANNEL_SPECS};
use crate::communications::constraints::enforce;
use crate::communications::prompts::SYSTEM_PROMPT;
use crate::inference::{InferenceEngine, InferenceError};
use crate::models::disruption::DisruptionRecord;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Model not loaded: {reason}")]
    ModelUnavailable { reason: String },

    #[error("{channel} generation failed: {message}")]
    GenerationFailure { channel: Channel, message: String },
}

impl GenerationError {
    fn from_inference(channel: Channel, err: InferenceError) -> Self {
        match err {
            InferenceError::ModelUnavailable { reason } => {
                GenerationError::ModelUnavailable { reason }
            }
            InferenceError::GenerationFailure(message) => {
                GenerationError::GenerationFailure { channel, message }
            }
            InferenceError::EmptyOutput => GenerationError::GenerationFailure {
                channel,
                message: InferenceError::EmptyOutput.to_string(),
            },
        }
    }
}

/// Text for every channel. Only ever constructed complete.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    texts: BTreeMap<Channel, String>,
}

impl GenerationResult {
    pub fn into_response(mut self) -> CommunicationsResponse {
        let mut take = |channel: Channel| self.texts.remove(&channel).unwrap_or_default();
        CommunicationsResponse {
            passenger_email: take(Channel::Email),
            sms_notification: take(Channel::Sms),
            gate_agent_talking_points: take(Channel::GateTalkingPoints),
            social_media_response: take(Channel::SocialMedia),
        }
    }
}

/// Response body for `POST /api/generate-communications`.
#[derive(Debug, Clone, Serialize)]
pub struct CommunicationsResponse {
    pub passenger_email: String,
    pub sms_notification: String,
    pub gate_agent_talking_points: String,
    pub social_media_response: String,
}

/// Generates all four channel texts for `record`.
///
/// Fails with `ModelUnavailable` before any completion is attempted when the
/// model handle never loaded. Nothing is cached across requests.
pub async fn generate(
    engine: &InferenceEngine,
    record: &DisruptionRecord,
) -> Result<GenerationResult, GenerationError> {
    if let Err(InferenceError::ModelUnavailable { reason }) = engine.ensure_available() {
        return Err(GenerationError::ModelUnavailable { reason });
    }

    let format = engine.format();
    let mut texts = BTreeMap::new();

    for spec in CHANNEL_SPECS {
        let task = spec.task_instructions(record);
        let prompt = format.build(SYSTEM_PROMPT, &task);

        debug!(
            "Generating {} (max_tokens={}, prompt_chars={})",
            spec.channel,
            spec.max_tokens,
            prompt.chars().count()
        );

        let raw = engine
            .complete(prompt, spec.max_tokens)
            .await
            .map_err(|e| GenerationError::from_inference(spec.channel, e))?;

        let text = enforce(&raw, spec.char_ceiling);
        let (raw_chars, kept_chars) = (raw.chars().count(), text.chars().count());
        if kept_chars < raw_chars {
            warn!(
                "{} output truncated from {} to {} chars",
                spec.channel, raw_chars, kept_chars
            );
        }

        debug!("Generated {} ({} chars)", spec.channel, kept_chars);
        texts.insert(spec.channel, text);
    }

    info!(
        "Generated {} communications for flight {}",
        texts.len(),
        record.flight_number
    );

    Ok(GenerationResult { texts })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::inference::format::PromptFormat;
    use crate::inference::testing::ScriptedBackend;
    use crate::inference::ModelHandle;

    fn aa123() -> DisruptionRecord {
        serde_json::from_value(serde_json::json!({
            "flight_number": "AA123",
            "origin": "JFK",
            "destination": "LAX",
            "original_time": "10:00",
            "disruption_type": "delay",
            "reason": "Weather at origin",
            "new_time": "14:30"
        }))
        .unwrap()
    }

    fn engine_with(backend: Arc<ScriptedBackend>) -> InferenceEngine {
        InferenceEngine::new(ModelHandle::ready(backend), PromptFormat::chatml())
    }

    #[tokio::test]
    async fn test_aa123_scenario_respects_limits_and_mentions_flight() {
        let backend = Arc::new(ScriptedBackend::echo_line("Flight:", 200));
        let engine = engine_with(backend.clone());

        let response = generate(&engine, &aa123()).await.unwrap().into_response();

        assert!(response.sms_notification.chars().count() <= 160);
        assert!(response.social_media_response.chars().count() <= 280);
        assert!(response.passenger_email.contains("AA123"));
        assert!(response.gate_agent_talking_points.contains("AA123"));
        for text in [
            &response.passenger_email,
            &response.sms_notification,
            &response.gate_agent_talking_points,
            &response.social_media_response,
        ] {
            assert!(!text.is_empty());
        }
    }

    #[tokio::test]
    async fn test_channels_run_in_fixed_order_with_their_budgets() {
        let backend = Arc::new(ScriptedBackend::fixed("text"));
        let engine = engine_with(backend.clone());

        generate(&engine, &aa123()).await.unwrap();

        let calls = backend.calls();
        let budgets: Vec<u32> = calls.iter().map(|c| c.max_tokens).collect();
        assert_eq!(budgets, vec![400, 100, 450, 150]);
        assert!(calls[0].prompt.contains("passenger notification email"));
        assert!(calls[1].prompt.contains("SMS/text notification"));
        assert!(calls[2].prompt.contains("talking points for gate agents"));
        assert!(calls[3].prompt.contains("Twitter/X response"));
        for call in &calls {
            assert!(call.prompt.starts_with("<|im_start|>system\nYou are a communications specialist"));
            assert!(call.prompt.ends_with("<|im_start|>assistant\n"));
        }
    }

    #[tokio::test]
    async fn test_unavailable_model_fails_without_any_completion() {
        let engine = InferenceEngine::new(
            ModelHandle::unavailable("model file not found at /models/x.gguf"),
            PromptFormat::chatml(),
        );

        let err = generate(&engine, &aa123()).await.unwrap_err();
        assert!(matches!(err, GenerationError::ModelUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_first_failure_aborts_remaining_channels() {
        let backend = Arc::new(ScriptedBackend::failing_on(1, "llama_decode returned -1"));
        let engine = engine_with(backend.clone());

        let err = generate(&engine, &aa123()).await.unwrap_err();
        match err {
            GenerationError::GenerationFailure { channel, message } => {
                assert_eq!(channel, Channel::Sms);
                assert_eq!(message, "llama_decode returned -1");
            }
            other => panic!("expected GenerationFailure, got {other:?}"),
        }
        assert_eq!(backend.calls().len(), 2, "gate and social must not run");
    }

    #[tokio::test]
    async fn test_empty_model_output_fails_the_request() {
        let engine = engine_with(Arc::new(ScriptedBackend::fixed("<|im_end|>")));
        let err = generate(&engine, &aa123()).await.unwrap_err();
        assert!(matches!(
            err,
            GenerationError::GenerationFailure { channel: Channel::Email, .. }
        ));
    }

    #[tokio::test]
    async fn test_each_request_generates_independently() {
        let backend = Arc::new(ScriptedBackend::fixed("text"));
        let engine = engine_with(backend.clone());

        generate(&engine, &aa123()).await.unwrap();
        generate(&engine, &aa123()).await.unwrap();

        assert_eq!(backend.calls().len(), 8);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_never_overlap_in_the_model() {
        let backend =
            Arc::new(ScriptedBackend::fixed("text").with_delay(Duration::from_millis(2)));
        let engine = engine_with(backend.clone());

        let mut tasks = Vec::new();
        for _ in 0..6 {
            let engine = engine.clone();
            tasks.push(tokio::spawn(async move { generate(&engine, &aa123()).await }));
        }
        for task in tasks {
            let response = task.await.unwrap().unwrap().into_response();
            assert_eq!(response.sms_notification, "text");
        }

        assert_eq!(backend.calls().len(), 24);
        assert_eq!(backend.overlapping_calls(), 0);
    }

    #[test]
    fn test_into_response_maps_every_channel() {
        let texts = BTreeMap::from([
            (Channel::Email, "e".to_string()),
            (Channel::Sms, "s".to_string()),
            (Channel::GateTalkingPoints, "g".to_string()),
            (Channel::SocialMedia, "m".to_string()),
        ]);
        let response = GenerationResult { texts }.into_response();
        assert_eq!(response.passenger_email, "e");
        assert_eq!(response.sms_notification, "s");
        assert_eq!(response.gate_agent_talking_points, "g");
        assert_eq!(response.social_media_response, "m");
    }
}
