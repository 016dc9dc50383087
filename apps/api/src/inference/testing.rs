//! Scripted completion backend for tests. Records every call and counts
//! overlapping (re-entrant) invocations.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{BackendError, CompletionBackend, GenerationParams, SamplingParams};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub prompt: String,
    pub max_tokens: u32,
    pub sampling: SamplingParams,
    pub stop: &'static [&'static str],
}

enum Script {
    Fixed(String),
    /// Echoes the first prompt line starting with the prefix, then pads.
    EchoLine { prefix: &'static str, padding: usize },
    /// Fails on the n-th call (zero based), succeeds with "ok" otherwise.
    FailOn { call: usize, message: String },
}

pub struct ScriptedBackend {
    script: Script,
    delay: Duration,
    in_flight: AtomicBool,
    overlaps: AtomicUsize,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedBackend {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            delay: Duration::ZERO,
            in_flight: AtomicBool::new(false),
            overlaps: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fixed(text: &str) -> Self {
        Self::with_script(Script::Fixed(text.to_string()))
    }

    pub fn echo_line(prefix: &'static str, padding: usize) -> Self {
        Self::with_script(Script::EchoLine { prefix, padding })
    }

    pub fn failing_on(call: usize, message: &str) -> Self {
        Self::with_script(Script::FailOn {
            call,
            message: message.to_string(),
        })
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn overlapping_calls(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, BackendError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }

        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(RecordedCall {
                prompt: prompt.to_string(),
                max_tokens: params.max_tokens,
                sampling: params.sampling,
                stop: params.stop,
            });
            calls.len() - 1
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let result = match &self.script {
            Script::Fixed(text) => Ok(text.clone()),
            Script::EchoLine { prefix, padding } => {
                let line = prompt
                    .lines()
                    .find(|l| l.starts_with(prefix))
                    .unwrap_or_default();
                Ok(format!("{line} {}", "word ".repeat(*padding)))
            }
            Script::FailOn { call, message } if *call == index => {
                Err(BackendError::Execution(message.clone()))
            }
            Script::FailOn { .. } => Ok("ok".to_string()),
        };

        self.in_flight.store(false, Ordering::SeqCst);
        result
    }
}
