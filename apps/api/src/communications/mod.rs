// Multi-channel disruption communications.
// Implements: channel specs, prompt templates, length constraints, the generation pipeline.
// All model calls go through inference::InferenceEngine; nothing here touches a backend.

pub mod channels;
pub mod constraints;
pub mod coordinator;
pub mod handlers;
pub mod prompts;
