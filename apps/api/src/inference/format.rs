//! Chat-turn delimiters for the target model family.
//!
//! Model families disagree on how system/user/assistant turns are marked and
//! on which tokens end a turn. Everything model-family specific lives in a
//! [`PromptFormat`] value so swapping models is a configuration change.

/// Turn delimiters and stop sequences for one model family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptFormat {
    pub name: &'static str,
    pub system_open: &'static str,
    pub user_open: &'static str,
    pub assistant_open: &'static str,
    /// Closes the system and user turns. The assistant turn is left open.
    pub turn_close: &'static str,
    /// End-of-turn, end-of-text and start-of-turn markers. Generation halts on any of them.
    pub stop_sequences: &'static [&'static str],
}

impl PromptFormat {
    /// ChatML, used by Qwen and many instruction-tuned GGUF builds.
    pub const fn chatml() -> Self {
        Self {
            name: "chatml",
            system_open: "<|im_start|>system\n",
            user_open: "<|im_start|>user\n",
            assistant_open: "<|im_start|>assistant\n",
            turn_close: "<|im_end|>\n",
            stop_sequences: &["<|im_end|>", "<|endoftext|>", "<|im_start|>"],
        }
    }

    /// Llama 3 instruct header format. The BOS token is added by the tokenizer.
    pub const fn llama3() -> Self {
        Self {
            name: "llama3",
            system_open: "<|start_header_id|>system<|end_header_id|>\n\n",
            user_open: "<|start_header_id|>user<|end_header_id|>\n\n",
            assistant_open: "<|start_header_id|>assistant<|end_header_id|>\n\n",
            turn_close: "<|eot_id|>",
            stop_sequences: &["<|eot_id|>", "<|end_of_text|>", "<|start_header_id|>"],
        }
    }

    pub const fn alpaca() -> Self {
        Self {
            name: "alpaca",
            system_open: "### Instruction:\n",
            user_open: "### Input:\n",
            assistant_open: "### Response:\n",
            turn_close: "\n\n",
            stop_sequences: &["### Instruction:", "### Input:", "</s>"],
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "chatml" => Some(Self::chatml()),
            "llama3" => Some(Self::llama3()),
            "alpaca" => Some(Self::alpaca()),
            _ => None,
        }
    }

    /// Formats a system turn, a user turn and an open assistant turn.
    ///
    /// Pure and deterministic: identical inputs give byte-identical output.
    pub fn build(&self, system: &str, task: &str) -> String {
        let mut prompt = String::with_capacity(
            system.len()
                + task.len()
                + self.system_open.len()
                + self.user_open.len()
                + self.assistant_open.len()
                + 2 * self.turn_close.len(),
        );
        prompt.push_str(self.system_open);
        prompt.push_str(system);
        prompt.push_str(self.turn_close);
        prompt.push_str(self.user_open);
        prompt.push_str(task);
        prompt.push_str(self.turn_close);
        prompt.push_str(self.assistant_open);
        prompt
    }

    /// Cuts `text` at the first stop sequence, if any survived the backend.
    pub fn cut_at_stop<'a>(&self, text: &'a str) -> &'a str {
        let end = self
            .stop_sequences
            .iter()
            .filter_map(|stop| text.find(stop))
            .min()
            .unwrap_or(text.len());
        &text[..end]
    }
}

impl Default for PromptFormat {
    fn default() -> Self {
        Self::chatml()
    }
}
