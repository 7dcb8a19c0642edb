//! Prompt-in, text-out inference on top of a [`ModelClient`].
//!
//! Handles the token-limit continuation protocol: a reply that stops on
//! `max_tokens` is continued with a fixed user prompt plus an assistant
//! prefill, and the chunks are stitched back together.

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::core::continuation::{CONTINUE_PROMPT, continuation_prefill, stitch_chunks};
use crate::io::model::{
    ConverseRequest, InferenceConfig, Message, ModelClient, StopReason, SystemBlock,
};

/// Whether a call may be continued past the token limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    /// One request; a truncated reply is returned as-is.
    Single,
    /// Continue on `max_tokens` and stitch the chunks.
    Stitched,
}

pub struct Inference<C> {
    client: C,
    config: InferenceConfig,
    max_continuations: u32,
}

impl<C: ModelClient> Inference<C> {
    pub fn new(client: C, config: InferenceConfig, max_continuations: u32) -> Self {
        Self {
            client,
            config,
            max_continuations,
        }
    }

    /// Send the conversation and return the assistant reply with its stop reason.
    pub fn generate(&self, system: &str, messages: &[Message]) -> Result<(Message, StopReason)> {
        let request = ConverseRequest {
            messages: messages.to_vec(),
            system: vec![SystemBlock {
                text: system.to_string(),
            }],
            inference_config: self.config,
        };
        let response = self.client.converse(&request)?;
        debug!(stop_reason = ?response.stop_reason, "model replied");
        Ok((response.output.message, response.stop_reason))
    }

    pub fn run(&self, prompt: &str, system: &str, mode: CallMode) -> Result<String> {
        match mode {
            CallMode::Single => self.simple(prompt, system),
            CallMode::Stitched => self.stitched(prompt, system),
        }
    }

    /// One request without continuation.
    pub fn simple(&self, prompt: &str, system: &str) -> Result<String> {
        let (reply, stop) = self.generate(system, &[Message::user(prompt)])?;
        if stop == StopReason::MaxTokens {
            warn!("reply truncated at the token limit; use a stitched call for long output");
        }
        Ok(reply.text())
    }

    /// Continue while the reply stops on `max_tokens`; returns every chunk.
    #[instrument(skip_all, fields(prompt_bytes = prompt.len()))]
    pub fn with_continuation(&self, prompt: &str, system: &str) -> Result<Vec<String>> {
        let mut messages = vec![Message::user(prompt)];
        let (mut reply, mut stop) = self.generate(system, &messages)?;
        let mut chunks = vec![reply.text()];

        let mut continuations = 0u32;
        while stop == StopReason::MaxTokens {
            if continuations >= self.max_continuations {
                warn!(
                    continuations,
                    "continuation limit reached; returning truncated output"
                );
                break;
            }
            continuations += 1;
            info!(continuations, "reply truncated, continuing generation");

            let prefill = continuation_prefill(&reply.text());
            messages.push(reply);
            messages.push(Message::user(CONTINUE_PROMPT));
            let prefilled = !prefill.is_empty();
            if prefilled {
                messages.push(Message::assistant(prefill));
            }

            (reply, stop) = self.generate(system, &messages)?;
            if prefilled {
                messages.pop();
            }
            chunks.push(reply.text());
        }
        Ok(chunks)
    }

    /// Continued reply stitched into one string.
    pub fn stitched(&self, prompt: &str, system: &str) -> Result<String> {
        let chunks = self.with_continuation(prompt, system)?;
        Ok(stitch_chunks(&chunks))
    }
}
