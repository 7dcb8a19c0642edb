//! Prompt-driven agents of the conversion pipeline.
//!
//! Each agent renders its prompt, makes one model call (possibly continued
//! past the token limit), interprets the reply and updates the shared
//! [`ConversionContext`]. Agents return errors; whether an error ends the
//! pipeline is decided by the orchestrator.

use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::core::types::{AgentKind, ConversionContext};
use crate::io::inference::{CallMode, Inference};
use crate::io::model::ModelClient;
use crate::io::prompt::PromptLibrary;
use crate::io::session_log::SessionLog;

pub mod analysis;
pub mod conversion;
pub mod dbio;
pub mod feedback;
pub mod integration;
pub mod security;
pub mod validation;

pub use analysis::CodeAnalysisAgent;
pub use conversion::ConversionAgent;
pub use dbio::DbioConversionAgent;
pub use feedback::FeedbackAgent;
pub use integration::{IntegrationAgent, IntegrationOutcome};
pub use security::SecurityAssessmentAgent;
pub use validation::ValidationAgent;

/// Shared handles every agent needs for one session.
pub struct AgentRuntime<'a, C> {
    pub inference: &'a Inference<C>,
    pub prompts: &'a PromptLibrary,
    pub session: Option<&'a SessionLog>,
}

impl<C: ModelClient> AgentRuntime<'_, C> {
    /// Call the model with the agent's system prompt and record the exchange.
    pub(crate) fn call(&self, kind: AgentKind, prompt: &str, mode: CallMode) -> Result<String> {
        let system = self.prompts.system(kind)?;
        let started = Instant::now();
        let reply = self
            .inference
            .run(prompt, &system, mode)
            .with_context(|| format!("{} model call", kind.name()))?;
        info!(
            agent = kind.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            prompt_bytes = prompt.len(),
            reply_bytes = reply.len(),
            "agent call complete"
        );
        let recorded = self
            .session
            .map(|session| session.record_call(kind.name(), prompt, &reply));
        if let Some(Err(err)) = recorded {
            warn!(agent = kind.name(), error = %format!("{err:#}"), "failed to record session transcript");
        }
        Ok(reply)
    }
}

/// Trace actions for one agent step.
pub(crate) struct Stage {
    pub started: &'static str,
    pub completed: &'static str,
    pub failed: &'static str,
}

/// Run `body` between `started` and `completed`/`failed` trace entries.
pub(crate) fn traced<T>(
    ctx: &mut ConversionContext,
    kind: AgentKind,
    stage: &Stage,
    body: impl FnOnce(&mut ConversionContext) -> Result<T>,
) -> Result<T> {
    ctx.add_trace(kind.name(), stage.started);
    match body(ctx) {
        Ok(value) => {
            ctx.add_trace(kind.name(), stage.completed);
            Ok(value)
        }
        Err(err) => {
            error!(agent = kind.name(), error = %format!("{err:#}"), "agent failed");
            ctx.add_trace(kind.name(), &format!("{}: {err:#}", stage.failed));
            Err(err)
        }
    }
}
