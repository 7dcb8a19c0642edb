//! Feedback agent: rewrites the Java output to address validation and
//! security findings.

use anyhow::{Context, Result, anyhow};
use tracing::info;

use super::{AgentRuntime, Stage, traced};
use crate::core::types::{AgentKind, ConversionContext, FeedbackEntry};
use crate::io::inference::CallMode;
use crate::io::model::ModelClient;
use crate::io::prompt::FeedbackInputs;

const KIND: AgentKind = AgentKind::Feedback;
const STAGE: Stage = Stage {
    started: "feedback_started",
    completed: "feedback_applied",
    failed: "feedback_failed",
};

#[derive(Debug, Clone, Copy, Default)]
pub struct FeedbackAgent;

impl FeedbackAgent {
    /// Produce an improved conversion and make it the current `java_code`.
    ///
    /// Requires a validation report; the security report is optional and is
    /// sent as an empty section when absent.
    pub fn run<C: ModelClient>(
        &self,
        rt: &AgentRuntime<'_, C>,
        ctx: &mut ConversionContext,
    ) -> Result<String> {
        info!(agent = KIND.name(), round = ctx.feedback_history.len() + 1, "applying feedback");
        traced(ctx, KIND, &STAGE, |ctx| {
            let java_code = ctx
                .java_code
                .as_deref()
                .ok_or_else(|| anyhow!("no Java code available for feedback"))?;
            let validation = ctx
                .validation
                .as_ref()
                .ok_or_else(|| anyhow!("no validation report available for feedback"))?;
            let validation_feedback =
                serde_json::to_string_pretty(validation).context("serialize validation report")?;
            let security_feedback = match &ctx.security {
                Some(security) => {
                    serde_json::to_string_pretty(security).context("serialize security report")?
                }
                None => String::new(),
            };

            let prompt = rt.prompts.feedback(&FeedbackInputs {
                c_code: &ctx.c_code,
                java_code,
                validation_feedback: &validation_feedback,
                security_feedback: &security_feedback,
            })?;
            let improved = rt.call(KIND, &prompt, CallMode::Stitched)?;

            let entry = FeedbackEntry {
                iteration: ctx.feedback_history.len() as u32 + 1,
                original_issues: validation.open_issues(),
                improved_code: improved.clone(),
            };
            ctx.feedback_history.push(entry);
            ctx.java_code = Some(improved.clone());
            Ok(improved)
        })
    }
}
