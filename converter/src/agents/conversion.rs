//! Conversion agent: first Java/Spring rendition of the C source.

use anyhow::Result;
use tracing::info;

use super::{AgentRuntime, Stage, traced};
use crate::core::types::{AgentKind, ConversionContext};
use crate::io::inference::CallMode;
use crate::io::model::ModelClient;

const KIND: AgentKind = AgentKind::Conversion;
const STAGE: Stage = Stage {
    started: "conversion_started",
    completed: "conversion_completed",
    failed: "conversion_failed",
};

#[derive(Debug, Clone, Copy, Default)]
pub struct ConversionAgent;

impl ConversionAgent {
    /// Convert `ctx.c_code` and store the result in `ctx.java_code`.
    pub fn run<C: ModelClient>(
        &self,
        rt: &AgentRuntime<'_, C>,
        ctx: &mut ConversionContext,
    ) -> Result<String> {
        info!(agent = KIND.name(), "starting C to Java conversion");
        traced(ctx, KIND, &STAGE, |ctx| {
            let prompt = rt.prompts.conversion(&ctx.c_code)?;
            let java_code = rt.call(KIND, &prompt, CallMode::Stitched)?;
            ctx.java_code = Some(java_code.clone());
            Ok(java_code)
        })
    }
}
