//! Code analysis agent: structured overview of the C source before conversion.

use anyhow::Result;
use tracing::{info, warn};

use super::{AgentRuntime, Stage, traced};
use crate::core::extract::parse_embedded_json;
use crate::core::types::{AgentKind, AnalysisReport, ConversionContext};
use crate::io::inference::CallMode;
use crate::io::model::ModelClient;

const KIND: AgentKind = AgentKind::CodeAnalysis;
const STAGE: Stage = Stage {
    started: "analysis_started",
    completed: "analysis_completed",
    failed: "analysis_failed",
};

#[derive(Debug, Clone, Copy, Default)]
pub struct CodeAnalysisAgent;

impl CodeAnalysisAgent {
    pub fn run<C: ModelClient>(
        &self,
        rt: &AgentRuntime<'_, C>,
        ctx: &mut ConversionContext,
    ) -> Result<AnalysisReport> {
        info!(agent = KIND.name(), "starting C codebase analysis");
        traced(ctx, KIND, &STAGE, |ctx| {
            let prompt = rt.prompts.code_analysis(&ctx.c_code)?;
            let reply = rt.call(KIND, &prompt, CallMode::Single)?;
            let report = parse_embedded_json::<AnalysisReport>(&reply).unwrap_or_else(|err| {
                warn!(agent = KIND.name(), error = %format!("{err:#}"), "analysis reply is not JSON; using fallback");
                AnalysisReport::parse_failed(&reply)
            });
            info!(complexity = report.complexity(), "analysis completed");
            ctx.analysis = Some(report.clone());
            Ok(report)
        })
    }
}
