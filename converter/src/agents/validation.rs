//! Validation agent: the model's verdict on conversion completeness.

use anyhow::{Result, anyhow};
use tracing::{info, warn};

use super::{AgentRuntime, Stage, traced};
use crate::core::extract::parse_embedded_json;
use crate::core::types::{AgentKind, ConversionContext, ValidationReport};
use crate::io::inference::CallMode;
use crate::io::model::ModelClient;

const KIND: AgentKind = AgentKind::Validation;
const STAGE: Stage = Stage {
    started: "validation_started",
    completed: "validation_completed",
    failed: "validation_failed",
};

#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationAgent;

impl ValidationAgent {
    pub fn run<C: ModelClient>(
        &self,
        rt: &AgentRuntime<'_, C>,
        ctx: &mut ConversionContext,
    ) -> Result<ValidationReport> {
        info!(agent = KIND.name(), "starting conversion validation");
        traced(ctx, KIND, &STAGE, |ctx| {
            let java_code = ctx
                .java_code
                .as_deref()
                .ok_or_else(|| anyhow!("no Java code available for validation"))?;
            let prompt = rt.prompts.validation(&ctx.c_code, java_code)?;
            let reply = rt.call(KIND, &prompt, CallMode::Single)?;
            let report = parse_embedded_json::<ValidationReport>(&reply).unwrap_or_else(|err| {
                warn!(agent = KIND.name(), error = %format!("{err:#}"), "validation reply is not JSON; using fallback");
                ValidationReport::parse_failed(&reply)
            });
            info!(
                is_complete = report.is_complete,
                completeness_score = report.completeness_score,
                "validation completed"
            );
            ctx.validation = Some(report.clone());
            Ok(report)
        })
    }
}
