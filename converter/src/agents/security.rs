//! Security assessment agent: vulnerabilities in the C source and the Java output.

use anyhow::{Result, anyhow};
use tracing::{info, warn};

use super::{AgentRuntime, Stage, traced};
use crate::core::extract::parse_embedded_json;
use crate::core::types::{AgentKind, ConversionContext, SecurityReport};
use crate::io::inference::CallMode;
use crate::io::model::ModelClient;

const KIND: AgentKind = AgentKind::SecurityAssessment;
const STAGE: Stage = Stage {
    started: "security_assessment_started",
    completed: "security_assessment_completed",
    failed: "security_assessment_failed",
};

#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityAssessmentAgent;

impl SecurityAssessmentAgent {
    pub fn run<C: ModelClient>(
        &self,
        rt: &AgentRuntime<'_, C>,
        ctx: &mut ConversionContext,
    ) -> Result<SecurityReport> {
        info!(agent = KIND.name(), "starting security assessment");
        traced(ctx, KIND, &STAGE, |ctx| {
            let java_code = ctx
                .java_code
                .as_deref()
                .ok_or_else(|| anyhow!("no Java code available for security assessment"))?;
            let prompt = rt.prompts.security_assessment(&ctx.c_code, java_code)?;
            let reply = rt.call(KIND, &prompt, CallMode::Single)?;
            let report = parse_embedded_json::<SecurityReport>(&reply).unwrap_or_else(|err| {
                warn!(agent = KIND.name(), error = %format!("{err:#}"), "security reply is not JSON; using fallback");
                SecurityReport::parse_failed(&reply)
            });
            info!(
                critical = report.critical_count(),
                risk_issues = report.risk_count(),
                "security assessment completed"
            );
            ctx.security = Some(report.clone());
            Ok(report)
        })
    }
}
