//! DBIO conversion agent: SQL DBIO C source to a MyBatis mapper XML.

use anyhow::Result;
use tracing::info;

use super::{AgentRuntime, Stage, traced};
use crate::core::types::{AgentKind, ConversionContext};
use crate::io::inference::CallMode;
use crate::io::model::ModelClient;

const KIND: AgentKind = AgentKind::DbioConversion;
const STAGE: Stage = Stage {
    started: "dbio_conversion_started",
    completed: "dbio_conversion_completed",
    failed: "dbio_conversion_failed",
};

#[derive(Debug, Clone, Copy, Default)]
pub struct DbioConversionAgent;

impl DbioConversionAgent {
    /// Convert `ctx.c_code`; the mapper XML is stored in `ctx.java_code`.
    pub fn run<C: ModelClient>(
        &self,
        rt: &AgentRuntime<'_, C>,
        ctx: &mut ConversionContext,
    ) -> Result<String> {
        info!(agent = KIND.name(), "starting DBIO to MyBatis conversion");
        traced(ctx, KIND, &STAGE, |ctx| {
            let prompt = rt.prompts.dbio_conversion(&ctx.c_code)?;
            let xml = rt.call(KIND, &prompt, CallMode::Stitched)?;
            ctx.java_code = Some(xml.clone());
            Ok(xml)
        })
    }
}
