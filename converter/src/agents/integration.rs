//! Integration agent: merges several converted Java files into one
//! consistent Spring application.

use std::path::Path;

use anyhow::Result;
use tracing::info;

use super::{AgentRuntime, Stage, traced};
use crate::core::naming::output_file_name;
use crate::core::types::{AgentKind, ConversionContext, FileKind};
use crate::io::inference::CallMode;
use crate::io::model::ModelClient;
use crate::io::prompt::IntegrationFile;

const KIND: AgentKind = AgentKind::Integration;
const STAGE: Stage = Stage {
    started: "integration_started",
    completed: "integration_completed",
    failed: "integration_failed",
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrationOutcome {
    /// Nothing to integrate with; the context is left untouched.
    Skipped,
    Integrated(String),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IntegrationAgent;

impl IntegrationAgent {
    /// Integrate the current conversion with `ctx.related_files`.
    ///
    /// The integrated output is returned, not stored: `ctx.java_code` keeps
    /// the single-file conversion.
    pub fn run<C: ModelClient>(
        &self,
        rt: &AgentRuntime<'_, C>,
        ctx: &mut ConversionContext,
    ) -> Result<IntegrationOutcome> {
        if ctx.related_files.is_empty() {
            ctx.add_trace(KIND.name(), "integration_skipped");
            return Ok(IntegrationOutcome::Skipped);
        }
        info!(
            agent = KIND.name(),
            related = ctx.related_files.len(),
            "integrating converted files"
        );
        traced(ctx, KIND, &STAGE, |ctx| {
            let files = integration_files(ctx);
            let prompt = rt.prompts.integration(&files)?;
            let integrated = rt.call(KIND, &prompt, CallMode::Stitched)?;
            Ok(IntegrationOutcome::Integrated(integrated))
        })
    }
}

fn integration_files(ctx: &ConversionContext) -> Vec<IntegrationFile> {
    let primary = ctx
        .java_code
        .as_ref()
        .zip(ctx.file_metadata.as_ref())
        .map(|(java_code, meta)| IntegrationFile {
            filename: output_file_name(Path::new(&meta.filename), FileKind::C),
            source: meta.filename.clone(),
            java_code: java_code.clone(),
            dependencies: meta.dependencies.clone(),
        });
    primary
        .into_iter()
        .chain(ctx.related_files.iter().map(|file| IntegrationFile {
            filename: file.filename.clone(),
            source: file.source.clone(),
            java_code: file.java_code.clone(),
            dependencies: file.dependencies.clone(),
        }))
        .collect()
}
