//! Orchestration of the agent pipeline for one source.
//!
//! A C source goes through analysis and conversion, then a bounded
//! validate/assess/feedback loop until the model reports the conversion as
//! complete with no critical vulnerabilities. DBIO sources take a single
//! conversion pass. Acceptance is whatever the model says it is.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::agents::{
    AgentRuntime, CodeAnalysisAgent, ConversionAgent, DbioConversionAgent, FeedbackAgent,
    IntegrationAgent, IntegrationOutcome, SecurityAssessmentAgent, ValidationAgent,
};
use crate::core::stats::ConversionStats;
use crate::core::types::{
    AgentKind, ConversionContext, RelatedFile, SecurityReport, ValidationReport,
};
use crate::io::config::{ConverterConfig, OutputConfig, PipelineConfig};
use crate::io::inference::Inference;
use crate::io::model::{InferenceConfig, ModelClient};
use crate::io::prompt::PromptLibrary;
use crate::io::session_log::{SessionLog, SessionPaths, SessionSummary};

/// Why the refinement loop ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RefinementStop {
    /// Validation reported completeness and no critical vulnerabilities.
    Accepted,
    /// Every iteration ran without acceptance.
    MaxIterationsReached,
    /// An agent inside the loop failed; the loop stopped early.
    AgentFailed { agent: String, error: String },
    /// One-shot conversion without refinement (DBIO).
    SinglePass,
}

/// Result of a successful pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutcome {
    /// Final converted text (Java, or mapper XML for DBIO).
    pub output: String,
    /// Refinement iterations actually run.
    pub iterations: u32,
    pub processing_time: f64,
    /// `completeness_score` of the final validation, 0 when unavailable.
    pub validation_score: f64,
    pub final_validation: Option<ValidationReport>,
    pub security_assessment: Option<SecurityReport>,
    pub critical_vulnerabilities: Option<usize>,
    pub stop: RefinementStop,
    pub session_id: String,
    pub agent_trace: Vec<String>,
}

impl ConversionOutcome {
    /// The conversion was produced but never accepted ("quality issues").
    pub fn max_iterations_reached(&self) -> bool {
        matches!(
            self.stop,
            RefinementStop::MaxIterationsReached | RefinementStop::AgentFailed { .. }
        )
    }
}

/// A pipeline run that produced no output.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{agent} failed: {message}")]
pub struct PipelineError {
    pub agent: String,
    pub message: String,
    pub processing_time: f64,
    pub session_id: String,
    pub agent_trace: Vec<String>,
}

struct AgentFailure {
    kind: AgentKind,
    error: anyhow::Error,
}

impl AgentFailure {
    fn new(kind: AgentKind) -> impl FnOnce(anyhow::Error) -> Self {
        move |error| Self { kind, error }
    }
}

struct Refined {
    iterations: u32,
    stop: RefinementStop,
    validation: Option<ValidationReport>,
    security: Option<SecurityReport>,
}

/// Owns the model session state shared by every conversion in a process.
pub struct Orchestrator<C> {
    inference: Inference<C>,
    prompts: PromptLibrary,
    pipeline: PipelineConfig,
    output: OutputConfig,
    stats: ConversionStats,
}

impl<C: ModelClient> Orchestrator<C> {
    pub fn new(client: C, config: &ConverterConfig) -> Self {
        Self {
            inference: Inference::new(
                client,
                InferenceConfig::from(&config.model),
                config.pipeline.max_continuations,
            ),
            prompts: PromptLibrary::new(&config.prompts.java_package),
            pipeline: config.pipeline.clone(),
            output: config.output.clone(),
            stats: ConversionStats::default(),
        }
    }

    pub fn pipeline_config(&self) -> &PipelineConfig {
        &self.pipeline
    }

    pub fn output_config(&self) -> &OutputConfig {
        &self.output
    }

    pub fn stats(&self) -> &ConversionStats {
        &self.stats
    }

    /// Snapshot of the running statistics.
    pub fn get_conversion_stats(&self) -> ConversionStats {
        self.stats.clone()
    }

    /// Analyze, convert and refine `ctx` for at most `max_iterations` rounds.
    #[instrument(skip_all, fields(max_iterations = max_iterations))]
    pub fn execute_conversion_pipeline(
        &mut self,
        ctx: &mut ConversionContext,
        max_iterations: u32,
    ) -> Result<ConversionOutcome, PipelineError> {
        let started = Instant::now();
        let started_at = timestamp();
        let root = ctx
            .output_dir
            .clone()
            .unwrap_or_else(|| self.output.dir.clone());
        let (session_id, session) = self.open_session("conversion", &root);
        ctx.session_id = Some(session_id.clone());
        info!(%session_id, "starting conversion pipeline");

        let rt = AgentRuntime {
            inference: &self.inference,
            prompts: &self.prompts,
            session: session.as_ref(),
        };
        let refined = refine(&rt, ctx, max_iterations, self.pipeline.iteration_delay());

        let processing_time = started.elapsed().as_secs_f64();
        self.stats.record(refined.is_ok(), processing_time);
        let result = match refined {
            Ok(refined) => Ok(ConversionOutcome {
                output: ctx.java_code.clone().unwrap_or_default(),
                iterations: refined.iterations,
                processing_time,
                validation_score: refined
                    .validation
                    .as_ref()
                    .map_or(0.0, |report| report.completeness_score),
                critical_vulnerabilities: refined
                    .security
                    .as_ref()
                    .map(SecurityReport::critical_count),
                final_validation: refined.validation,
                security_assessment: refined.security,
                stop: refined.stop,
                session_id,
                agent_trace: ctx.agent_trace.clone(),
            }),
            Err(failure) => Err(PipelineError {
                agent: failure.kind.name().to_string(),
                message: format!("{:#}", failure.error),
                processing_time,
                session_id,
                agent_trace: ctx.agent_trace.clone(),
            }),
        };
        finish_session(session.as_ref(), ctx, &started_at, &result);
        result
    }

    /// Convert a SQL DBIO source to a MyBatis mapper in one pass.
    #[instrument(skip_all)]
    pub fn execute_dbio_conversion(
        &mut self,
        ctx: &mut ConversionContext,
    ) -> Result<ConversionOutcome, PipelineError> {
        let started = Instant::now();
        let started_at = timestamp();
        let root = ctx
            .output_dir
            .clone()
            .unwrap_or_else(|| self.output.dir.clone());
        let (session_id, session) = self.open_session("dbio_conversion", &root);
        ctx.session_id = Some(session_id.clone());
        info!(%session_id, "starting DBIO conversion");

        let rt = AgentRuntime {
            inference: &self.inference,
            prompts: &self.prompts,
            session: session.as_ref(),
        };
        let converted = DbioConversionAgent.run(&rt, ctx);

        let processing_time = started.elapsed().as_secs_f64();
        self.stats.record(converted.is_ok(), processing_time);
        let result = match converted {
            Ok(xml) => Ok(ConversionOutcome {
                output: xml,
                iterations: 1,
                processing_time,
                validation_score: 0.0,
                final_validation: None,
                security_assessment: None,
                critical_vulnerabilities: None,
                stop: RefinementStop::SinglePass,
                session_id,
                agent_trace: ctx.agent_trace.clone(),
            }),
            Err(error) => Err(PipelineError {
                agent: AgentKind::DbioConversion.name().to_string(),
                message: format!("{error:#}"),
                processing_time,
                session_id,
                agent_trace: ctx.agent_trace.clone(),
            }),
        };
        finish_session(session.as_ref(), ctx, &started_at, &result);
        result
    }

    /// Integrate already converted files into one application.
    ///
    /// The transcript is recorded under `output_dir`. Not counted in the
    /// conversion statistics.
    pub fn execute_integration(
        &self,
        related_files: Vec<RelatedFile>,
        output_dir: &Path,
    ) -> anyhow::Result<IntegrationOutcome> {
        let (session_id, session) = self.open_session("integration", output_dir);
        let mut ctx = ConversionContext {
            related_files,
            session_id: Some(session_id.clone()),
            output_dir: Some(output_dir.to_path_buf()),
            ..ConversionContext::default()
        };
        info!(%session_id, files = ctx.related_files.len(), "starting batch integration");

        let rt = AgentRuntime {
            inference: &self.inference,
            prompts: &self.prompts,
            session: session.as_ref(),
        };
        IntegrationAgent.run(&rt, &mut ctx)
    }

    fn next_session_id(&self, prefix: &str) -> String {
        format!(
            "{prefix}_{}_{:03}",
            Utc::now().format("%Y%m%d_%H%M%S"),
            self.stats.total_conversions + 1
        )
    }

    /// Allocate a session id and, when recording, its transcript directory
    /// under `root`. The returned id is the directory actually taken.
    fn open_session(&self, prefix: &str, root: &Path) -> (String, Option<SessionLog>) {
        let session_id = self.next_session_id(prefix);
        if !self.output.record_sessions {
            return (session_id, None);
        }
        match SessionLog::create(root, &session_id) {
            Ok(log) => (log.session_id().to_string(), Some(log)),
            Err(err) => {
                warn!(%session_id, error = %format!("{err:#}"), "session transcript disabled");
                (session_id, None)
            }
        }
    }
}

fn refine<C: ModelClient>(
    rt: &AgentRuntime<'_, C>,
    ctx: &mut ConversionContext,
    max_iterations: u32,
    delay: Duration,
) -> Result<Refined, AgentFailure> {
    CodeAnalysisAgent
        .run(rt, ctx)
        .map_err(AgentFailure::new(AgentKind::CodeAnalysis))?;
    ConversionAgent
        .run(rt, ctx)
        .map_err(AgentFailure::new(AgentKind::Conversion))?;

    let mut iterations = 0;
    let mut stop = RefinementStop::MaxIterationsReached;
    for iteration in 1..=max_iterations {
        iterations = iteration;
        info!(iteration, max_iterations, "starting validation iteration");

        let validation = match ValidationAgent.run(rt, ctx) {
            Ok(report) => report,
            Err(err) => {
                warn!(iteration, "validation failed; ending refinement");
                stop = failed(AgentKind::Validation, &err);
                break;
            }
        };
        let security = match SecurityAssessmentAgent.run(rt, ctx) {
            Ok(report) => Some(report),
            Err(_) => {
                warn!(iteration, "security assessment failed; continuing without security feedback");
                ctx.security = None;
                None
            }
        };

        let critical = security.as_ref().map_or(0, SecurityReport::critical_count);
        if validation.is_complete && critical == 0 {
            info!(iteration, "conversion accepted");
            if let Err(err) = IntegrationAgent.run(rt, ctx) {
                warn!(error = %format!("{err:#}"), "integration failed; keeping single-file conversion");
            }
            return Ok(Refined {
                iterations: iteration,
                stop: RefinementStop::Accepted,
                validation: Some(validation),
                security,
            });
        }

        if let Err(err) = FeedbackAgent.run(rt, ctx) {
            warn!(iteration, "feedback failed; ending refinement");
            stop = failed(AgentKind::Feedback, &err);
            break;
        }
        if iteration < max_iterations && !delay.is_zero() {
            thread::sleep(delay);
        }
    }

    info!(iterations, "refinement ended without acceptance; running final checks");
    let validation = ValidationAgent.run(rt, ctx).ok();
    let security = SecurityAssessmentAgent.run(rt, ctx).ok();
    Ok(Refined {
        iterations,
        stop,
        validation,
        security,
    })
}

fn failed(kind: AgentKind, err: &anyhow::Error) -> RefinementStop {
    RefinementStop::AgentFailed {
        agent: kind.name().to_string(),
        error: format!("{err:#}"),
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn finish_session(
    session: Option<&SessionLog>,
    ctx: &ConversionContext,
    started_at: &str,
    result: &Result<ConversionOutcome, PipelineError>,
) {
    let Some(session) = session else {
        return;
    };
    let (iterations, processing_time_secs, error) = match result {
        Ok(outcome) => (outcome.iterations, outcome.processing_time, None),
        Err(err) => (0, err.processing_time, Some(err.to_string())),
    };
    let summary = SessionSummary {
        session_id: ctx.session_id.as_deref().unwrap_or_default(),
        input_file: ctx.file_metadata.as_ref().map(|meta| meta.filename.as_str()),
        success: result.is_ok(),
        iterations,
        processing_time_secs,
        started_at,
        finished_at: timestamp(),
        error: error.as_deref(),
        agent_trace: &ctx.agent_trace,
    };
    if let Err(err) = session.write_summary(&summary) {
        warn!(
            dir = %session.paths().dir.display(),
            error = %format!("{err:#}"),
            "failed to write session summary"
        );
    }
}

/// Session transcript directory for a finished run, when one was recorded.
pub fn session_dir(output_dir: &Path, session_id: &str) -> Option<PathBuf> {
    Some(SessionPaths::new(output_dir, session_id).dir).filter(|dir| dir.is_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::build_metadata;
    use crate::test_support::{
        ScriptedModel, ScriptedReply, analysis_reply, sample_c_source, security_reply,
        test_config, validation_reply,
    };

    fn context() -> ConversionContext {
        let code = sample_c_source();
        ConversionContext::new(code, Some(build_metadata("calc_util.c", code)))
    }

    #[test]
    fn accepted_on_first_iteration() {
        let temp = tempfile::tempdir().expect("tempdir");
        let model = ScriptedModel::new(vec![
            analysis_reply(),
            ScriptedReply::text("class CalcUtil {}"),
            validation_reply(true, 0.95),
            security_reply(0),
        ]);
        let mut orchestrator = Orchestrator::new(&model, &test_config(temp.path()));
        let mut ctx = context();

        let outcome = orchestrator
            .execute_conversion_pipeline(&mut ctx, 3)
            .expect("pipeline");
        assert_eq!(outcome.stop, RefinementStop::Accepted);
        assert!(!outcome.max_iterations_reached());
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.output, "class CalcUtil {}");
        assert!((outcome.validation_score - 0.95).abs() < 1e-9);
        assert_eq!(outcome.critical_vulnerabilities, Some(0));
        assert!(outcome.session_id.starts_with("conversion_"));
        assert!(outcome.session_id.ends_with("_001"));
        assert_eq!(
            outcome.agent_trace.last().map(String::as_str),
            Some("integration_agent: integration_skipped")
        );
        assert_eq!(model.remaining(), 0);

        let stats = orchestrator.get_conversion_stats();
        assert_eq!(stats.total_conversions, 1);
        assert_eq!(stats.successful_conversions, 1);
    }

    #[test]
    fn critical_vulnerabilities_trigger_feedback() {
        let temp = tempfile::tempdir().expect("tempdir");
        let model = ScriptedModel::new(vec![
            analysis_reply(),
            ScriptedReply::text("class CalcUtil { char[] buf; }"),
            validation_reply(true, 0.9),
            security_reply(1),
            ScriptedReply::text("class CalcUtil { String buf; }"),
            validation_reply(true, 0.95),
            security_reply(0),
        ]);
        let mut orchestrator = Orchestrator::new(&model, &test_config(temp.path()));
        let mut ctx = context();

        let outcome = orchestrator
            .execute_conversion_pipeline(&mut ctx, 3)
            .expect("pipeline");
        assert_eq!(outcome.stop, RefinementStop::Accepted);
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.output, "class CalcUtil { String buf; }");
        assert_eq!(ctx.feedback_history.len(), 1);
    }

    #[test]
    fn critical_findings_survive_a_mis_shaped_risk_field() {
        let temp = tempfile::tempdir().expect("tempdir");
        let model = ScriptedModel::new(vec![
            analysis_reply(),
            ScriptedReply::text("class CalcUtil { String q = \"SELECT \" + id; }"),
            validation_reply(true, 0.95),
            ScriptedReply::text(
                r#"{"critical_vulnerabilities":[{"type":"sql injection"},{"type":"overflow"}],"security_risk_issues":"None identified"}"#,
            ),
            ScriptedReply::text("class CalcUtil { PreparedStatement q; }"),
            validation_reply(true, 0.95),
            security_reply(0),
        ]);
        let mut orchestrator = Orchestrator::new(&model, &test_config(temp.path()));
        let mut ctx = context();

        let outcome = orchestrator
            .execute_conversion_pipeline(&mut ctx, 3)
            .expect("pipeline");
        assert_eq!(outcome.stop, RefinementStop::Accepted);
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.output, "class CalcUtil { PreparedStatement q; }");
        assert_eq!(ctx.feedback_history.len(), 1);
        assert_eq!(model.remaining(), 0);
    }

    #[test]
    fn validation_with_string_issues_is_still_accepted() {
        let temp = tempfile::tempdir().expect("tempdir");
        let model = ScriptedModel::new(vec![
            analysis_reply(),
            ScriptedReply::text("class CalcUtil {}"),
            ScriptedReply::text(r#"{"is_complete": true, "completeness_score": 0.95, "issues": "none"}"#),
            security_reply(0),
        ]);
        let mut orchestrator = Orchestrator::new(&model, &test_config(temp.path()));
        let mut ctx = context();

        let outcome = orchestrator
            .execute_conversion_pipeline(&mut ctx, 1)
            .expect("pipeline");
        assert_eq!(outcome.stop, RefinementStop::Accepted);
        assert!((outcome.validation_score - 0.95).abs() < 1e-9);
        assert!(ctx.feedback_history.is_empty());
    }

    #[test]
    fn exhausting_iterations_runs_final_checks() {
        let temp = tempfile::tempdir().expect("tempdir");
        let model = ScriptedModel::new(vec![
            analysis_reply(),
            ScriptedReply::text("class V0 {}"),
            validation_reply(false, 0.3),
            security_reply(0),
            ScriptedReply::text("class V1 {}"),
            validation_reply(false, 0.4),
            security_reply(0),
            ScriptedReply::text("class V2 {}"),
            validation_reply(false, 0.6),
            security_reply(0),
        ]);
        let mut orchestrator = Orchestrator::new(&model, &test_config(temp.path()));
        let mut ctx = context();

        let outcome = orchestrator
            .execute_conversion_pipeline(&mut ctx, 2)
            .expect("pipeline");
        assert_eq!(outcome.stop, RefinementStop::MaxIterationsReached);
        assert!(outcome.max_iterations_reached());
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.output, "class V2 {}");
        assert!((outcome.validation_score - 0.6).abs() < 1e-9);
        assert_eq!(ctx.feedback_history.len(), 2);
        assert_eq!(model.remaining(), 0);
    }

    #[test]
    fn security_failure_does_not_block_acceptance() {
        let temp = tempfile::tempdir().expect("tempdir");
        let model = ScriptedModel::new(vec![
            analysis_reply(),
            ScriptedReply::text("class CalcUtil {}"),
            validation_reply(true, 1.0),
            ScriptedReply::error("throttled"),
        ]);
        let mut orchestrator = Orchestrator::new(&model, &test_config(temp.path()));
        let mut ctx = context();

        let outcome = orchestrator
            .execute_conversion_pipeline(&mut ctx, 3)
            .expect("pipeline");
        assert_eq!(outcome.stop, RefinementStop::Accepted);
        assert_eq!(outcome.security_assessment, None);
        assert_eq!(outcome.critical_vulnerabilities, None);
    }

    #[test]
    fn validation_failure_stops_loop_but_keeps_output() {
        let temp = tempfile::tempdir().expect("tempdir");
        let model = ScriptedModel::new(vec![
            analysis_reply(),
            ScriptedReply::text("class CalcUtil {}"),
            ScriptedReply::error("connection reset"),
            validation_reply(false, 0.2),
            security_reply(0),
        ]);
        let mut orchestrator = Orchestrator::new(&model, &test_config(temp.path()));
        let mut ctx = context();

        let outcome = orchestrator
            .execute_conversion_pipeline(&mut ctx, 3)
            .expect("pipeline");
        match &outcome.stop {
            RefinementStop::AgentFailed { agent, error } => {
                assert_eq!(agent, "validation_agent");
                assert!(error.contains("connection reset"));
            }
            other => panic!("unexpected stop: {other:?}"),
        }
        assert!(outcome.max_iterations_reached());
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.output, "class CalcUtil {}");
    }

    #[test]
    fn conversion_failure_is_a_pipeline_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let model = ScriptedModel::new(vec![analysis_reply(), ScriptedReply::error("HTTP 500")]);
        let mut orchestrator = Orchestrator::new(&model, &test_config(temp.path()));
        let mut ctx = context();

        let err = orchestrator
            .execute_conversion_pipeline(&mut ctx, 3)
            .unwrap_err();
        assert_eq!(err.agent, "conversion_agent");
        assert!(err.message.contains("HTTP 500"));
        assert!(err.to_string().starts_with("conversion_agent failed: "));

        let stats = orchestrator.stats();
        assert_eq!(stats.failed_conversions, 1);
        assert_eq!(stats.successful_conversions, 0);
    }

    #[test]
    fn dbio_conversion_is_single_pass() {
        let temp = tempfile::tempdir().expect("tempdir");
        let model = ScriptedModel::new(vec![ScriptedReply::text("<mapper/>")]);
        let mut orchestrator = Orchestrator::new(&model, &test_config(temp.path()));
        let mut ctx = ConversionContext::new("EXEC SQL SELECT 1;", None);

        let outcome = orchestrator
            .execute_dbio_conversion(&mut ctx)
            .expect("dbio");
        assert_eq!(outcome.stop, RefinementStop::SinglePass);
        assert_eq!(outcome.output, "<mapper/>");
        assert!(outcome.session_id.starts_with("dbio_conversion_"));
        assert_eq!(orchestrator.stats().total_conversions, 1);
    }

    #[test]
    fn sessions_record_every_call_and_summary() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut config = test_config(temp.path());
        config.output.record_sessions = true;
        let model = ScriptedModel::new(vec![
            analysis_reply(),
            ScriptedReply::text("class CalcUtil {}"),
            validation_reply(true, 0.9),
            security_reply(0),
        ]);
        let mut orchestrator = Orchestrator::new(&model, &config);
        let mut ctx = context();

        let outcome = orchestrator
            .execute_conversion_pipeline(&mut ctx, 3)
            .expect("pipeline");
        let dir = session_dir(temp.path(), &outcome.session_id).expect("session dir");
        assert!(dir.join("01-code_analysis_agent.prompt.md").is_file());
        assert!(dir.join("02-conversion_agent.response.md").is_file());
        assert!(dir.join("04-security_assessment_agent.response.md").is_file());

        let summary: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.join("session.json")).expect("summary"),
        )
        .expect("parse");
        assert_eq!(summary["success"], true);
        assert_eq!(summary["input_file"], "calc_util.c");
        assert_eq!(summary["iterations"], 1);
    }

    #[test]
    fn separate_runs_never_share_a_session_dir() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut config = test_config(temp.path());
        config.output.record_sessions = true;
        let script = || {
            vec![
                analysis_reply(),
                ScriptedReply::text("class CalcUtil {}"),
                validation_reply(true, 0.9),
                security_reply(0),
            ]
        };
        let first_model = ScriptedModel::new(script());
        let second_model = ScriptedModel::new(script());
        let mut first = Orchestrator::new(&first_model, &config);
        let mut second = Orchestrator::new(&second_model, &config);

        let a = first
            .execute_conversion_pipeline(&mut context(), 3)
            .expect("first run");
        let b = second
            .execute_conversion_pipeline(&mut context(), 3)
            .expect("second run");
        assert_ne!(a.session_id, b.session_id);
        for id in [&a.session_id, &b.session_id] {
            let dir = session_dir(temp.path(), id).expect("session dir");
            assert!(dir.join("session.json").is_file());
        }
    }

    #[test]
    fn batch_integration_sends_every_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let model = ScriptedModel::new(vec![ScriptedReply::text("#filename: A.java\nclass A {}")]);
        let orchestrator = Orchestrator::new(&model, &test_config(temp.path()));
        let files = vec![
            RelatedFile {
                source: "a.c".to_string(),
                filename: "A.java".to_string(),
                java_code: "class A {}".to_string(),
                dependencies: vec!["#include \"b.h\"".to_string()],
            },
            RelatedFile {
                source: "b.c".to_string(),
                filename: "B.java".to_string(),
                java_code: "class B {}".to_string(),
                dependencies: Vec::new(),
            },
        ];

        let outcome = orchestrator
            .execute_integration(files, temp.path())
            .expect("integrate");
        assert_eq!(
            outcome,
            IntegrationOutcome::Integrated("#filename: A.java\nclass A {}".to_string())
        );
        let prompt = model.requests()[0].messages[0].text();
        assert!(prompt.contains("#filename: B.java\nclass B {}"));
        assert_eq!(orchestrator.stats().total_conversions, 0);
    }
}
