//! File-level conversion: read a source, run the matching pipeline, write
//! the converted file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{error, info};

use crate::core::extract::extract_code;
use crate::core::metadata::build_metadata;
use crate::core::naming::output_file_name;
use crate::core::types::{ConversionContext, FileKind, FileMetadata};
use crate::io::model::ModelClient;
use crate::pipeline::{Orchestrator, PipelineError, RefinementStop};

/// File name used by [`Orchestrator::convert_from_code_string`] by default.
pub const DEFAULT_CODE_FILENAME: &str = "code.c";

/// Outcome of converting one file, success or not.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub success: bool,
    pub input_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
    pub feedback_iterations: u32,
    pub processing_time: f64,
    pub validation_score: f64,
    pub max_iterations_reached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<RefinementStop>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critical_vulnerabilities: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_metadata: Option<FileMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub agent_trace: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Text written to `output_file`.
    #[serde(skip)]
    pub converted: Option<String>,
}

impl FileReport {
    fn failed(input_file: &str, error: String, processing_time: f64) -> Self {
        Self {
            success: false,
            input_file: input_file.to_string(),
            output_file: None,
            feedback_iterations: 0,
            processing_time,
            validation_score: 0.0,
            max_iterations_reached: false,
            stop: None,
            critical_vulnerabilities: None,
            file_metadata: None,
            session_id: None,
            agent_trace: Vec::new(),
            error: Some(error),
            converted: None,
        }
    }

    fn pipeline_failed(input_file: &str, meta: FileMetadata, err: PipelineError) -> Self {
        Self {
            file_metadata: Some(meta),
            session_id: Some(err.session_id.clone()),
            agent_trace: err.agent_trace.clone(),
            ..Self::failed(input_file, err.to_string(), err.processing_time)
        }
    }
}

impl<C: ModelClient> Orchestrator<C> {
    /// Convert the file at `input` into `output_dir`.
    ///
    /// Session transcripts, when recorded, go under `output_dir` as well.
    /// Failures (missing input, model errors, write errors) are reported in
    /// the returned [`FileReport`] rather than as `Err`.
    pub fn convert_single_file(
        &mut self,
        input: &Path,
        output_dir: &Path,
        max_iterations: u32,
    ) -> FileReport {
        let input_file = input.display().to_string();
        if !input.is_file() {
            return FileReport::failed(
                &input_file,
                format!("Input file not found: {input_file}"),
                0.0,
            );
        }
        let code = match fs::read_to_string(input)
            .with_context(|| format!("read {}", input.display()))
        {
            Ok(code) => code,
            Err(err) => return FileReport::failed(&input_file, format!("{err:#}"), 0.0),
        };
        let filename = input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| input_file.clone());
        self.convert_source(&code, &filename, &input_file, output_dir, max_iterations)
    }

    /// DBIO sources never refine, so this is a single-iteration conversion.
    pub fn convert_dbio_file(&mut self, input: &Path, output_dir: &Path) -> FileReport {
        self.convert_single_file(input, output_dir, 1)
    }

    /// Convert in-memory source as if it had been read from `filename`.
    pub fn convert_from_code_string(
        &mut self,
        code: &str,
        filename: &str,
        output_dir: &Path,
    ) -> FileReport {
        let max_iterations = self.pipeline_config().max_iterations;
        self.convert_source(code, filename, filename, output_dir, max_iterations)
    }

    fn convert_source(
        &mut self,
        code: &str,
        filename: &str,
        input_file: &str,
        output_dir: &Path,
        max_iterations: u32,
    ) -> FileReport {
        let meta = build_metadata(filename, code);
        info!(
            file = filename,
            kind = meta.kind.as_str(),
            complexity = meta.complexity.as_str(),
            lines = meta.line_count,
            "converting file"
        );
        let mut ctx = ConversionContext::new(code, Some(meta.clone()));
        ctx.output_dir = Some(output_dir.to_path_buf());
        let result = match meta.kind {
            FileKind::Dbio => self.execute_dbio_conversion(&mut ctx),
            FileKind::C => self.execute_conversion_pipeline(&mut ctx, max_iterations),
        };
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(file = filename, error = %err, "conversion failed");
                return FileReport::pipeline_failed(input_file, meta, err);
            }
        };

        let written = write_output(
            &outcome.output,
            filename,
            meta.kind,
            output_dir,
            self.output_config().extract_code,
        );
        let (output_file, converted) = match written {
            Ok(written) => written,
            Err(err) => {
                error!(file = filename, error = %format!("{err:#}"), "failed to write output");
                return FileReport {
                    file_metadata: Some(meta),
                    session_id: Some(outcome.session_id),
                    agent_trace: outcome.agent_trace,
                    ..FileReport::failed(input_file, format!("{err:#}"), outcome.processing_time)
                };
            }
        };
        info!(
            file = filename,
            output = %output_file.display(),
            iterations = outcome.iterations,
            "conversion successful"
        );

        FileReport {
            success: true,
            input_file: input_file.to_string(),
            output_file: Some(output_file),
            feedback_iterations: outcome.iterations,
            processing_time: outcome.processing_time,
            validation_score: outcome.validation_score,
            max_iterations_reached: outcome.max_iterations_reached(),
            critical_vulnerabilities: outcome.critical_vulnerabilities,
            stop: Some(outcome.stop),
            file_metadata: Some(meta),
            session_id: Some(outcome.session_id),
            agent_trace: outcome.agent_trace,
            error: None,
            converted: Some(converted),
        }
    }
}

/// Write the converted text for `filename` into `output_dir`.
///
/// Returns the written path and contents.
pub fn write_output(
    text: &str,
    filename: &str,
    kind: FileKind,
    output_dir: &Path,
    extract: bool,
) -> Result<(PathBuf, String)> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("create output dir {}", output_dir.display()))?;
    let path = output_dir.join(output_file_name(Path::new(filename), kind));
    let contents = if extract {
        let tag = match kind {
            FileKind::C => "java",
            FileKind::Dbio => "xml",
        };
        extract_code(text, tag)
    } else {
        text.to_string()
    };
    fs::write(&path, &contents).with_context(|| format!("write {}", path.display()))?;
    Ok((path, contents))
}
