//! Directory processing: convert every source under a directory.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::agents::IntegrationOutcome;
use crate::convert::FileReport;
use crate::core::extract::{NamedFile, split_named_files};
use crate::core::types::{FileKind, RelatedFile};
use crate::io::model::ModelClient;
use crate::io::sources::discover_sources;
use crate::pipeline::Orchestrator;

/// Batch summary written next to the converted files.
pub const REPORT_FILE: &str = "conversion_report.json";
/// Subdirectory of the output directory for integrated files.
pub const INTEGRATED_DIR: &str = "integrated";
/// Used when the integration reply has no `#filename:` headers.
pub const INTEGRATED_FALLBACK_FILE: &str = "IntegratedApplication.java";
pub const NO_FILES_MESSAGE: &str = "No C files found in directory";

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub max_iterations: u32,
    /// Run the integration agent over the converted Java files afterwards.
    pub integrate: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchFileResult {
    pub filename: String,
    pub success: bool,
    pub processing_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
    pub max_iterations_reached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IntegrationReport {
    Skipped { reason: String },
    Integrated { files: Vec<PathBuf> },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub total_files: usize,
    pub successful_conversions: usize,
    pub failed_conversions: usize,
    pub total_processing_time: f64,
    pub file_results: Vec<BatchFileResult>,
    pub input_directory: PathBuf,
    pub output_directory: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integration: Option<IntegrationReport>,
}

impl BatchReport {
    /// Converted files whose refinement ended without acceptance.
    pub fn quality_issues(&self) -> usize {
        self.file_results
            .iter()
            .filter(|file| file.success && file.max_iterations_reached)
            .count()
    }
}

impl<C: ModelClient> Orchestrator<C> {
    /// Convert every matching source under `input_dir`, one file at a time.
    ///
    /// A missing directory is an error. Per-file failures are recorded in the
    /// report, which is also written to `<output_dir>/conversion_report.json`.
    pub fn process_directory(
        &mut self,
        input_dir: &Path,
        output_dir: &Path,
        options: &BatchOptions,
    ) -> Result<BatchReport> {
        let started = Instant::now();
        let extensions = self.pipeline_config().source_extensions.clone();
        let sources = discover_sources(input_dir, &extensions)?;
        if sources.is_empty() {
            info!(dir = %input_dir.display(), "no sources found");
            return Ok(BatchReport {
                success: true,
                message: Some(NO_FILES_MESSAGE.to_string()),
                total_files: 0,
                successful_conversions: 0,
                failed_conversions: 0,
                total_processing_time: started.elapsed().as_secs_f64(),
                file_results: Vec::new(),
                input_directory: input_dir.to_path_buf(),
                output_directory: output_dir.to_path_buf(),
                integration: None,
            });
        }
        info!(count = sources.len(), dir = %input_dir.display(), "processing directory");

        let mut file_results = Vec::with_capacity(sources.len());
        let mut related = Vec::new();
        let mut written = HashSet::new();
        for source in &sources {
            let report = self.convert_single_file(source, output_dir, options.max_iterations);
            let collided = report
                .output_file
                .as_ref()
                .filter(|output_file| !written.insert((*output_file).clone()));
            if let Some(output_file) = collided {
                warn!(
                    source = %source.display(),
                    output = %output_file.display(),
                    "output file overwritten by a later source"
                );
            }
            if let Some(file) = related_file(&report) {
                related.push(file);
            }
            file_results.push(file_result(source, report));
        }

        let successful_conversions = file_results.iter().filter(|r| r.success).count();
        let failed_conversions = file_results.len() - successful_conversions;
        info!(
            successful = successful_conversions,
            total = file_results.len(),
            "batch processing completed"
        );

        let integration = options
            .integrate
            .then(|| self.integrate_batch(related, output_dir));

        let report = BatchReport {
            success: true,
            message: None,
            total_files: file_results.len(),
            successful_conversions,
            failed_conversions,
            total_processing_time: started.elapsed().as_secs_f64(),
            file_results,
            input_directory: input_dir.to_path_buf(),
            output_directory: output_dir.to_path_buf(),
            integration,
        };
        write_report(output_dir, &report)?;
        Ok(report)
    }

    fn integrate_batch(&self, related: Vec<RelatedFile>, output_dir: &Path) -> IntegrationReport {
        if related.len() < 2 {
            return IntegrationReport::Skipped {
                reason: format!("{} converted Java file(s); need at least 2", related.len()),
            };
        }
        let integrated = match self.execute_integration(related, output_dir) {
            Ok(IntegrationOutcome::Integrated(text)) => text,
            Ok(IntegrationOutcome::Skipped) => {
                return IntegrationReport::Skipped {
                    reason: "no related files".to_string(),
                };
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "batch integration failed");
                return IntegrationReport::Failed {
                    error: format!("{err:#}"),
                };
            }
        };
        match write_integrated(&integrated, &output_dir.join(INTEGRATED_DIR)) {
            Ok(files) => IntegrationReport::Integrated { files },
            Err(err) => IntegrationReport::Failed {
                error: format!("{err:#}"),
            },
        }
    }
}

fn related_file(report: &FileReport) -> Option<RelatedFile> {
    let meta = report.file_metadata.as_ref()?;
    if !report.success || meta.kind != FileKind::C {
        return None;
    }
    let filename = report.output_file.as_ref()?.file_name()?;
    Some(RelatedFile {
        source: meta.filename.clone(),
        filename: filename.to_string_lossy().into_owned(),
        java_code: report.converted.clone()?,
        dependencies: meta.dependencies.clone(),
    })
}

fn file_result(source: &Path, report: FileReport) -> BatchFileResult {
    BatchFileResult {
        filename: source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        success: report.success,
        processing_time: report.processing_time,
        output_file: report.output_file,
        max_iterations_reached: report.max_iterations_reached,
        error: report.error,
    }
}

/// Split an integration reply on `#filename:` headers into `dir`.
pub fn write_integrated(text: &str, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let mut files = split_named_files(text);
    if files.is_empty() {
        files.push(NamedFile {
            name: INTEGRATED_FALLBACK_FILE.to_string(),
            contents: text.to_string(),
        });
    }
    let mut paths = Vec::with_capacity(files.len());
    for file in files {
        let path = dir.join(&file.name);
        fs::write(&path, &file.contents).with_context(|| format!("write {}", path.display()))?;
        paths.push(path);
    }
    Ok(paths)
}

fn write_report(output_dir: &Path, report: &BatchReport) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("create output dir {}", output_dir.display()))?;
    let path = output_dir.join(REPORT_FILE);
    let mut buf = serde_json::to_string_pretty(report).context("serialize batch report")?;
    buf.push('\n');
    fs::write(&path, buf).with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        ScriptedModel, ScriptedReply, analysis_reply, sample_c_source, sample_dbio_source,
        security_reply, source_tree, test_config, validation_reply,
    };

    fn accepted(java: &str) -> Vec<ScriptedReply> {
        vec![
            analysis_reply(),
            ScriptedReply::text(java),
            validation_reply(true, 0.9),
            security_reply(0),
        ]
    }

    #[test]
    fn missing_directory_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let model = ScriptedModel::new(Vec::new());
        let mut orchestrator = Orchestrator::new(&model, &test_config(temp.path()));
        let options = BatchOptions {
            max_iterations: 3,
            integrate: false,
        };

        let err = orchestrator
            .process_directory(&temp.path().join("missing"), temp.path(), &options)
            .unwrap_err();
        assert!(err.to_string().contains("input directory not found"));
    }

    #[test]
    fn empty_directory_reports_no_files() {
        let src = source_tree(&[("README.md", "# docs")]);
        let out = tempfile::tempdir().expect("tempdir");
        let model = ScriptedModel::new(Vec::new());
        let mut orchestrator = Orchestrator::new(&model, &test_config(out.path()));
        let options = BatchOptions {
            max_iterations: 3,
            integrate: false,
        };

        let report = orchestrator
            .process_directory(src.path(), out.path(), &options)
            .expect("process");
        assert!(report.success);
        assert_eq!(report.message.as_deref(), Some(NO_FILES_MESSAGE));
        assert_eq!(report.total_files, 0);
        assert!(!out.path().join(REPORT_FILE).exists());
    }

    #[test]
    fn converts_sequentially_and_writes_report() {
        let src = source_tree(&[
            ("a_util.c", sample_c_source()),
            ("db/cust_dbio.c", sample_dbio_source()),
            ("z_main.c", "int main(void) { return 0; }"),
        ]);
        let out = tempfile::tempdir().expect("tempdir");
        let mut script = accepted("class AUtil {}");
        script.push(ScriptedReply::text("<mapper/>"));
        script.push(ScriptedReply::error("model unavailable"));
        let model = ScriptedModel::new(script);
        let mut orchestrator = Orchestrator::new(&model, &test_config(out.path()));
        let options = BatchOptions {
            max_iterations: 3,
            integrate: false,
        };

        let report = orchestrator
            .process_directory(src.path(), out.path(), &options)
            .expect("process");
        assert_eq!(report.total_files, 3);
        assert_eq!(report.successful_conversions, 2);
        assert_eq!(report.failed_conversions, 1);
        let names: Vec<&str> = report
            .file_results
            .iter()
            .map(|r| r.filename.as_str())
            .collect();
        assert_eq!(names, vec!["a_util.c", "cust_dbio.c", "z_main.c"]);
        assert!(out.path().join("AUtil.java").is_file());
        assert!(out.path().join("cust_dbioMapper.xml").is_file());
        assert!(report.file_results[2].error.is_some());

        let raw = fs::read_to_string(out.path().join(REPORT_FILE)).expect("report");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("parse");
        assert_eq!(value["total_files"], 3);
        assert_eq!(value["file_results"][1]["filename"], "cust_dbio.c");
        assert_eq!(orchestrator.stats().total_conversions, 3);
    }

    #[test]
    fn integrate_splits_reply_into_named_files() {
        let src = source_tree(&[
            ("cust.c", "int cust_id;"),
            ("order_svc.c", "#include \"cust.h\"\nint order_id;"),
        ]);
        let out = tempfile::tempdir().expect("tempdir");
        let mut script = accepted("class Cust {}");
        script.extend(accepted("class OrderSvc {}"));
        script.push(ScriptedReply::text(
            "#filename: Cust.java\n<java>\nclass Cust {}\n</java>\n#filename: OrderSvc.java\nclass OrderSvc { Cust c; }",
        ));
        let model = ScriptedModel::new(script);
        let mut orchestrator = Orchestrator::new(&model, &test_config(out.path()));
        let options = BatchOptions {
            max_iterations: 3,
            integrate: true,
        };

        let report = orchestrator
            .process_directory(src.path(), out.path(), &options)
            .expect("process");
        let integrated = out.path().join(INTEGRATED_DIR);
        assert_eq!(
            report.integration,
            Some(IntegrationReport::Integrated {
                files: vec![integrated.join("Cust.java"), integrated.join("OrderSvc.java")],
            })
        );
        assert_eq!(
            fs::read_to_string(integrated.join("Cust.java")).expect("read"),
            "class Cust {}\n"
        );
        let prompt = model.requests().last().expect("request").messages[0].text();
        assert!(prompt.contains("order_svc.c: #include \"cust.h\""));
    }

    #[test]
    fn integrate_needs_two_java_files() {
        let src = source_tree(&[("solo.c", "int solo;")]);
        let out = tempfile::tempdir().expect("tempdir");
        let model = ScriptedModel::new(accepted("class Solo {}"));
        let mut orchestrator = Orchestrator::new(&model, &test_config(out.path()));
        let options = BatchOptions {
            max_iterations: 3,
            integrate: true,
        };

        let report = orchestrator
            .process_directory(src.path(), out.path(), &options)
            .expect("process");
        assert!(matches!(
            report.integration,
            Some(IntegrationReport::Skipped { .. })
        ));
        assert_eq!(model.remaining(), 0);
    }

    #[test]
    fn integrated_reply_without_headers_uses_fallback_name() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = write_integrated("class App {}", temp.path()).expect("write");
        assert_eq!(paths, vec![temp.path().join(INTEGRATED_FALLBACK_FILE)]);
    }
}
