//! `converter` CLI.
//!
//! Converts legacy C sources to Java/Spring and SQL DBIO sources to MyBatis
//! mappers by driving a hosted model through a fixed set of agent prompts.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use converter::batch::{BatchOptions, BatchReport, IntegrationReport, REPORT_FILE};
use converter::convert::{DEFAULT_CODE_FILENAME, FileReport};
use converter::core::metadata::include_dependencies;
use converter::core::naming::output_file_name;
use converter::core::types::{AgentKind, FileKind};
use converter::exit_codes;
use converter::io::config::{ConverterConfig, DEFAULT_CONFIG_FILE, load_config, write_config};
use converter::io::model::BedrockClient;
use converter::io::prompt::{FeedbackInputs, IntegrationFile, PromptLibrary};
use converter::logging;
use converter::pipeline::Orchestrator;

#[derive(Parser)]
#[command(
    name = "converter",
    version,
    about = "Convert legacy C sources to Java/Spring through a hosted model"
)]
struct Cli {
    /// Config file; a missing file means built-in defaults.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert one C or DBIO source file.
    Convert {
        input: PathBuf,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Convert every `.c`/`.h` file under a directory.
    ConvertDir {
        input_dir: PathBuf,
        #[command(flatten)]
        run: RunArgs,
        /// Integrate the converted Java files into one application afterwards.
        #[arg(long)]
        integrate: bool,
    },
    /// Convert source read from stdin.
    ConvertStdin {
        /// Name used for file type detection and the output file name.
        #[arg(long, default_value = DEFAULT_CODE_FILENAME)]
        filename: String,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Render an agent prompt without calling the model.
    Prompt {
        #[arg(value_enum)]
        agent: PromptAgent,
        /// C (or DBIO) source file.
        file: PathBuf,
        /// Converted Java file, for agents that compare against it.
        #[arg(long)]
        java: Option<PathBuf>,
        /// Print the system prompt instead of the user prompt.
        #[arg(long)]
        system: bool,
    },
    /// Write the default config file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(clap::Args, Clone, Debug)]
struct RunArgs {
    /// Output directory (defaults to `output.dir` from config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
    /// Refinement iterations (defaults to `pipeline.max_iterations`).
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..))]
    max_iterations: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PromptAgent {
    CodeAnalysis,
    Conversion,
    Validation,
    SecurityAssessment,
    Feedback,
    Integration,
    DbioConversion,
}

impl From<PromptAgent> for AgentKind {
    fn from(agent: PromptAgent) -> Self {
        match agent {
            PromptAgent::CodeAnalysis => AgentKind::CodeAnalysis,
            PromptAgent::Conversion => AgentKind::Conversion,
            PromptAgent::Validation => AgentKind::Validation,
            PromptAgent::SecurityAssessment => AgentKind::SecurityAssessment,
            PromptAgent::Feedback => AgentKind::Feedback,
            PromptAgent::Integration => AgentKind::Integration,
            PromptAgent::DbioConversion => AgentKind::DbioConversion,
        }
    }
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Convert { input, run } => cmd_convert(&cli.config, &input, &run),
        Command::ConvertDir {
            input_dir,
            run,
            integrate,
        } => cmd_convert_dir(&cli.config, &input_dir, &run, integrate),
        Command::ConvertStdin { filename, run } => cmd_convert_stdin(&cli.config, &filename, &run),
        Command::Prompt {
            agent,
            file,
            java,
            system,
        } => cmd_prompt(&cli.config, agent, &file, java.as_deref(), system),
        Command::InitConfig { force } => cmd_init_config(&cli.config, force),
    }
}

/// Config with `--output-dir` applied, plus the effective iteration count.
fn resolve(config_path: &Path, run: &RunArgs) -> Result<(ConverterConfig, u32)> {
    let mut config = load_config(config_path)?;
    if let Some(dir) = &run.output_dir {
        config.output.dir = dir.clone();
    }
    let max_iterations = run.max_iterations.unwrap_or(config.pipeline.max_iterations);
    Ok((config, max_iterations))
}

fn orchestrator(config: &ConverterConfig) -> Result<Orchestrator<BedrockClient>> {
    let client = BedrockClient::from_config(&config.model)?;
    Ok(Orchestrator::new(client, config))
}

fn cmd_convert(config_path: &Path, input: &Path, run: &RunArgs) -> Result<i32> {
    if !input.is_file() {
        bail!("input file not found: {}", input.display());
    }
    let (config, max_iterations) = resolve(config_path, run)?;
    let mut orchestrator = orchestrator(&config)?;
    let report = orchestrator.convert_single_file(input, &config.output.dir, max_iterations);
    write_json(&report)?;
    Ok(file_exit_code(&report))
}

fn cmd_convert_stdin(config_path: &Path, filename: &str, run: &RunArgs) -> Result<i32> {
    let (mut config, max_iterations) = resolve(config_path, run)?;
    config.pipeline.max_iterations = max_iterations;
    let mut code = String::new();
    std::io::stdin()
        .read_to_string(&mut code)
        .context("read source from stdin")?;
    if code.trim().is_empty() {
        bail!("no source on stdin");
    }
    let mut orchestrator = orchestrator(&config)?;
    let report = orchestrator.convert_from_code_string(&code, filename, &config.output.dir);
    write_json(&report)?;
    Ok(file_exit_code(&report))
}

fn cmd_convert_dir(
    config_path: &Path,
    input_dir: &Path,
    run: &RunArgs,
    integrate: bool,
) -> Result<i32> {
    let (config, max_iterations) = resolve(config_path, run)?;
    let mut orchestrator = orchestrator(&config)?;
    let options = BatchOptions {
        max_iterations,
        integrate,
    };
    let report = orchestrator.process_directory(input_dir, &config.output.dir, &options)?;
    print_batch_report(&report);
    Ok(batch_exit_code(&report))
}

fn cmd_prompt(
    config_path: &Path,
    agent: PromptAgent,
    file: &Path,
    java: Option<&Path>,
    system: bool,
) -> Result<i32> {
    let config = load_config(config_path)?;
    let prompts = PromptLibrary::new(&config.prompts.java_package);
    let kind = AgentKind::from(agent);
    if system {
        print!("{}", prompts.system(kind)?);
        return Ok(exit_codes::OK);
    }

    let code = read_source(file)?;
    let java_code = || -> Result<String> {
        let path = java.with_context(|| format!("--java is required for {}", kind.name()))?;
        read_source(path)
    };
    let rendered = match agent {
        PromptAgent::CodeAnalysis => prompts.code_analysis(&code)?,
        PromptAgent::Conversion => prompts.conversion(&code)?,
        PromptAgent::Validation => prompts.validation(&code, &java_code()?)?,
        PromptAgent::SecurityAssessment => prompts.security_assessment(&code, &java_code()?)?,
        PromptAgent::Feedback => prompts.feedback(&FeedbackInputs {
            c_code: &code,
            java_code: &java_code()?,
            validation_feedback: "",
            security_feedback: "",
        })?,
        PromptAgent::Integration => prompts.integration(&[IntegrationFile {
            filename: output_file_name(file, FileKind::C),
            source: file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            java_code: java_code()?,
            dependencies: include_dependencies(&code),
        }])?,
        PromptAgent::DbioConversion => prompts.dbio_conversion(&code)?,
    };
    print!("{rendered}");
    Ok(exit_codes::OK)
}

fn cmd_init_config(config_path: &Path, force: bool) -> Result<i32> {
    if config_path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }
    write_config(config_path, &ConverterConfig::default())?;
    println!("init-config: wrote {}", config_path.display());
    Ok(exit_codes::OK)
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

fn file_exit_code(report: &FileReport) -> i32 {
    if !report.success {
        exit_codes::FAILED
    } else if report.max_iterations_reached {
        exit_codes::INCOMPLETE
    } else {
        exit_codes::OK
    }
}

fn batch_exit_code(report: &BatchReport) -> i32 {
    if report.failed_conversions > 0 {
        exit_codes::FAILED
    } else if report.quality_issues() > 0 {
        exit_codes::INCOMPLETE
    } else {
        exit_codes::OK
    }
}

fn print_batch_report(report: &BatchReport) {
    println!(
        "report: input_dir={} output_dir={}",
        report.input_directory.display(),
        report.output_directory.display()
    );
    if let Some(message) = &report.message {
        println!("report: message={message}");
    }
    println!(
        "report: total={} successful={} failed={} quality_issues={}",
        report.total_files,
        report.successful_conversions,
        report.failed_conversions,
        report.quality_issues()
    );
    println!(
        "report: total_processing_time_secs={:.2}",
        report.total_processing_time
    );
    for file in &report.file_results {
        match (&file.output_file, &file.error) {
            (Some(output), _) => println!(
                "report: file={} success={} output={}",
                file.filename,
                file.success,
                output.display()
            ),
            (None, error) => println!(
                "report: file={} success={} error={}",
                file.filename,
                file.success,
                error.as_deref().unwrap_or("unknown")
            ),
        }
    }
    match &report.integration {
        Some(IntegrationReport::Integrated { files }) => {
            println!("report: integration=integrated files={}", files.len());
        }
        Some(IntegrationReport::Skipped { reason }) => {
            println!("report: integration=skipped reason={reason}");
        }
        Some(IntegrationReport::Failed { error }) => {
            println!("report: integration=failed error={error}");
        }
        None => {}
    }
    if report.total_files > 0 {
        println!(
            "report: written={}",
            report.output_directory.join(REPORT_FILE).display()
        );
    }
}

/// Print `value` as pretty JSON on stdout.
fn write_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{payload}");
    Ok(())
}
