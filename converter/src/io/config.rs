//! Converter configuration stored in `converter.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "converter.toml";

/// Converter configuration (TOML).
///
/// This file is intended to be edited by humans. Missing fields default to
/// the values the pipeline was tuned with.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConverterConfig {
    pub model: ModelConfig,
    pub pipeline: PipelineConfig,
    pub prompts: PromptConfig,
    pub output: OutputConfig,
}

/// Remote model endpoint and sampling parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    pub region: String,
    pub model_id: String,
    /// Overrides the regional endpoint (proxies, local fakes).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
    /// Environment variable holding the bearer API key.
    pub api_key_env: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub read_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            model_id: "us.amazon.nova-premier-v1:0".to_string(),
            endpoint_url: None,
            api_key_env: "AWS_BEARER_TOKEN_BEDROCK".to_string(),
            max_tokens: 4096,
            temperature: 0.05,
            top_p: 0.9,
            read_timeout_secs: 300,
        }
    }
}

impl ModelConfig {
    pub fn endpoint(&self) -> String {
        match &self.endpoint_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://bedrock-runtime.{}.amazonaws.com", self.region),
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Refinement iterations for a single-file conversion.
    pub max_iterations: u32,
    /// Pause between refinement iterations.
    pub iteration_delay_ms: u64,
    /// Cap on continuation requests after a token-limit stop.
    pub max_continuations: u32,
    /// File extensions (without dot) picked up by directory processing.
    pub source_extensions: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            iteration_delay_ms: 1000,
            max_continuations: 8,
            source_extensions: vec!["c".to_string(), "h".to_string()],
        }
    }
}

impl PipelineConfig {
    pub fn iteration_delay(&self) -> Duration {
        Duration::from_millis(self.iteration_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PromptConfig {
    /// Package all generated Java classes are placed in.
    pub java_package: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            java_package: "com.skt.rally".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    /// Write per-call prompt/response transcripts under `<dir>/.sessions/`.
    pub record_sessions: bool,
    /// Write only `<java>`/`<xml>` tagged blocks when the reply has them.
    pub extract_code: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            record_sessions: true,
            extract_code: false,
        }
    }
}

impl ConverterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.model.model_id.trim().is_empty() {
            return Err(anyhow!("model.model_id must be non-empty"));
        }
        if self.model.endpoint_url.is_none() && self.model.region.trim().is_empty() {
            return Err(anyhow!(
                "model.region must be non-empty when model.endpoint_url is unset"
            ));
        }
        if self.model.api_key_env.trim().is_empty() {
            return Err(anyhow!("model.api_key_env must be non-empty"));
        }
        if self.model.max_tokens == 0 {
            return Err(anyhow!("model.max_tokens must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.model.temperature) {
            return Err(anyhow!("model.temperature must be within 0.0..=1.0"));
        }
        if !(0.0..=1.0).contains(&self.model.top_p) {
            return Err(anyhow!("model.top_p must be within 0.0..=1.0"));
        }
        if self.model.read_timeout_secs == 0 {
            return Err(anyhow!("model.read_timeout_secs must be > 0"));
        }
        if self.pipeline.max_iterations == 0 {
            return Err(anyhow!("pipeline.max_iterations must be > 0"));
        }
        if self.pipeline.source_extensions.is_empty() {
            return Err(anyhow!("pipeline.source_extensions must be a non-empty array"));
        }
        if self.prompts.java_package.trim().is_empty() {
            return Err(anyhow!("prompts.java_package must be non-empty"));
        }
        if self.output.dir.as_os_str().is_empty() {
            return Err(anyhow!("output.dir must be non-empty"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ConverterConfig::default()`.
pub fn load_config(path: &Path) -> Result<ConverterConfig> {
    if !path.exists() {
        let cfg = ConverterConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ConverterConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &ConverterConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
