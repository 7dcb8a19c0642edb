//! Shared data types for the conversion pipeline.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Kind of source file, which decides the conversion route.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Plain C source converted to Java/Spring.
    C,
    /// SQL DBIO C source converted to MyBatis XML.
    Dbio,
}

impl FileKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::C => "c",
            FileKind::Dbio => "dbio",
        }
    }
}

/// The seven prompt-driven agents of the pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    CodeAnalysis,
    Conversion,
    Validation,
    SecurityAssessment,
    Feedback,
    Integration,
    DbioConversion,
}

impl AgentKind {
    pub const ALL: [AgentKind; 7] = [
        AgentKind::CodeAnalysis,
        AgentKind::Conversion,
        AgentKind::Validation,
        AgentKind::SecurityAssessment,
        AgentKind::Feedback,
        AgentKind::Integration,
        AgentKind::DbioConversion,
    ];

    /// Name used in traces, logs and session transcripts.
    pub fn name(self) -> &'static str {
        match self {
            AgentKind::CodeAnalysis => "code_analysis_agent",
            AgentKind::Conversion => "conversion_agent",
            AgentKind::Validation => "validation_agent",
            AgentKind::SecurityAssessment => "security_assessment_agent",
            AgentKind::Feedback => "feedback_agent",
            AgentKind::Integration => "integration_agent",
            AgentKind::DbioConversion => "dbio_conversion_agent",
        }
    }

    /// Prompt template stem (`<key>.system` / `<key>.user`).
    pub fn template_key(self) -> &'static str {
        match self {
            AgentKind::CodeAnalysis => "code_analysis",
            AgentKind::Conversion => "conversion",
            AgentKind::Validation => "validation",
            AgentKind::SecurityAssessment => "security_assessment",
            AgentKind::Feedback => "feedback",
            AgentKind::Integration => "integration",
            AgentKind::DbioConversion => "dbio_conversion",
        }
    }
}

/// Size-based complexity bucket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

impl Complexity {
    pub fn as_str(self) -> &'static str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Medium => "medium",
            Complexity::Complex => "complex",
        }
    }
}

/// Metadata derived from an input file before conversion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileMetadata {
    pub filename: String,
    #[serde(rename = "file_type")]
    pub kind: FileKind,
    pub complexity: Complexity,
    pub line_count: usize,
    /// `#include` lines, trimmed, in source order.
    pub dependencies: Vec<String>,
}

/// Free-form analysis produced by the code analysis agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisReport {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl AnalysisReport {
    /// Fallback used when the analysis reply is not a JSON object.
    pub fn parse_failed(raw_response: &str) -> Self {
        let fields = json!({
            "complexity": "medium",
            "main_functions": [],
            "dependencies": [],
            "conversion_challenges": ["JSON parsing failed"],
            "raw_response": raw_response,
        });
        Self {
            fields: object_fields(fields),
        }
    }

    pub fn complexity(&self) -> &str {
        self.fields
            .get("complexity")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
    }
}

/// Verdict from the validation agent.
///
/// Only the fields the pipeline reads are typed; everything else the model
/// returns is preserved in `details` so it can be fed back verbatim. Any JSON
/// object deserializes; mis-shaped fields are read leniently.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(from = "Map<String, Value>")]
pub struct ValidationReport {
    pub is_complete: bool,
    pub completeness_score: f64,
    pub issues: Vec<Value>,
    pub suggestions: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl From<Map<String, Value>> for ValidationReport {
    fn from(mut fields: Map<String, Value>) -> Self {
        let is_complete = ["is_complete", "complete"]
            .into_iter()
            .filter_map(|key| fields.remove(key))
            .fold(false, |acc, value| acc || lenient_flag(&value));
        Self {
            is_complete,
            completeness_score: fields
                .remove("completeness_score")
                .map_or(0.0, |value| lenient_score(&value)),
            issues: lenient_list(fields.remove("issues")),
            suggestions: lenient_list(fields.remove("suggestions")),
            raw_response: fields.remove("raw_response").and_then(lenient_text),
            details: fields,
        }
    }
}

impl ValidationReport {
    /// Fallback used when the validation reply is not a JSON object.
    pub fn parse_failed(raw_response: &str) -> Self {
        Self {
            is_complete: false,
            completeness_score: 0.5,
            issues: vec![json!("JSON parsing failed")],
            suggestions: vec![json!("Review validation response format")],
            raw_response: Some(raw_response.to_string()),
            details: Map::new(),
        }
    }

    /// Issues worth carrying into the feedback history.
    ///
    /// Collects `issues` plus the `missing_elements` and
    /// `incorrect_transformations` arrays the validation prompt asks for.
    pub fn open_issues(&self) -> Vec<Value> {
        let mut issues = self.issues.clone();
        for key in ["missing_elements", "incorrect_transformations"] {
            if let Some(Value::Array(items)) = self.details.get(key) {
                issues.extend(items.iter().cloned());
            }
        }
        issues
    }
}

/// Findings from the security assessment agent.
///
/// Like [`ValidationReport`], any JSON object deserializes so the listed
/// critical vulnerabilities survive a mis-shaped neighbouring field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(from = "Map<String, Value>")]
pub struct SecurityReport {
    pub critical_vulnerabilities: Vec<Value>,
    pub security_risk_issues: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl From<Map<String, Value>> for SecurityReport {
    fn from(mut fields: Map<String, Value>) -> Self {
        Self {
            critical_vulnerabilities: lenient_list(fields.remove("critical_vulnerabilities")),
            security_risk_issues: lenient_list(fields.remove("security_risk_issues")),
            raw_response: fields.remove("raw_response").and_then(lenient_text),
            details: fields,
        }
    }
}

impl SecurityReport {
    /// Fallback used when the security reply is not a JSON object.
    ///
    /// Reports no critical vulnerabilities so a parse failure never blocks
    /// acceptance on its own; the notes ask for a manual review instead.
    pub fn parse_failed(raw_response: &str) -> Self {
        let details = json!({
            "secure_code_recommendations": ["JSON parsing failed - manual security review required"],
            "spring_security_configurations": [],
            "compliance_gaps": ["Assessment parsing failed"],
            "migration_security_notes": ["Manual security review required"],
        });
        Self {
            critical_vulnerabilities: Vec::new(),
            security_risk_issues: Vec::new(),
            raw_response: Some(raw_response.to_string()),
            details: object_fields(details),
        }
    }

    pub fn critical_count(&self) -> usize {
        self.critical_vulnerabilities.len()
    }

    pub fn risk_count(&self) -> usize {
        self.security_risk_issues.len()
    }
}

/// One applied round of feedback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackEntry {
    pub iteration: u32,
    pub original_issues: Vec<Value>,
    pub improved_code: String,
}

/// A converted file offered to the integration agent alongside the primary one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelatedFile {
    /// C source the Java file was converted from.
    pub source: String,
    /// Converted Java file name.
    pub filename: String,
    pub java_code: String,
    pub dependencies: Vec<String>,
}

/// Mutable state threaded through every agent of a single conversion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionContext {
    pub c_code: String,
    /// Latest converted output (Java, or MyBatis XML for DBIO sources).
    pub java_code: Option<String>,
    pub file_metadata: Option<FileMetadata>,
    pub analysis: Option<AnalysisReport>,
    pub validation: Option<ValidationReport>,
    pub security: Option<SecurityReport>,
    pub feedback_history: Vec<FeedbackEntry>,
    pub related_files: Vec<RelatedFile>,
    pub session_id: Option<String>,
    pub agent_trace: Vec<String>,
    /// Directory the converted output goes to. Session transcripts are
    /// recorded under it; `None` means the configured `output.dir`.
    pub output_dir: Option<PathBuf>,
}

impl ConversionContext {
    pub fn new(c_code: impl Into<String>, file_metadata: Option<FileMetadata>) -> Self {
        Self {
            c_code: c_code.into(),
            file_metadata,
            ..Self::default()
        }
    }

    pub fn add_trace(&mut self, agent_name: &str, action: &str) {
        self.agent_trace.push(format!("{agent_name}: {action}"));
    }
}

fn object_fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Accept numbers or numeric strings (`"0.8"`, `"85%"`) as a score.
fn lenient_score(value: &Value) -> f64 {
    match value {
        Value::Number(number) => number.as_f64().unwrap_or(0.0),
        Value::String(text) => {
            let trimmed = text.trim();
            match trimmed.strip_suffix('%') {
                Some(percent) => percent.trim().parse::<f64>().map(|p| p / 100.0),
                None => trimmed.parse::<f64>(),
            }
            .unwrap_or(0.0)
        }
        _ => 0.0,
    }
}

fn lenient_flag(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => matches!(
            text.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "complete"
        ),
        _ => false,
    }
}

/// Arrays as-is; a non-empty string or an object counts as one item.
///
/// Absent, null, boolean, numeric and blank values are empty.
fn lenient_list(value: Option<Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items,
        Some(Value::String(text)) if text.trim().is_empty() => Vec::new(),
        Some(item @ (Value::String(_) | Value::Object(_))) => vec![item],
        _ => Vec::new(),
    }
}

fn lenient_text(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
