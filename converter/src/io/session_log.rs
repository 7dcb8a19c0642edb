//! Session transcripts under `<output>/.sessions/<session_id>/`.
//!
//! Every agent call writes its rendered prompt and the model reply as
//! numbered files so a conversion can be audited after the fact. The
//! summary (`session.json`) is written once the pipeline finishes.

use std::cell::Cell;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::debug;

pub const SESSIONS_DIR: &str = ".sessions";

/// Summary persisted at the end of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary<'a> {
    pub session_id: &'a str,
    pub input_file: Option<&'a str>,
    pub success: bool,
    pub iterations: u32,
    pub processing_time_secs: f64,
    pub started_at: &'a str,
    pub finished_at: String,
    pub error: Option<&'a str>,
    pub agent_trace: &'a [String],
}

#[derive(Debug, Clone)]
pub struct SessionPaths {
    pub dir: PathBuf,
    pub summary_path: PathBuf,
}

impl SessionPaths {
    pub fn new(output_dir: &Path, session_id: &str) -> Self {
        let dir = output_dir.join(SESSIONS_DIR).join(session_id);
        Self {
            summary_path: dir.join("session.json"),
            dir,
        }
    }

    pub fn call_paths(&self, seq: u32, agent: &str) -> (PathBuf, PathBuf) {
        let stem = format!("{seq:02}-{agent}");
        (
            self.dir.join(format!("{stem}.prompt.md")),
            self.dir.join(format!("{stem}.response.md")),
        )
    }
}

const MAX_NAME_ATTEMPTS: u32 = 100;

/// Writer for one session's transcript.
pub struct SessionLog {
    session_id: String,
    paths: SessionPaths,
    seq: Cell<u32>,
}

impl SessionLog {
    /// Reserve a fresh session directory named after `base_id`.
    ///
    /// When the directory already exists (another process, same second) the
    /// id gets a `-2`, `-3`, ... suffix. Use [`SessionLog::session_id`] for
    /// the id actually taken.
    pub fn create(output_dir: &Path, base_id: &str) -> Result<Self> {
        let root = output_dir.join(SESSIONS_DIR);
        fs::create_dir_all(&root)
            .with_context(|| format!("create sessions dir {}", root.display()))?;
        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let session_id = match attempt {
                1 => base_id.to_string(),
                n => format!("{base_id}-{n}"),
            };
            let paths = SessionPaths::new(output_dir, &session_id);
            match fs::create_dir(&paths.dir) {
                Ok(()) => {
                    return Ok(Self {
                        session_id,
                        paths,
                        seq: Cell::new(0),
                    });
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {}
                Err(err) => {
                    return Err(err)
                        .with_context(|| format!("create session dir {}", paths.dir.display()));
                }
            }
        }
        bail!("no free session dir for {base_id} under {}", root.display())
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn paths(&self) -> &SessionPaths {
        &self.paths
    }

    /// Record one agent call. Files are numbered in call order.
    pub fn record_call(&self, agent: &str, prompt: &str, response: &str) -> Result<()> {
        let seq = self.seq.get() + 1;
        self.seq.set(seq);
        let (prompt_path, response_path) = self.paths.call_paths(seq, agent);
        write_text(&prompt_path, prompt)?;
        write_text(&response_path, response)?;
        debug!(seq, agent, dir = %self.paths.dir.display(), "recorded agent call");
        Ok(())
    }

    pub fn write_summary(&self, summary: &SessionSummary<'_>) -> Result<()> {
        let mut buf = serde_json::to_string_pretty(summary)?;
        buf.push('\n');
        write_text(&self.paths.summary_path, &buf)
    }
}

fn write_text(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_paths_are_stable() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = SessionPaths::new(temp.path(), "conversion_1");

        assert!(paths.dir.ends_with(Path::new(".sessions/conversion_1")));
        assert!(paths.summary_path.ends_with("session.json"));
        let (prompt, response) = paths.call_paths(3, "validation_agent");
        assert!(prompt.ends_with("03-validation_agent.prompt.md"));
        assert!(response.ends_with("03-validation_agent.response.md"));
    }

    #[test]
    fn records_calls_in_order_and_writes_summary() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log = SessionLog::create(temp.path(), "s-1").expect("create");

        log.record_call("code_analysis_agent", "p1", "r1").expect("record");
        log.record_call("conversion_agent", "p2", "r2").expect("record");

        let (prompt, response) = log.paths().call_paths(2, "conversion_agent");
        assert_eq!(fs::read_to_string(prompt).expect("prompt"), "p2");
        assert_eq!(fs::read_to_string(response).expect("response"), "r2");

        let trace = vec!["conversion_agent: conversion_completed".to_string()];
        log.write_summary(&SessionSummary {
            session_id: "s-1",
            input_file: Some("a.c"),
            success: true,
            iterations: 1,
            processing_time_secs: 0.5,
            started_at: "2024-01-01T00:00:00Z",
            finished_at: "2024-01-01T00:00:01Z".to_string(),
            error: None,
            agent_trace: &trace,
        })
        .expect("summary");

        let raw = fs::read_to_string(&log.paths().summary_path).expect("read summary");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("parse");
        assert_eq!(value["session_id"], "s-1");
        assert_eq!(value["agent_trace"][0], "conversion_agent: conversion_completed");
    }

    #[test]
    fn existing_session_dir_gets_a_suffixed_id() {
        let temp = tempfile::tempdir().expect("tempdir");
        let first = SessionLog::create(temp.path(), "conversion_20240101_000000_001")
            .expect("first");
        let second = SessionLog::create(temp.path(), "conversion_20240101_000000_001")
            .expect("second");

        assert_eq!(first.session_id(), "conversion_20240101_000000_001");
        assert_eq!(second.session_id(), "conversion_20240101_000000_001-2");
        assert_ne!(first.paths().dir, second.paths().dir);
        assert!(second.paths().dir.is_dir());
    }
}
