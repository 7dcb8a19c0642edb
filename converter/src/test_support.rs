//! Test-only helpers: scripted model clients, a local Converse endpoint and
//! sample sources.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::thread::{self, JoinHandle};

use anyhow::{Result, anyhow};
use serde_json::{Value, json};

use crate::io::config::{ConverterConfig, ModelConfig};
use crate::io::inference::Inference;
use crate::io::model::{
    ConverseOutput, ConverseRequest, ConverseResponse, InferenceConfig, Message, ModelClient,
    StopReason,
};

/// One predetermined reply of a [`ScriptedModel`].
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Reply { text: String, stop: StopReason },
    Error(String),
}

impl ScriptedReply {
    /// Complete reply (`end_turn`).
    pub fn text(text: impl Into<String>) -> Self {
        Self::Reply {
            text: text.into(),
            stop: StopReason::EndTurn,
        }
    }

    /// Reply cut off at the token limit (`max_tokens`).
    pub fn truncated(text: impl Into<String>) -> Self {
        Self::Reply {
            text: text.into(),
            stop: StopReason::MaxTokens,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }
}

/// Model client that replays scripted replies in order and records requests.
pub struct ScriptedModel {
    replies: RefCell<VecDeque<ScriptedReply>>,
    requests: RefCell<Vec<ConverseRequest>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ConverseRequest> {
        self.requests.borrow().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.borrow().len()
    }
}

impl ModelClient for ScriptedModel {
    fn converse(&self, request: &ConverseRequest) -> Result<ConverseResponse> {
        self.requests.borrow_mut().push(request.clone());
        match self.replies.borrow_mut().pop_front() {
            Some(ScriptedReply::Reply { text, stop }) => Ok(ConverseResponse {
                output: ConverseOutput {
                    message: Message::assistant(text),
                },
                stop_reason: stop,
                usage: None,
            }),
            Some(ScriptedReply::Error(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted model has no replies left")),
        }
    }
}

/// Inference over a scripted model with default sampling settings.
pub fn scripted_inference(model: &ScriptedModel) -> Inference<&ScriptedModel> {
    Inference::new(model, InferenceConfig::from(&ModelConfig::default()), 8)
}

/// Validation reply in the shape the validation prompt asks for.
pub fn validation_reply(is_complete: bool, score: f64) -> ScriptedReply {
    let issues: Vec<&str> = if is_complete {
        Vec::new()
    } else {
        vec!["missing error handling"]
    };
    let body = json!({
        "is_complete": is_complete,
        "completeness_score": score,
        "missing_elements": [],
        "incorrect_transformations": [],
        "issues": issues,
        "suggestions": [],
    });
    ScriptedReply::text(format!("```json\n{body:#}\n```"))
}

/// Security reply listing `critical` critical vulnerabilities.
pub fn security_reply(critical: usize) -> ScriptedReply {
    let vulnerabilities: Vec<Value> = (0..critical)
        .map(|i| json!({"type": "buffer overflow", "location": format!("line {}", i + 1)}))
        .collect();
    let body = json!({
        "critical_vulnerabilities": vulnerabilities,
        "security_risk_issues": [],
        "secure_code_recommendations": [],
    });
    ScriptedReply::text(body.to_string())
}

pub fn analysis_reply() -> ScriptedReply {
    ScriptedReply::text(
        json!({
            "complexity": "simple",
            "main_functions": ["main"],
            "dependencies": ["stdio.h"],
        })
        .to_string(),
    )
}

pub fn sample_c_source() -> &'static str {
    "#include <stdio.h>\n#include \"cust.h\"\n\nint add(int a, int b) {\n    return a + b;\n}\n\nint main(void) {\n    printf(\"%d\\n\", add(1, 2));\n    return 0;\n}\n"
}

pub fn sample_dbio_source() -> &'static str {
    "#include \"dbio.h\"\n\nint cust_select(CUST *cust) {\n    EXEC SQL SELECT NAME INTO :cust->name FROM CUST WHERE ID = :cust->id;\n    return SQLCODE;\n}\n"
}

/// Temporary directory populated with `(relative path, contents)` files.
pub fn source_tree(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    for (relative, contents) in files {
        let path = dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create source dir");
        }
        std::fs::write(&path, contents).expect("write source");
    }
    dir
}

/// Config for offline tests: no iteration delay, no session transcripts.
pub fn test_config(output_dir: &Path) -> ConverterConfig {
    let mut config = ConverterConfig::default();
    config.pipeline.iteration_delay_ms = 0;
    config.output.dir = output_dir.to_path_buf();
    config.output.record_sessions = false;
    config
}

/// Successful Converse response body.
pub fn converse_body(text: &str, stop_reason: &str) -> Value {
    json!({
        "output": {"message": {"role": "assistant", "content": [{"text": text}]}},
        "stopReason": stop_reason,
        "usage": {"inputTokens": 10, "outputTokens": 20, "totalTokens": 30},
    })
}

/// Request captured by [`FakeConverseServer`].
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

/// Scripted response of a [`FakeConverseServer`].
#[derive(Debug, Clone)]
pub struct FakeResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl FakeResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Local HTTP endpoint serving one scripted response per connection.
pub struct FakeConverseServer {
    url: String,
    handle: JoinHandle<Vec<CapturedRequest>>,
}

impl FakeConverseServer {
    pub fn start(responses: Vec<(u16, Value)>) -> Self {
        Self::start_with(
            responses
                .into_iter()
                .map(|(status, body)| FakeResponse::json(status, body))
                .collect(),
        )
    }

    pub fn start_with(responses: Vec<FakeResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake server");
        let addr = listener.local_addr().expect("local addr");
        let handle = thread::spawn(move || {
            let mut captured = Vec::new();
            for response in responses {
                let Ok((stream, _)) = listener.accept() else {
                    break;
                };
                match serve_one(stream, &response) {
                    Ok(request) => captured.push(request),
                    Err(_) => break,
                }
            }
            captured
        });
        Self {
            url: format!("http://{addr}"),
            handle,
        }
    }

    pub fn url(&self) -> String {
        self.url.clone()
    }

    /// Wait until every scripted response was served and return the requests.
    pub fn finish(self) -> Vec<CapturedRequest> {
        self.handle.join().expect("fake server thread panicked")
    }
}

fn serve_one(stream: TcpStream, response: &FakeResponse) -> std::io::Result<CapturedRequest> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            headers.push((key.trim().to_string(), value.trim().to_string()));
        }
    }

    let header = |name: &str| {
        headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    };
    let body_bytes = if let Some(length) = header("content-length") {
        let length: usize = length.parse().unwrap_or(0);
        let mut buf = vec![0; length];
        reader.read_exact(&mut buf)?;
        buf
    } else if header("transfer-encoding").is_some_and(|v| v.eq_ignore_ascii_case("chunked")) {
        read_chunked(&mut reader)?
    } else {
        Vec::new()
    };

    let payload = response.body.to_string();
    let extra: String = response
        .headers
        .iter()
        .map(|(name, value)| format!("{name}: {value}\r\n"))
        .collect();
    let raw = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n{extra}Connection: close\r\n\r\n{payload}",
        response.status,
        reason_phrase(response.status),
        payload.len()
    );
    let mut stream = stream;
    stream.write_all(raw.as_bytes())?;
    stream.flush()?;

    Ok(CapturedRequest {
        method,
        path,
        headers,
        body: body_bytes,
    })
}

fn read_chunked(reader: &mut impl BufRead) -> std::io::Result<Vec<u8>> {
    let mut body = Vec::new();
    loop {
        let mut size_line = String::new();
        reader.read_line(&mut size_line)?;
        let size_hex = size_line.trim().split(';').next().unwrap_or_default();
        let size = usize::from_str_radix(size_hex, 16).unwrap_or(0);
        if size == 0 {
            let mut trailer = String::new();
            reader.read_line(&mut trailer)?;
            return Ok(body);
        }
        let mut chunk = vec![0; size];
        reader.read_exact(&mut chunk)?;
        body.extend_from_slice(&chunk);
        let mut crlf = String::new();
        reader.read_line(&mut crlf)?;
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        403 => "Forbidden",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        _ => "Status",
    }
}
