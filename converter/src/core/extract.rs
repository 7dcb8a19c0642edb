//! Extraction helpers for model replies.

use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use serde::de::DeserializeOwned;

static FILENAME_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?://[ \t]*)?#filename:[ \t]*(\S+)[ \t]*$")
        .expect("filename header regex should be valid")
});

/// Slice from the first `{` to the last `}` inclusive.
pub fn json_object_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse the outermost JSON object embedded in a reply.
pub fn parse_embedded_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    let slice = json_object_slice(text).ok_or_else(|| anyhow!("no JSON object in reply"))?;
    serde_json::from_str(slice).context("parse embedded JSON object")
}

/// Contents of every `<tag>...</tag>` block, trimmed, in order.
pub fn tagged_blocks(text: &str, tag: &str) -> Vec<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(&open) {
        let after_open = &rest[start + open.len()..];
        match after_open.find(&close) {
            Some(end) => {
                blocks.push(after_open[..end].trim().to_string());
                rest = &after_open[end + close.len()..];
            }
            None => {
                // Unterminated block (usually a truncated reply): keep the tail.
                blocks.push(after_open.trim().to_string());
                break;
            }
        }
    }
    blocks
}

/// Tagged code if present, otherwise the reply unchanged.
pub fn extract_code(text: &str, tag: &str) -> String {
    let blocks = tagged_blocks(text, tag);
    if blocks.is_empty() {
        return text.to_string();
    }
    let mut joined = blocks.join("\n\n");
    joined.push('\n');
    joined
}

/// A file carved out of a multi-file reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedFile {
    pub name: String,
    pub contents: String,
}

/// Split a reply on `#filename: X` headers.
///
/// Text before the first header is dropped. Returns an empty vec when there
/// are no headers. Names are reduced to their final path component.
pub fn split_named_files(text: &str) -> Vec<NamedFile> {
    let headers: Vec<_> = FILENAME_HEADER_RE.captures_iter(text).collect();
    let mut files = Vec::new();
    for (idx, caps) in headers.iter().enumerate() {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let end = headers
            .get(idx + 1)
            .and_then(|next| next.get(0))
            .map_or(text.len(), |next| next.start());
        let body = strip_tags(&text[whole.end()..end]);
        let name = name.as_str().rsplit(['/', '\\']).next().unwrap_or_default();
        if name.is_empty() {
            continue;
        }
        let mut contents = body.trim().to_string();
        contents.push('\n');
        files.push(NamedFile {
            name: name.to_string(),
            contents,
        });
    }
    files
}

fn strip_tags(text: &str) -> String {
    ["<java>", "</java>", "<xml>", "</xml>"]
        .iter()
        .fold(text.to_string(), |acc, tag| acc.replace(tag, ""))
}
