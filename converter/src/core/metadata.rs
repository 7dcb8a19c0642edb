//! Input file classification (kind, size bucket, include dependencies).

use crate::core::types::{Complexity, FileKind, FileMetadata};

const SIMPLE_MAX_LINES: usize = 300;
const MEDIUM_MAX_LINES: usize = 700;

/// Number of `\n`-separated segments (an empty text counts as one line).
pub fn line_count(code: &str) -> usize {
    code.split('\n').count()
}

pub fn assess_complexity(code: &str) -> Complexity {
    match line_count(code) {
        n if n <= SIMPLE_MAX_LINES => Complexity::Simple,
        n if n <= MEDIUM_MAX_LINES => Complexity::Medium,
        _ => Complexity::Complex,
    }
}

/// DBIO when the filename mentions `dbio` or the source mentions `sql`
/// (both case-insensitive).
pub fn detect_kind(filename: &str, code: &str) -> FileKind {
    if filename.to_lowercase().contains("dbio") || code.to_lowercase().contains("sql") {
        FileKind::Dbio
    } else {
        FileKind::C
    }
}

pub fn include_dependencies(code: &str) -> Vec<String> {
    code.split('\n')
        .map(str::trim)
        .filter(|line| line.starts_with("#include"))
        .map(str::to_string)
        .collect()
}

pub fn build_metadata(filename: &str, code: &str) -> FileMetadata {
    FileMetadata {
        filename: filename.to_string(),
        kind: detect_kind(filename, code),
        complexity: assess_complexity(code),
        line_count: line_count(code),
        dependencies: include_dependencies(code),
    }
}
