//! Source discovery for directory conversion.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::debug;
use walkdir::WalkDir;

use crate::io::session_log::SESSIONS_DIR;

/// Recursively collect files whose extension is in `extensions`, sorted.
///
/// Extensions are compared case-insensitively and without the leading dot.
/// Session transcript directories are skipped.
pub fn discover_sources(root: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(anyhow!("input directory not found: {}", root.display()));
    }
    let wanted: Vec<String> = extensions
        .iter()
        .map(|ext| ext.trim_start_matches('.').to_lowercase())
        .collect();

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| entry.file_name() != SESSIONS_DIR);
    for entry in walker {
        let entry = entry.with_context(|| format!("walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| wanted.contains(&ext));
        if matches {
            files.push(entry.into_path());
        }
    }
    files.sort();
    debug!(root = %root.display(), count = files.len(), "discovered sources");
    Ok(files)
}
