//! `local_directory` documents from a directory on disk.

use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::LocalConfig;
use crate::envelope::{DocumentBuilder, SourceKind};
use crate::error::{IngestError, Result};
use crate::filetype::{convert_notebook, is_allowed_filetype, is_notebook};
use crate::models::FileEntry;

/// Every eligible file under `root`, ordered by walking entries sorted by
/// name. Paths are relative to `root` with `/` separators.
pub fn collect_local_files(root: &Path, config: &LocalConfig) -> Result<Vec<FileEntry>> {
    if !root.is_dir() {
        return Err(IngestError::UnsupportedSource(format!(
            "{} is not a directory",
            root.display()
        )));
    }
    let excludes = build_globset(&config.exclude_globs)?;

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(config.follow_symlinks)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|e| IngestError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if excludes.is_match(&rel_str) {
            debug!(path = %rel_str, "Excluded");
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !is_allowed_filetype(&name) {
            continue;
        }

        info!(path = %path.display(), "Processing");
        let bytes = std::fs::read(path)?;
        let raw = String::from_utf8_lossy(&bytes);
        let content = if is_notebook(&name) {
            convert_notebook(&rel_str, &raw)?
        } else {
            raw.into_owned()
        };
        files.push(FileEntry {
            path: rel_str,
            content,
        });
    }

    Ok(files)
}

/// Build the `local_directory` document for `root`.
pub fn process_local_folder(root: &Path, config: &LocalConfig) -> Result<String> {
    let files = collect_local_files(root, config)?;
    let mut doc = DocumentBuilder::source(SourceKind::LocalDirectory, &root.display().to_string());
    for file in &files {
        doc.file(&file.path, &file.content);
    }
    info!(count = files.len(), "All files processed");
    Ok(doc.finish())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| IngestError::Config(format!("invalid exclude glob '{}': {}", pattern, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| IngestError::Config(e.to_string()))
}
