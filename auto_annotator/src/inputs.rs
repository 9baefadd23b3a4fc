//! Resolves command-line inputs to the list of tracking exports to annotate.

use anyhow::{Context, Result, bail};
use creacube::io::event_writer::OUTPUT_SUFFIX;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Expands directories (recursively, sorted) and keeps explicit files as given.
/// Annotation files written by a previous run are never picked up from directories.
pub fn discover(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut in_dir = Vec::new();
            for entry in WalkDir::new(path).follow_links(true) {
                let entry = entry.with_context(|| format!("walking {}", path.display()))?;
                if entry.file_type().is_file() && is_export(entry.path()) {
                    in_dir.push(entry.into_path());
                }
            }
            in_dir.sort();
            found.extend(in_dir);
        } else if path.is_file() {
            found.push(path.clone());
        } else {
            bail!("input {} does not exist", path.display());
        }
    }
    Ok(found)
}

fn is_export(path: &Path) -> bool {
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let is_annotation = path
        .file_name()
        .is_some_and(|name| name.to_string_lossy().ends_with(OUTPUT_SUFFIX));
    is_csv && !is_annotation
}
