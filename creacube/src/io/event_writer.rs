//! Writes the configuration-change log as CSV.
//!
//! One row per event, `time,configuration`. A reported drop (no configuration) is an
//! empty field.

use crate::core_modules::debouncer::Event;
use crate::error::{CreaCubeError, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const HEADER: &str = "time,configuration";

/// Suffix appended to an input's file stem to name its annotation file.
pub const OUTPUT_SUFFIX: &str = "_annotations.csv";

pub fn render_events(events: &[Event]) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for event in events {
        let label = event.configuration.as_deref().map(escape).unwrap_or_default();
        out.push_str(&format!("{},{}\n", event.time, label));
    }
    out
}

pub fn write_events(path: &Path, events: &[Event]) -> Result<()> {
    let file = File::create(path).map_err(|e| CreaCubeError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(render_events(events).as_bytes())
        .and_then(|_| writer.flush())
        .map_err(|e| CreaCubeError::io(path, e))
}

/// Where the annotations for `input` go: next to it, or inside `output_dir`.
pub fn output_path_for(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sequence".to_string());
    let name = format!("{stem}{OUTPUT_SUFFIX}");
    match (output_dir, input.parent()) {
        (Some(dir), _) => dir.join(name),
        (None, Some(parent)) => parent.join(name),
        (None, None) => PathBuf::from(name),
    }
}

fn escape(label: &str) -> String {
    if label.contains([',', '"', '\n']) {
        format!("\"{}\"", label.replace('"', "\"\""))
    } else {
        label.to_string()
    }
}
