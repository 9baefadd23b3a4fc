// THEORY:
// The `decoder` turns a tracker CSV export into the ordered `Frame` sequence the
// pipeline consumes. It is the only place that knows the export's fixed layout.
//
// Layout of an export:
// - a free-form preamble, then one header line (line 13 by default);
// - one data row per tracked sample, timestamp in column 0;
// - four columns (x1, y1, x2, y2) per cube at fixed offsets.
//
// Cells may be wrapped in double quotes, and a comma inside quotes belongs to its cell.
// A cube is visible in a row only if all four of its cells hold finite numbers.
// Rows that share a timestamp are merged into one frame, and frames are returned in
// ascending timestamp order so the debouncer sees them in sequence.

use crate::core_modules::cube::CubeId;
use crate::core_modules::frame::Frame;
use crate::core_modules::geometry::Rectangle;
use crate::error::{CreaCubeError, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Column layout of a tracker export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvLayout {
    /// Zero-based index of the header line. Everything before it is preamble.
    pub header_line: usize,
    pub timestamp_column: usize,
    /// First column (x1) of each cube's rectangle, indexed by `CubeId::index()`.
    pub rectangle_columns: [usize; 4],
}

impl Default for CsvLayout {
    fn default() -> Self {
        Self {
            header_line: 12,
            timestamp_column: 0,
            rectangle_columns: [3, 11, 19, 27],
        }
    }
}

/// Reads and decodes an export file.
pub fn read_frames(path: &Path, layout: &CsvLayout) -> Result<Vec<Frame>> {
    let text = std::fs::read_to_string(path).map_err(|e| CreaCubeError::io(path, e))?;
    decode_frames(&text, &path.display().to_string(), layout)
}

/// Decodes export text. `origin` only names the input in error messages.
pub fn decode_frames(text: &str, origin: &str, layout: &CsvLayout) -> Result<Vec<Frame>> {
    let mut frames: Vec<Frame> = Vec::new();
    let mut frame_by_timestamp: HashMap<u64, usize> = HashMap::new();
    let mut rows = 0usize;

    for (index, line) in text.lines().enumerate().skip(layout.header_line + 1) {
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_fields(line);

        let Some(raw_timestamp) = fields
            .get(layout.timestamp_column)
            .filter(|field| !field.is_empty())
        else {
            continue;
        };
        let timestamp = raw_timestamp
            .parse::<f64>()
            .ok()
            .filter(|t| t.is_finite())
            .ok_or_else(|| CreaCubeError::MalformedRow {
                origin: origin.to_string(),
                line: index + 1,
                reason: format!("timestamp {raw_timestamp:?} is not a number"),
            })?;
        rows += 1;

        let slot = *frame_by_timestamp
            .entry(timestamp.to_bits())
            .or_insert_with(|| {
                frames.push(Frame::new(timestamp));
                frames.len() - 1
            });
        let frame = &mut frames[slot];

        for cube in CubeId::ALL {
            if frame.rectangle(cube).is_some() {
                continue;
            }
            let first = layout.rectangle_columns[cube.index()];
            let components = [0, 1, 2, 3].map(|offset| number_at(&fields, first + offset));
            if let Some(rectangle) = Rectangle::from_components(components) {
                frame.set_rectangle(cube, Some(rectangle));
            }
        }
    }

    frames.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    debug!(origin, rows, frames = frames.len(), "export decoded");
    Ok(frames)
}

fn split_fields(line: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => {
                fields.push(clean(&line[start..i]));
                start = i + 1;
            }
            _ => {}
        }
    }
    fields.push(clean(&line[start..]));
    fields
}

fn clean(field: &str) -> &str {
    field.trim().trim_matches('"')
}

fn number_at(fields: &[&str], column: usize) -> Option<f64> {
    fields
        .get(column)
        .and_then(|field| field.parse::<f64>().ok())
        .filter(|value| value.is_finite())
}
